//! Command bodies behind the `esdetector` binary
//!
//! [`Host`] drives [`DetectorResource`] callbacks against a [`StateFile`].
//! It only mutates the in-memory state; the caller saves it, including
//! after a failed command, so partially applied work stays tracked.

use crate::detector::{detector_exists, DetectorResource, BODY};
use crate::es::ProviderContext;
use crate::schema::{Attributes, PlanAction, ResourceData, ResourceLifecycle};
use crate::state::StateFile;
use anyhow::{anyhow, bail, Context, Result};

/// Result of [`Host::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub action: PlanAction,
    pub id: String,
}

/// Per-name result of [`Host::refresh`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refreshed {
    /// Still on the server, state rewritten from the server copy
    Present(String),
    /// Gone from the server, dropped from state
    Removed,
}

pub struct Host {
    resource: DetectorResource,
    ctx: ProviderContext,
}

impl Host {
    pub fn new(ctx: ProviderContext) -> Self {
        Self {
            resource: DetectorResource::new(),
            ctx,
        }
    }

    fn type_name(&self) -> &'static str {
        self.resource.schema().type_name
    }

    /// Wrap a raw detector body as declared configuration, rejecting invalid input
    pub fn declared(&self, body: String) -> Result<Attributes> {
        let mut config = Attributes::new();
        config.insert(BODY.to_string(), body);

        let problems = self.resource.schema().validate(&config);
        if !problems.is_empty() {
            bail!("invalid configuration:\n  {}", problems.join("\n  "));
        }
        Ok(config)
    }

    /// Prior state refreshed from the server
    pub async fn refreshed_prior(&self, state: &StateFile, name: &str) -> Result<ResourceData> {
        let Some(entry) = state.get(name) else {
            return Ok(ResourceData::default());
        };
        let mut prior = entry.data.clone();
        self.resource
            .read(&mut prior, &self.ctx)
            .await
            .with_context(|| format!("Failed to refresh {}", name))?;
        Ok(prior)
    }

    /// What [`Host::apply`] would do, with the refreshed prior state
    pub async fn plan(
        &self,
        state: &StateFile,
        name: &str,
        config: &Attributes,
    ) -> Result<(PlanAction, ResourceData)> {
        let prior = self.refreshed_prior(state, name).await?;
        let action = self.resource.schema().plan(&prior, config);
        Ok((action, prior))
    }

    /// Create or update `name` to match `config`.
    ///
    /// When the callback fails after the server assigned an id, the id is
    /// still recorded so the next run does not create a duplicate.
    pub async fn apply(
        &self,
        state: &mut StateFile,
        name: &str,
        config: &Attributes,
    ) -> Result<Applied> {
        let (action, prior) = self.plan(state, name, config).await?;
        let mut planned = self.resource.schema().planned(&prior, config);

        let result = match action {
            PlanAction::Create => self.resource.create(&mut planned, &self.ctx).await,
            PlanAction::Update => self.resource.update(&mut planned, &self.ctx).await,
            PlanAction::NoChange => {
                planned = prior;
                Ok(())
            }
        };

        if let Err(e) = result {
            if planned.exists() {
                tracing::warn!(
                    "{} failed after {} was assigned, keeping it in state: {}",
                    name,
                    planned.id(),
                    e
                );
                state.put(name, self.type_name(), planned);
            }
            return Err(anyhow::Error::from(e).context(format!("Failed to apply {}", name)));
        }

        let id = planned.id().to_string();
        state.put(name, self.type_name(), planned);
        Ok(Applied { action, id })
    }

    /// Re-read `names` (every managed name when empty) concurrently
    pub async fn refresh(
        &self,
        state: &mut StateFile,
        names: &[String],
    ) -> Vec<(String, Result<Refreshed>)> {
        let targets: Vec<String> = if names.is_empty() {
            state.resources.keys().cloned().collect()
        } else {
            names.to_vec()
        };

        let pending: Vec<(String, Option<ResourceData>)> = targets
            .into_iter()
            .map(|name| {
                let data = state.get(&name).map(|e| e.data.clone());
                (name, data)
            })
            .collect();

        let reads = pending.into_iter().map(|(name, data)| async move {
            let Some(mut data) = data else {
                let err = anyhow!("{} is not in state", name);
                return (name, Err(err));
            };
            let result = self
                .resource
                .read(&mut data, &self.ctx)
                .await
                .map(|_| data)
                .map_err(anyhow::Error::from);
            (name, result)
        });

        let mut outcomes = Vec::new();
        for (name, result) in futures::future::join_all(reads).await {
            let outcome = result.map(|data| {
                let refreshed = if data.exists() {
                    Refreshed::Present(data.id().to_string())
                } else {
                    Refreshed::Removed
                };
                state.put(&name, self.type_name(), data);
                refreshed
            });
            outcomes.push((name, outcome));
        }
        outcomes
    }

    /// Delete `name` on the server, confirm it is gone, then forget it.
    /// Returns the deleted id.
    pub async fn destroy(&self, state: &mut StateFile, name: &str) -> Result<String> {
        let Some(entry) = state.get(name) else {
            bail!("{} is not in state", name);
        };
        let data = entry.data.clone();

        self.resource
            .delete(&data, &self.ctx)
            .await
            .with_context(|| format!("Failed to delete {}", name))?;
        if detector_exists(&self.ctx, data.id()).await? {
            bail!("Detector {:?} still exists", data.id());
        }

        state.remove(name);
        Ok(data.id().to_string())
    }

    /// Adopt the detector `id` under a name that is not managed yet
    pub async fn import(&self, state: &mut StateFile, name: &str, id: &str) -> Result<()> {
        if state.get(name).is_some() {
            bail!("{} is already managed", name);
        }
        let Some(data) = self.resource.import(id, &self.ctx).await? else {
            bail!("Cannot import non-existent detector {:?}", id);
        };
        state.put(name, self.type_name(), data);
        Ok(())
    }
}
