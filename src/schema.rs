//! Resource schema and lifecycle contract
//!
//! A resource declares its fields (validation, diff suppression, state
//! canonicalization) and implements [`ResourceLifecycle`]. The host drives
//! the callbacks and persists [`ResourceData`] between runs.

use crate::es::{ProviderContext, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared configuration: field name -> raw value
pub type Attributes = BTreeMap<String, String>;

/// Local state for one managed object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceData {
    /// Remote identifier. Empty means the object does not exist.
    #[serde(default)]
    id: String,
    #[serde(default)]
    attributes: Attributes,
}

impl ResourceData {
    pub fn new(attributes: Attributes) -> Self {
        Self {
            id: String::new(),
            attributes,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set the identifier; an empty string marks the object as gone
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn exists(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.attributes.get(field).map(String::as_str)
    }

    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.attributes.insert(field.to_string(), value.into());
    }
}

pub type ValidateFn = fn(&str) -> std::result::Result<(), String>;
pub type DiffSuppressFn = fn(old: &str, new: &str) -> bool;
pub type StateFn = fn(&str) -> String;

/// One user-facing string field
#[derive(Clone)]
pub struct FieldSchema {
    pub name: &'static str,
    pub required: bool,
    pub validate: Option<ValidateFn>,
    pub diff_suppress: Option<DiffSuppressFn>,
    pub state_func: Option<StateFn>,
}

/// How `import <id>` turns an identifier into state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Importer {
    /// The identifier is used as-is
    Passthrough,
}

/// What applying a declared configuration would do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    Create,
    Update,
    NoChange,
}

/// Static description of a resource type
#[derive(Clone)]
pub struct ResourceSchema {
    pub type_name: &'static str,
    pub fields: Vec<FieldSchema>,
    pub importer: Option<Importer>,
}

impl ResourceSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check declared configuration. Returns one message per problem.
    pub fn validate(&self, config: &Attributes) -> Vec<String> {
        let mut problems = Vec::new();

        for field in &self.fields {
            match config.get(field.name) {
                None if field.required => {
                    problems.push(format!("{}: required field is not set", field.name));
                }
                None => {}
                Some(value) => {
                    if let Some(validate) = field.validate {
                        if let Err(msg) = validate(value) {
                            problems.push(format!("{}: {}", field.name, msg));
                        }
                    }
                }
            }
        }

        for key in config.keys() {
            if self.field(key).is_none() {
                problems.push(format!("{}: unknown field for {}", key, self.type_name));
            }
        }

        problems
    }

    /// Turn validated configuration into planned state, applying state functions
    pub fn planned(&self, prior: &ResourceData, config: &Attributes) -> ResourceData {
        let mut planned = prior.clone();
        for (key, value) in config {
            let stored = match self.field(key).and_then(|f| f.state_func) {
                Some(state_func) => state_func(value),
                None => value.clone(),
            };
            planned.set(key, stored);
        }
        planned
    }

    /// Compare prior state with declared configuration
    pub fn plan(&self, prior: &ResourceData, config: &Attributes) -> PlanAction {
        if !prior.exists() {
            return PlanAction::Create;
        }

        let changed = self.fields.iter().any(|field| {
            let old = prior.get(field.name).unwrap_or_default();
            let new = config.get(field.name).map(String::as_str).unwrap_or_default();
            if old == new {
                return false;
            }
            match field.diff_suppress {
                Some(suppress) => !suppress(old, new),
                None => true,
            }
        });

        if changed {
            PlanAction::Update
        } else {
            PlanAction::NoChange
        }
    }
}

/// Lifecycle callbacks the host invokes for one resource type
#[async_trait]
pub trait ResourceLifecycle: Send + Sync {
    fn schema(&self) -> &ResourceSchema;

    async fn create(&self, d: &mut ResourceData, ctx: &ProviderContext) -> Result<()>;

    /// Refresh `d` from the server. Clears the id when the object is gone.
    async fn read(&self, d: &mut ResourceData, ctx: &ProviderContext) -> Result<()>;

    async fn update(&self, d: &mut ResourceData, ctx: &ProviderContext) -> Result<()>;

    async fn delete(&self, d: &ResourceData, ctx: &ProviderContext) -> Result<()>;

    /// Adopt an existing object. `None` when nothing exists under `id`.
    async fn import(&self, id: &str, ctx: &ProviderContext) -> Result<Option<ResourceData>> {
        let mut d = ResourceData::default();
        match self.schema().importer {
            Some(Importer::Passthrough) => d.set_id(id),
            None => {
                return Err(crate::es::Error::Config(format!(
                    "{} does not support import",
                    self.schema().type_name
                )))
            }
        }
        self.read(&mut d, ctx).await?;
        Ok(d.exists().then_some(d))
    }
}
