//! Elasticsearch client selection
//!
//! Turns provider configuration into a [`ProviderContext`] holding the
//! transport for the cluster's generation.

use super::error::{Error, Result};
use super::http::{BasicAuth, EsHttpClient};
use super::transport::{Elastic6, Elastic7, Generation, Legacy, Transport};
use crate::config::Config;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

/// Everything a lifecycle callback needs to talk to the cluster
#[derive(Clone)]
pub struct ProviderContext {
    transport: Arc<dyn Transport>,
}

impl ProviderContext {
    /// Build a context from configuration.
    ///
    /// Uses `elasticsearch_version` when set, otherwise asks the cluster.
    pub async fn connect(config: &Config) -> Result<Self> {
        let auth = config.username.as_ref().map(|username| BasicAuth {
            username: username.clone(),
            password: config.password.clone(),
        });
        let http = EsHttpClient::new(&config.effective_url(), auth, config.insecure)?;

        let (version, distribution) = match &config.elasticsearch_version {
            Some(v) => (v.clone(), None),
            None => {
                let info = detect_version(&http).await?;
                (info.number, info.distribution)
            }
        };
        let generation = Generation::from_server(&version, distribution.as_deref())?;

        tracing::info!(
            "Using {} client for {} (version {})",
            generation,
            http.base_url(),
            version
        );

        Ok(Self::with_generation(http, generation))
    }

    /// Pick the transport for a known generation
    pub fn with_generation(http: EsHttpClient, generation: Generation) -> Self {
        let transport: Arc<dyn Transport> = match generation {
            Generation::V7 => Arc::new(Elastic7::new(http)),
            Generation::V6 => Arc::new(Elastic6::new(http)),
            Generation::Legacy => Arc::new(Legacy),
        };
        Self { transport }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn generation(&self) -> Generation {
        self.transport.generation()
    }
}

/// `version` block of the cluster root endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerVersion {
    pub number: String,
    /// Set by OpenSearch; absent on Elasticsearch
    pub distribution: Option<String>,
}

/// Read `version.number` and `version.distribution` from the cluster root endpoint
pub async fn detect_version(http: &EsHttpClient) -> Result<ServerVersion> {
    let body = http.perform(Method::GET, "/", None).await?;
    let info: Value = serde_json::from_str(&body).map_err(|source| Error::Decode {
        source,
        body: body.clone(),
    })?;

    let version = info.get("version");
    let number = version
        .and_then(|v| v.get("number"))
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| Error::Config("cluster info has no version.number".to_string()))?;
    let distribution = version
        .and_then(|v| v.get("distribution"))
        .and_then(|v| v.as_str())
        .map(String::from);

    Ok(ServerVersion {
        number,
        distribution,
    })
}
