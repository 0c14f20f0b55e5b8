//! The `elasticsearch_opendistro_detector` resource

use super::normalize::{normalize_json_string, normalized_value};
use super::ops::{delete_detector, get_detector, post_detector, put_detector};
use crate::es::{Error, ProviderContext, Result};
use crate::schema::{FieldSchema, Importer, ResourceData, ResourceLifecycle, ResourceSchema};
use async_trait::async_trait;

pub const RESOURCE_TYPE: &str = "elasticsearch_opendistro_detector";

/// Name of the only user-facing field
pub const BODY: &str = "body";

/// Valid JSON of any shape
pub fn validate_body(body: &str) -> std::result::Result<(), String> {
    serde_json::from_str::<serde_json::Value>(body)
        .map(|_| ())
        .map_err(|e| format!("{:?} contains an invalid JSON: {}", BODY, e))
}

/// True when both bodies describe the same detector once server defaults
/// are ignored. Unparseable input never matches.
pub fn diff_suppress_detector(old: &str, new: &str) -> bool {
    match (normalized_value(old), normalized_value(new)) {
        (Ok(old), Ok(new)) => old == new,
        _ => false,
    }
}

/// Canonical stored form; invalid JSON is stored untouched
pub fn body_state(body: &str) -> String {
    normalize_json_string(body).unwrap_or_else(|_| body.to_string())
}

pub struct DetectorResource {
    schema: ResourceSchema,
}

impl DetectorResource {
    pub fn new() -> Self {
        Self {
            schema: ResourceSchema {
                type_name: RESOURCE_TYPE,
                fields: vec![FieldSchema {
                    name: BODY,
                    required: true,
                    validate: Some(validate_body),
                    diff_suppress: Some(diff_suppress_detector),
                    state_func: Some(body_state),
                }],
                importer: Some(Importer::Passthrough),
            },
        }
    }

    fn body<'a>(&self, d: &'a ResourceData) -> Result<&'a str> {
        d.get(BODY).ok_or(Error::MissingField {
            resource: RESOURCE_TYPE,
            field: BODY,
        })
    }
}

impl Default for DetectorResource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceLifecycle for DetectorResource {
    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    /// POST, then read back: the server keeps adding defaults
    /// (`adjust_pure_negative`, `boost`, ...) after the write that the
    /// POST response does not show yet.
    async fn create(&self, d: &mut ResourceData, ctx: &ProviderContext) -> Result<()> {
        let body = self.body(d)?.to_string();
        let response = post_detector(ctx, &body).await.inspect_err(|e| {
            tracing::info!("Failed to put Detector: {}", e);
        })?;

        d.set_id(response.id);
        tracing::info!("Object ID: {}", d.id());

        self.read(d, ctx).await
    }

    async fn read(&self, d: &mut ResourceData, ctx: &ProviderContext) -> Result<()> {
        let result = get_detector(ctx, d.id()).await;
        let response = match result {
            Ok(response) => response,
            Err(e) if ctx.transport().is_not_found(&e) => {
                tracing::warn!("Detector ({}) not found, removing from state", d.id());
                d.set_id("");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        d.set_id(response.id);
        let json = serde_json::to_string(&response.detector).map_err(Error::InvalidBody)?;
        d.set(BODY, normalize_json_string(&json)?);
        Ok(())
    }

    async fn update(&self, d: &mut ResourceData, ctx: &ProviderContext) -> Result<()> {
        let body = self.body(d)?.to_string();
        let response = put_detector(ctx, d.id(), &body).await?;
        tracing::debug!(
            "Detector {} updated to version {}, refreshing",
            response.id,
            response.version
        );

        self.read(d, ctx).await
    }

    async fn delete(&self, d: &ResourceData, ctx: &ProviderContext) -> Result<()> {
        delete_detector(ctx, d.id()).await
    }
}
