//! Detector API calls
//!
//! Each call builds its path, goes through the context's transport and
//! decodes the `{_id, _version, detector}` envelope.

use super::normalize::normalize_detector;
use super::path::{detector_path, DETECTORS_PATH};
use crate::es::{Error, ProviderContext, Result};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

/// Envelope returned by create, get and update
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectorResponse {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_version", default)]
    pub version: i64,
    #[serde(rename = "_seq_no", default)]
    pub seq_no: Option<i64>,
    #[serde(rename = "_primary_term", default)]
    pub primary_term: Option<i64>,
    #[serde(alias = "anomaly_detector")]
    pub detector: Value,
}

fn decode(body: String) -> Result<DetectorResponse> {
    serde_json::from_str(&body).map_err(|source| Error::Decode { source, body })
}

/// POST a new detector
pub async fn post_detector(ctx: &ProviderContext, body: &str) -> Result<DetectorResponse> {
    let raw = ctx
        .transport()
        .perform(Method::POST, DETECTORS_PATH, Some(body))
        .await?;

    let mut response = decode(raw)?;
    normalize_detector(&mut response.detector);
    Ok(response)
}

/// GET a detector by id
pub async fn get_detector(ctx: &ProviderContext, id: &str) -> Result<DetectorResponse> {
    let path = detector_path(id)?;
    let raw = ctx.transport().perform(Method::GET, &path, None).await?;

    let mut response = decode(raw)?;
    normalize_detector(&mut response.detector);
    Ok(response)
}

/// PUT a new body over detector `id`.
///
/// The returned detector is not normalized; callers re-read instead.
pub async fn put_detector(ctx: &ProviderContext, id: &str, body: &str) -> Result<DetectorResponse> {
    let path = detector_path(id)?;
    let raw = ctx
        .transport()
        .perform(Method::PUT, &path, Some(body))
        .await?;

    decode(raw)
}

/// DELETE detector `id`
pub async fn delete_detector(ctx: &ProviderContext, id: &str) -> Result<()> {
    let path = detector_path(id)?;
    ctx.transport()
        .perform(Method::DELETE, &path, None)
        .await
        .map(|_| ())
}

/// Whether detector `id` exists, without touching any state
pub async fn detector_exists(ctx: &ProviderContext, id: &str) -> Result<bool> {
    match get_detector(ctx, id).await {
        Ok(_) => Ok(true),
        Err(e) if ctx.transport().is_not_found(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_accepts_server_key() {
        let body = r#"{"_id":"abc","_version":2,"_seq_no":5,"_primary_term":1,"anomaly_detector":{"name":"d"}}"#;
        let response = decode(body.to_string()).unwrap();
        assert_eq!(response.id, "abc");
        assert_eq!(response.version, 2);
        assert_eq!(response.seq_no, Some(5));
        assert_eq!(response.detector["name"], "d");
    }

    #[test]
    fn test_decode_accepts_detector_key() {
        let body = r#"{"_id":"abc","_version":1,"detector":{"name":"d"}}"#;
        let response = decode(body.to_string()).unwrap();
        assert_eq!(response.detector["name"], "d");
        assert_eq!(response.primary_term, None);
    }

    #[test]
    fn test_decode_failure_keeps_body() {
        let err = decode(r#"{"acknowledged":true}"#.to_string()).unwrap_err();
        match err {
            Error::Decode { body, .. } => assert_eq!(body, r#"{"acknowledged":true}"#),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
