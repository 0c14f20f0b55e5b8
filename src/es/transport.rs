//! Version-specific request dispatch
//!
//! The three server generations the provider knows about are not
//! interchangeable, so each gets its own [`Transport`]. Callers pick one
//! once, at connect time, and go through the trait from then on.

use super::error::{Error, Result};
use super::http::EsHttpClient;
use async_trait::async_trait;
use reqwest::Method;
use std::fmt;

/// `version.distribution` reported by OpenSearch clusters
pub const OPENSEARCH_DISTRIBUTION: &str = "opensearch";

/// Major server generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Generation {
    /// 5.x and older, no detector API
    Legacy,
    V6,
    V7,
}

impl Generation {
    /// Map a server version string such as `"7.10.2"` to its generation
    pub fn from_version(version: &str) -> Result<Self> {
        let major = version
            .trim()
            .split('.')
            .next()
            .and_then(|m| m.parse::<u32>().ok())
            .ok_or_else(|| Error::Config(format!("unparseable server version {:?}", version)))?;

        Ok(match major {
            0..=5 => Generation::Legacy,
            6 => Generation::V6,
            _ => Generation::V7,
        })
    }

    /// Like [`Generation::from_version`], but takes the distribution
    /// reported next to the version. OpenSearch restarts its numbering at
    /// 1.0 and serves the 7.x detector API on every release.
    pub fn from_server(version: &str, distribution: Option<&str>) -> Result<Self> {
        let generation = Self::from_version(version)?;
        if distribution == Some(OPENSEARCH_DISTRIBUTION) {
            return Ok(Generation::V7);
        }
        Ok(generation)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::Legacy => write!(f, "legacy (<6)"),
            Generation::V6 => write!(f, "v6"),
            Generation::V7 => write!(f, "v7"),
        }
    }
}

/// Raw request capability of one server generation
#[async_trait]
pub trait Transport: Send + Sync {
    fn generation(&self) -> Generation;

    /// Send a request and return the raw response body
    async fn perform(&self, method: Method, path: &str, body: Option<&str>) -> Result<String>;

    /// Whether `err` means the addressed object does not exist
    fn is_not_found(&self, err: &Error) -> bool;
}

/// 7.x and every OpenSearch release
pub struct Elastic7 {
    http: EsHttpClient,
}

impl Elastic7 {
    pub fn new(http: EsHttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for Elastic7 {
    fn generation(&self) -> Generation {
        Generation::V7
    }

    async fn perform(&self, method: Method, path: &str, body: Option<&str>) -> Result<String> {
        self.http.perform(method, path, body).await
    }

    fn is_not_found(&self, err: &Error) -> bool {
        err.status() == Some(404)
    }
}

/// 6.x
pub struct Elastic6 {
    http: EsHttpClient,
}

impl Elastic6 {
    pub fn new(http: EsHttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for Elastic6 {
    fn generation(&self) -> Generation {
        Generation::V6
    }

    async fn perform(&self, method: Method, path: &str, body: Option<&str>) -> Result<String> {
        self.http.perform(method, path, body).await
    }

    // 6.x only reports a missing object through the HTTP status
    fn is_not_found(&self, err: &Error) -> bool {
        matches!(err, Error::Status { status: 404, .. })
    }
}

/// Pre-6 servers. Every call fails with [`Error::Unsupported`].
pub struct Legacy;

#[async_trait]
impl Transport for Legacy {
    fn generation(&self) -> Generation {
        Generation::Legacy
    }

    async fn perform(&self, method: Method, path: &str, _body: Option<&str>) -> Result<String> {
        tracing::debug!("refusing {} {} on legacy server", method, path);
        Err(Error::Unsupported)
    }

    fn is_not_found(&self, _err: &Error) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_from_version() {
        assert_eq!(Generation::from_version("5.6.16").unwrap(), Generation::Legacy);
        assert_eq!(Generation::from_version("6.8.0").unwrap(), Generation::V6);
        assert_eq!(Generation::from_version("7.10.2").unwrap(), Generation::V7);
        assert_eq!(Generation::from_version("8.1.0").unwrap(), Generation::V7);
        assert!(Generation::from_version("latest").is_err());
        assert!(Generation::from_version("").is_err());
    }

    #[test]
    fn test_generation_from_server_distribution() {
        assert_eq!(
            Generation::from_server("2.11.0", Some("opensearch")).unwrap(),
            Generation::V7
        );
        assert_eq!(
            Generation::from_server("1.3.0", Some("opensearch")).unwrap(),
            Generation::V7
        );
        assert_eq!(Generation::from_server("2.11.0", None).unwrap(), Generation::Legacy);
        assert_eq!(Generation::from_server("6.8.0", None).unwrap(), Generation::V6);
        assert!(Generation::from_server("", Some("opensearch")).is_err());
    }

    #[test]
    fn test_legacy_never_classifies_not_found() {
        let err = Error::Status {
            status: 404,
            error_type: None,
            reason: String::new(),
        };
        assert!(!Legacy.is_not_found(&err));
    }

    #[test]
    fn test_legacy_perform_is_unsupported() {
        let result = tokio_test::block_on(Legacy.perform(Method::GET, "/", None));
        assert!(matches!(result, Err(Error::Unsupported)));
    }

    #[test]
    fn test_v6_v7_classify_404() {
        let http = EsHttpClient::new("http://localhost:9200", None, false).unwrap();
        let not_found = Error::Status {
            status: 404,
            error_type: Some("status_exception".to_string()),
            reason: "Can't find detector".to_string(),
        };
        let conflict = Error::Status {
            status: 409,
            error_type: None,
            reason: String::new(),
        };
        let v6 = Elastic6::new(http.clone());
        let v7 = Elastic7::new(http);
        assert!(v6.is_not_found(&not_found));
        assert!(v7.is_not_found(&not_found));
        assert!(!v6.is_not_found(&conflict));
        assert!(!v7.is_not_found(&Error::Unsupported));
    }
}
