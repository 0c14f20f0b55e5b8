//! HTTP utilities for Elasticsearch REST API calls

use super::error::{Error, Result};
use reqwest::{Client, Method};
use serde_json::Value;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and drops control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// Basic auth credentials
#[derive(Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

/// HTTP client wrapper bound to one Elasticsearch endpoint
#[derive(Clone)]
pub struct EsHttpClient {
    client: Client,
    base_url: Url,
    auth: Option<BasicAuth>,
}

impl EsHttpClient {
    /// Create a new HTTP client for `base_url`
    pub fn new(base_url: &str, auth: Option<BasicAuth>, insecure: bool) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid url {:?}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("url {} cannot be a base", base_url)));
        }

        let client = Client::builder()
            .user_agent(concat!("esdetector/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(insecure)
            .build()?;

        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    /// Endpoint this client talks to
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join an absolute API path onto the endpoint, keeping any path prefix
    /// the endpoint was configured with (e.g. behind a reverse proxy).
    fn url_for(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Perform a request and return the raw response body.
    ///
    /// Non-2xx responses become [`Error::Status`], with `type` and `reason`
    /// taken from the Elasticsearch error body when it has one.
    pub async fn perform(&self, method: Method, path: &str, body: Option<&str>) -> Result<String> {
        let url = self.url_for(path);
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method.clone(), &url);
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.username, auth.password.as_deref());
        }
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                "API error: {} {} -> {} - {}",
                method,
                path,
                status,
                sanitize_for_log(&text)
            );
            return Err(status_error(status.as_u16(), &text));
        }

        Ok(text)
    }
}

/// Build a status error from an Elasticsearch error body.
///
/// Handles both `{"error": {"type": .., "reason": ..}}` and the older
/// `{"error": "message"}` shape.
fn status_error(status: u16, body: &str) -> Error {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    let (error_type, reason) = match error {
        Some(Value::Object(map)) => (
            map.get("type").and_then(|v| v.as_str()).map(String::from),
            map.get("reason")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        ),
        Some(Value::String(s)) => (None, s.clone()),
        _ => (None, sanitize_for_log(body)),
    };

    Error::Status {
        status,
        error_type,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_parses_structured_body() {
        let body = r#"{"error":{"type":"status_exception","reason":"Can't find detector with id: abc"},"status":404}"#;
        match status_error(404, body) {
            Error::Status {
                status,
                error_type,
                reason,
            } => {
                assert_eq!(status, 404);
                assert_eq!(error_type.as_deref(), Some("status_exception"));
                assert!(reason.contains("abc"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_status_error_plain_body() {
        match status_error(502, "Bad Gateway") {
            Error::Status {
                error_type, reason, ..
            } => {
                assert!(error_type.is_none());
                assert_eq!(reason, "Bad Gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_sanitize_truncates_on_char_boundary() {
        let body = "é".repeat(150);
        let out = sanitize_for_log(&body);
        assert!(out.contains("truncated"));
    }

    #[test]
    fn test_url_for_keeps_prefix() {
        let client = EsHttpClient::new("http://localhost:9200/proxy/", None, false).unwrap();
        assert_eq!(
            client.url_for("/_opendistro/_anomaly_detection/detectors/"),
            "http://localhost:9200/proxy/_opendistro/_anomaly_detection/detectors/"
        );
    }
}
