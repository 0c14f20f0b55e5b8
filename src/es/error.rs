//! Error types for Elasticsearch API calls

use thiserror::Error;

/// Message returned for every detector call against a pre-v6 server
pub const UNSUPPORTED_MESSAGE: &str = "Detector resource not implemented prior to Elastic v6";

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The URI template or one of its values could not be expanded
    #[error("error building URL path for Detector: {0}")]
    PathTemplate(String),

    /// Detector API is not available on the selected server generation
    #[error("{}", UNSUPPORTED_MESSAGE)]
    Unsupported,

    /// Server answered with a non-2xx status
    #[error("elastic: Error {status} ({}): {reason}", .error_type.as_deref().unwrap_or("unknown"))]
    Status {
        status: u16,
        error_type: Option<String>,
        reason: String,
    },

    /// Connection, TLS or protocol failure below the HTTP status layer
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body did not match the expected envelope
    #[error("error unmarshalling Detector body: {source}: {body}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    /// Declared body is not valid JSON
    #[error("body is not valid JSON: {0}")]
    InvalidBody(#[source] serde_json::Error),

    /// A required resource field is absent from the declared configuration
    #[error("{resource}: required field {field:?} is not set")]
    MissingField {
        resource: &'static str,
        field: &'static str,
    },

    /// Provider configuration could not produce a client
    #[error("invalid provider configuration: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_message_is_fixed() {
        assert_eq!(Error::Unsupported.to_string(), UNSUPPORTED_MESSAGE);
    }

    #[test]
    fn test_status_display_includes_type() {
        let err = Error::Status {
            status: 404,
            error_type: Some("index_not_found_exception".to_string()),
            reason: "no such index".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("index_not_found_exception"));
    }

    #[test]
    fn test_missing_field_names_resource() {
        let err = Error::MissingField {
            resource: "elasticsearch_opendistro_detector",
            field: "body",
        };
        assert_eq!(
            err.to_string(),
            "elasticsearch_opendistro_detector: required field \"body\" is not set"
        );
        assert!(!err.to_string().contains("provider"));
    }

    #[test]
    fn test_decode_error_keeps_raw_body() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = Error::Decode {
            source,
            body: "{oops".to_string(),
        };
        assert!(err.to_string().ends_with("{oops"));
        assert_eq!(err.status(), None);
    }
}
