//! URI template expansion
//!
//! Simple string expansion only (`{var}`). Values are percent-encoded so an
//! identifier can never escape its path segment.

use crate::es::{Error, Result};
use std::collections::HashMap;

/// Collection path, used for create
pub const DETECTORS_PATH: &str = "/_opendistro/_anomaly_detection/detectors/";

/// Item path template, used for get/update/delete
pub const DETECTOR_TEMPLATE: &str = "/_opendistro/_anomaly_detection/detectors/{id}";

/// Expand `template` with `vars`.
///
/// Undefined variables expand to nothing. Unbalanced braces, empty
/// expressions and operator expressions (`{+x}`, `{/x}`, ...) are rejected.
pub fn expand(template: &str, vars: &HashMap<&str, &str>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find(['{', '}']) {
        if rest.as_bytes()[open] == b'}' {
            return Err(malformed(template, "unmatched '}'"));
        }
        out.push_str(&rest[..open]);

        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| malformed(template, "unclosed '{'"))?;
        let name = &after[..close];
        validate_name(template, name)?;

        if let Some(value) = vars.get(name) {
            out.push_str(&urlencoding::encode(value));
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

fn validate_name(template: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(malformed(template, "empty expression"));
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if !valid {
        return Err(malformed(
            template,
            &format!("unsupported expression {{{}}}", name),
        ));
    }
    Ok(())
}

fn malformed(template: &str, why: &str) -> Error {
    Error::PathTemplate(format!("malformed template {:?}: {}", template, why))
}

/// Item path for detector `id`
pub fn detector_path(id: &str) -> Result<String> {
    expand(DETECTOR_TEMPLATE, &HashMap::from([("id", id)]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_path() {
        assert_eq!(
            detector_path("hEcL5HUBn1vmrJZ4Cc4X").unwrap(),
            "/_opendistro/_anomaly_detection/detectors/hEcL5HUBn1vmrJZ4Cc4X"
        );
    }

    #[test]
    fn test_values_are_encoded() {
        assert_eq!(
            detector_path("../_cluster/settings").unwrap(),
            "/_opendistro/_anomaly_detection/detectors/..%2F_cluster%2Fsettings"
        );
        assert_eq!(
            detector_path("a b?c").unwrap(),
            "/_opendistro/_anomaly_detection/detectors/a%20b%3Fc"
        );
    }

    #[test]
    fn test_undefined_variable_is_empty() {
        let vars = HashMap::new();
        assert_eq!(expand("/x/{id}/y", &vars).unwrap(), "/x//y");
    }

    #[test]
    fn test_literal_template_passes_through() {
        assert_eq!(expand(DETECTORS_PATH, &HashMap::new()).unwrap(), DETECTORS_PATH);
    }

    #[test]
    fn test_malformed_templates() {
        let vars = HashMap::from([("id", "1")]);
        for template in ["/x/{id", "/x/id}", "/x/{}", "/x/{+id}", "/x/{a b}"] {
            let err = expand(template, &vars).unwrap_err();
            assert!(
                matches!(err, Error::PathTemplate(_)),
                "{template} should be malformed"
            );
        }
    }

    #[test]
    fn test_multiple_variables() {
        let vars = HashMap::from([("index", "logs"), ("id", "42")]);
        assert_eq!(expand("/{index}/_doc/{id}", &vars).unwrap(), "/logs/_doc/42");
    }
}
