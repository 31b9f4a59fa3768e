//! JSON-path extractor

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use serde_json_path::JsonPath;
use tracing::debug;

use crate::error::RuleError;
use crate::extractors::{non_empty, NameExtractor};

// Cheap necessary-but-not-sufficient JSON object check: trimmed content is a
// `{...}` envelope. Anything else skips the parse entirely.
fn json_envelope() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^\{.*\}$").expect("valid regex"))
}

/// Extracts the value addressed by a JSON-path expression
///
/// The path compiles at construction; parse failures, path misses, and null
/// results at evaluation time all degrade to `None`.
#[derive(Debug)]
pub struct JsonPathExtractor {
    path: JsonPath,
    expression: String,
}

impl JsonPathExtractor {
    pub fn new(expression: &str) -> Result<Self, RuleError> {
        let path = JsonPath::parse(expression).map_err(|e| RuleError::InvalidJsonPath {
            pattern: expression.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            path,
            expression: expression.to_string(),
        })
    }

    fn stringify(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => non_empty(s.clone()),
            // Numbers and booleans stringify plainly; objects and arrays as
            // their canonical JSON text.
            other => non_empty(other.to_string()),
        }
    }
}

impl NameExtractor for JsonPathExtractor {
    fn extract(&self, content: &str) -> Option<String> {
        if content.is_empty() || !json_envelope().is_match(content.trim()) {
            return None;
        }

        let document: Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(err) => {
                debug!(path = %self.expression, %err, "content sniffed as JSON but failed to parse");
                return None;
            }
        };

        self.path
            .query(&document)
            .first()
            .and_then(Self::stringify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_string_scalar_unquoted() {
        let extractor = JsonPathExtractor::new("$.action").unwrap();
        assert_eq!(
            extractor.extract(r#"{"action":"submit","id":1}"#),
            Some("submit".to_string())
        );
    }

    #[test]
    fn test_sniff_rejects_non_json() {
        let extractor = JsonPathExtractor::new("$.action").unwrap();
        assert_eq!(extractor.extract("action=submit"), None);
    }

    #[test]
    fn test_sniff_tolerates_multiline_and_whitespace() {
        let extractor = JsonPathExtractor::new("$.method").unwrap();
        let body = "  {\n  \"method\": \"user.login\"\n}\n";
        assert_eq!(extractor.extract(body), Some("user.login".to_string()));
    }

    #[test]
    fn test_nested_path() {
        let extractor = JsonPathExtractor::new("$.request.op").unwrap();
        assert_eq!(
            extractor.extract(r#"{"request":{"op":"create"},"v":2}"#),
            Some("create".to_string())
        );
    }

    #[test]
    fn test_number_scalar_stringified() {
        let extractor = JsonPathExtractor::new("$.code").unwrap();
        assert_eq!(
            extractor.extract(r#"{"code":42}"#),
            Some("42".to_string())
        );
    }

    #[test]
    fn test_object_result_is_canonical_json() {
        let extractor = JsonPathExtractor::new("$.inner").unwrap();
        assert_eq!(
            extractor.extract(r#"{"inner":{"a":1}}"#),
            Some(r#"{"a":1}"#.to_string())
        );
    }

    #[test]
    fn test_null_and_missing_are_none() {
        let extractor = JsonPathExtractor::new("$.method").unwrap();
        assert_eq!(extractor.extract(r#"{"method":null}"#), None);
        assert_eq!(extractor.extract(r#"{"other":"x"}"#), None);
    }

    #[test]
    fn test_envelope_matching_but_malformed_json_is_none() {
        let extractor = JsonPathExtractor::new("$.method").unwrap();
        assert_eq!(extractor.extract(r#"{"method": "login"#), None);
        assert_eq!(extractor.extract("{not json at all}"), None);
    }

    #[test]
    fn test_bad_path_rejected_at_construction() {
        assert!(matches!(
            JsonPathExtractor::new("method without root"),
            Err(RuleError::InvalidJsonPath { .. })
        ));
    }
}
