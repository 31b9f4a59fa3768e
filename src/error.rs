//! Error types for rule construction and validation
//!
//! Only configuration-time problems surface as errors: a malformed pattern,
//! an unrecognized rule-kind tag, or a broken persisted entry. Evaluation-time
//! failures (parse errors, expression misses, decoding problems) never produce
//! an `Err` — extractors degrade to "no match" and log a diagnostic instead.

use thiserror::Error;

/// Errors raised while constructing, validating, or decoding rules
#[derive(Debug, Error)]
pub enum RuleError {
    /// The rule pattern is not a valid regular expression
    #[error("invalid regular expression `{pattern}`: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The rule pattern is not a valid JSON path expression
    #[error("invalid JSON path `{pattern}`: {message}")]
    InvalidJsonPath { pattern: String, message: String },

    /// The rule pattern is not a valid XPath expression
    #[error("invalid XPath expression `{pattern}`: {message}")]
    InvalidXPath { pattern: String, message: String },

    /// A persisted or imported rule carries a tag outside the closed kind set
    #[error("unknown rule kind tag: {0}")]
    UnknownKind(String),

    /// A flat-store entry did not have the expected `kind|pattern|enabled` shape
    #[error("malformed persisted rule entry: {0}")]
    MalformedEntry(String),

    /// A JSON rule document failed to parse or validate
    #[error("invalid rule document: {0}")]
    InvalidDocument(String),

    /// A rule index passed to an update/remove operation does not exist
    #[error("rule index {0} out of range")]
    IndexOutOfRange(usize),
}
