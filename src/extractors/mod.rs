// Rule-kind extractors over request body content
//
// Each extractor sniffs whether the content matches its expected shape before
// attempting a parse, and degrades every evaluation-time failure to "no
// match". Only pattern compilation at construction time can fail.

pub mod form;
pub mod json_path;
pub mod pattern;
pub mod xpath;

pub use form::FormExtractor;
pub use json_path::JsonPathExtractor;
pub use pattern::RegexExtractor;
pub use xpath::XPathExtractor;

use crate::error::RuleError;
use crate::rules::RuleKind;

/// A single extraction strategy applied to body content
///
/// Implementations return `None` for empty input, content whose shape does
/// not fit the strategy, and any evaluation-time failure. A successful
/// extraction is never the empty string.
pub trait NameExtractor {
    fn extract(&self, content: &str) -> Option<String>;
}

/// Build the extractor for a rule kind and pattern
///
/// Total over the closed kind set; the only failure mode is an invalid
/// pattern, reported to the caller. The pipeline treats that outcome the same
/// as a rule that produced no match.
pub fn create_extractor(
    kind: RuleKind,
    pattern: &str,
) -> Result<Box<dyn NameExtractor>, RuleError> {
    match kind {
        RuleKind::Regex => Ok(Box::new(RegexExtractor::new(pattern)?)),
        RuleKind::JsonPath => Ok(Box::new(JsonPathExtractor::new(pattern)?)),
        RuleKind::XPath => Ok(Box::new(XPathExtractor::new(pattern)?)),
        RuleKind::Form => Ok(Box::new(FormExtractor::new(pattern))),
    }
}

/// Check that a pattern is valid for its kind without keeping the extractor
///
/// Used wherever rules enter the system: store mutations, persisted-entry
/// decoding, and document import.
pub fn validate_pattern(kind: RuleKind, pattern: &str) -> Result<(), RuleError> {
    create_extractor(kind, pattern).map(|_| ())
}

// Successful extractions are never empty; empty collapses to no-match.
pub(crate) fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
