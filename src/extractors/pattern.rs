//! Regular-expression extractor

use regex::Regex;

use crate::error::RuleError;
use crate::extractors::{non_empty, NameExtractor};

/// Extracts via an unanchored regex scan over the raw content
///
/// If the pattern contains capture groups, group 1 is the result; otherwise
/// the whole match text is. The pattern compiles once at construction.
#[derive(Debug)]
pub struct RegexExtractor {
    pattern: Regex,
}

impl RegexExtractor {
    pub fn new(pattern: &str) -> Result<Self, RuleError> {
        let compiled = Regex::new(pattern).map_err(|source| RuleError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { pattern: compiled })
    }
}

impl NameExtractor for RegexExtractor {
    fn extract(&self, content: &str) -> Option<String> {
        if content.is_empty() {
            return None;
        }

        let caps = self.pattern.captures(content)?;
        if self.pattern.captures_len() > 1 {
            // Group 1 may not participate in this particular match; that is
            // a miss, not a fallback to the whole match.
            caps.get(1)
                .and_then(|m| non_empty(m.as_str().to_string()))
        } else {
            non_empty(caps[0].to_string())
        }
    }
}
