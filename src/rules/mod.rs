//! Rule model: rule kinds, body-extraction rules, and URL rules
//!
//! Rules are plain ordered data. Evaluation order decides precedence — the
//! first enabled rule producing a non-empty result wins — so both rule lists
//! are index-addressable sequences, not sets.

pub mod persist;
pub mod store;

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RuleError;

pub use store::RuleStore;

/// Extraction strategy tag, a closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    /// Regular expression over the raw body
    Regex,
    /// JSON path expression over a JSON object body
    JsonPath,
    /// XPath expression over an XML body
    #[serde(rename = "XPATH")]
    XPath,
    /// Field lookup in a URL-encoded form body
    Form,
}

impl RuleKind {
    /// Stable tag used by the flat persisted encoding
    pub fn as_tag(&self) -> &'static str {
        match self {
            RuleKind::Regex => "REGEX",
            RuleKind::JsonPath => "JSON_PATH",
            RuleKind::XPath => "XPATH",
            RuleKind::Form => "FORM",
        }
    }

    /// Parse a persisted tag back into a kind
    pub fn from_tag(tag: &str) -> Result<Self, RuleError> {
        match tag {
            "REGEX" => Ok(RuleKind::Regex),
            "JSON_PATH" => Ok(RuleKind::JsonPath),
            "XPATH" => Ok(RuleKind::XPath),
            "FORM" => Ok(RuleKind::Form),
            other => Err(RuleError::UnknownKind(other.to_string())),
        }
    }

    /// Human display label
    pub fn label(&self) -> &'static str {
        match self {
            RuleKind::Regex => "Regular expression",
            RuleKind::JsonPath => "JSON path",
            RuleKind::XPath => "XPath",
            RuleKind::Form => "Form field",
        }
    }

    /// All kinds in display order, for configuration UIs
    pub fn all() -> [RuleKind; 4] {
        [
            RuleKind::Regex,
            RuleKind::JsonPath,
            RuleKind::XPath,
            RuleKind::Form,
        ]
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A body-extraction rule: strategy tag plus its pattern
///
/// The pattern is interpreted per kind: a regular expression, a JSON path,
/// an XPath expression, or a form field name. Pattern validity is checked
/// when the rule enters a [`RuleStore`], not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRule {
    kind: RuleKind,
    pattern: String,
    enabled: bool,
}

impl ExtractionRule {
    pub fn new(kind: RuleKind, pattern: impl Into<String>, enabled: bool) -> Self {
        Self {
            kind,
            pattern: pattern.into(),
            enabled,
        }
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_kind(&mut self, kind: RuleKind) {
        self.kind = kind;
    }

    pub fn set_pattern(&mut self, pattern: impl Into<String>) {
        self.pattern = pattern.into();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl fmt::Display for ExtractionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}]",
            self.kind.label(),
            self.pattern,
            if self.enabled { "enabled" } else { "disabled" }
        )
    }
}

/// A URL rule: a regular expression applied to the request URL
///
/// The pattern must compile at construction. When used for extraction only
/// capture group 1 contributes a value; a rule without a capturing group can
/// still answer containment checks via [`UrlRule::is_match`] but never yields
/// an extraction.
#[derive(Debug, Clone)]
pub struct UrlRule {
    pattern: String,
    compiled: Regex,
    enabled: bool,
}

impl UrlRule {
    pub fn new(pattern: impl Into<String>, enabled: bool) -> Result<Self, RuleError> {
        let pattern = pattern.into();
        let compiled = Regex::new(&pattern).map_err(|source| RuleError::InvalidRegex {
            pattern: pattern.clone(),
            source,
        })?;
        Ok(Self {
            pattern,
            compiled,
            enabled,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Replace the pattern, recompiling it; the old pattern survives a failure
    pub fn set_pattern(&mut self, pattern: impl Into<String>) -> Result<(), RuleError> {
        let pattern = pattern.into();
        let compiled = Regex::new(&pattern).map_err(|source| RuleError::InvalidRegex {
            pattern: pattern.clone(),
            source,
        })?;
        self.pattern = pattern;
        self.compiled = compiled;
        Ok(())
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Containment check: does the URL contain a match for this rule?
    ///
    /// Disabled rules never match.
    pub fn is_match(&self, url: &str) -> bool {
        self.enabled && self.compiled.is_match(url)
    }

    /// Extraction: the text of capture group 1 at the first match position
    ///
    /// Returns `None` for disabled rules, non-matching URLs, rules without a
    /// capturing group, and empty captures. Groups 2+ are ignored.
    pub fn capture(&self, url: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let caps = self.compiled.captures(url)?;
        let group = caps.get(1)?;
        if group.as_str().is_empty() {
            return None;
        }
        Some(group.as_str().to_string())
    }
}

impl PartialEq for UrlRule {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.enabled == other.enabled
    }
}

impl Eq for UrlRule {}

impl fmt::Display for UrlRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]",
            self.pattern,
            if self.enabled { "enabled" } else { "disabled" }
        )
    }
}

/// One consistent snapshot of the whole rule configuration
///
/// Pipeline invocations evaluate against a snapshot; mutation happens in
/// [`RuleStore`], which swaps in a fresh snapshot atomically. The crate-level
/// `enabled` flag lives here too so callers never consult ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    pub enabled: bool,
    pub url_rules: Vec<UrlRule>,
    pub body_rules: Vec<ExtractionRule>,
    /// Pre-selected kind for configuration UIs; irrelevant to evaluation
    pub default_kind: RuleKind,
}

impl RuleSet {
    /// An empty, enabled rule set
    pub fn empty() -> Self {
        Self {
            enabled: true,
            url_rules: Vec::new(),
            body_rules: Vec::new(),
            default_kind: RuleKind::Regex,
        }
    }

    /// The built-in rule set used when nothing was persisted
    ///
    /// Three permissive URL substring patterns and four body rules aimed at
    /// the common `"method"`/`"action"` RPC envelope shapes.
    pub fn with_defaults() -> Self {
        let mut set = Self::empty();
        set.seed_default_url_rules();
        set.seed_default_body_rules();
        set
    }

    pub(crate) fn seed_default_url_rules(&mut self) {
        for pattern in [".*api.*", ".*gateway.*", ".*service.*"] {
            match UrlRule::new(pattern, true) {
                Ok(rule) => self.url_rules.push(rule),
                Err(err) => unreachable!("built-in URL rule must compile: {err}"),
            }
        }
    }

    pub(crate) fn seed_default_body_rules(&mut self) {
        self.body_rules.extend([
            ExtractionRule::new(RuleKind::Regex, r#""method"\s*:\s*"([^"]+)""#, true),
            ExtractionRule::new(RuleKind::Regex, r#""action"\s*:\s*"([^"]+)""#, true),
            ExtractionRule::new(RuleKind::JsonPath, "$.method", true),
            ExtractionRule::new(RuleKind::JsonPath, "$.action", true),
        ]);
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::with_defaults()
    }
}
