//! Rule configuration persistence and interchange
//!
//! Two encodings exist, for different audiences:
//!
//! - A flat key-value encoding (`kind|pattern|enabled` per entry) against the
//!   host's string/int/bool store, behind the [`KeyValueStore`] trait. This is
//!   the legacy at-rest format; a pattern containing a literal `|` does not
//!   survive it (the entry fails validation on reload and is skipped).
//! - A JSON document (`{"enabled", "urlPatterns", "extractionRules"}`) for
//!   export/import between installations. Round-trips exactly, `|` included.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::error::RuleError;
use crate::extractors;
use crate::rules::{ExtractionRule, RuleKind, RuleSet, UrlRule};

const KEY_ENABLED: &str = "config.enabled";
const KEY_DEFAULT_RULE_TYPE: &str = "config.default_rule_type";
const KEY_URL_PATTERNS: &str = "config.url_patterns";
const KEY_EXTRACTION_RULES: &str = "config.extraction_rules";
const KEY_COUNT_URL_PATTERNS: &str = "config.count.url_patterns";
const KEY_COUNT_EXTRACTION_RULES: &str = "config.count.extraction_rules";

/// Flat typed key-value store supplied by the host
///
/// Mirrors the persistence surface of embedding platforms: keyed booleans,
/// integers, and strings, nothing structured.
pub trait KeyValueStore {
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn set_bool(&mut self, key: &str, value: bool);
    fn get_i64(&self, key: &str) -> Option<i64>;
    fn set_i64(&mut self, key: &str, value: i64);
    fn get_string(&self, key: &str) -> Option<String>;
    fn set_string(&mut self, key: &str, value: &str);
}

/// In-memory [`KeyValueStore`] for tests and hosts without their own store
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    bools: HashMap<String, bool>,
    ints: HashMap<String, i64>,
    strings: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.bools.get(key).copied()
    }

    fn set_bool(&mut self, key: &str, value: bool) {
        self.bools.insert(key.to_string(), value);
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        self.ints.get(key).copied()
    }

    fn set_i64(&mut self, key: &str, value: i64) {
        self.ints.insert(key.to_string(), value);
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.strings.get(key).cloned()
    }

    fn set_string(&mut self, key: &str, value: &str) {
        self.strings.insert(key.to_string(), value.to_string());
    }
}

/// Load a rule set from the flat store
///
/// Entries that fail to decode or re-validate are skipped with a warning; the
/// remainder load in their stored order. Missing keys fall back to an empty,
/// enabled set (the [`RuleStore`](crate::rules::RuleStore) seeds defaults on
/// top of that).
pub fn load(store: &dyn KeyValueStore) -> RuleSet {
    let mut set = RuleSet::empty();

    if let Some(enabled) = store.get_bool(KEY_ENABLED) {
        set.enabled = enabled;
    }

    let url_count = store.get_i64(KEY_COUNT_URL_PATTERNS).unwrap_or(0).max(0);
    for i in 0..url_count {
        let key = format!("{KEY_URL_PATTERNS}.{i}");
        let Some(entry) = store.get_string(&key) else {
            continue;
        };
        match decode_url_entry(&entry) {
            Ok(rule) => set.url_rules.push(rule),
            Err(err) => warn!(%key, %err, "skipping persisted URL rule"),
        }
    }

    let rule_count = store.get_i64(KEY_COUNT_EXTRACTION_RULES).unwrap_or(0).max(0);
    for i in 0..rule_count {
        let key = format!("{KEY_EXTRACTION_RULES}.{i}");
        let Some(entry) = store.get_string(&key) else {
            continue;
        };
        match decode_rule_entry(&entry) {
            Ok(rule) => set.body_rules.push(rule),
            Err(err) => warn!(%key, %err, "skipping persisted extraction rule"),
        }
    }

    if let Some(tag) = store.get_string(KEY_DEFAULT_RULE_TYPE) {
        match RuleKind::from_tag(&tag) {
            Ok(kind) => set.default_kind = kind,
            Err(err) => warn!(%err, "keeping default rule kind"),
        }
    }

    info!(
        url_rules = set.url_rules.len(),
        body_rules = set.body_rules.len(),
        "rule configuration loaded"
    );
    set
}

/// Save a rule set to the flat store
pub fn save(store: &mut dyn KeyValueStore, set: &RuleSet) {
    store.set_bool(KEY_ENABLED, set.enabled);

    store.set_i64(KEY_COUNT_URL_PATTERNS, set.url_rules.len() as i64);
    for (i, rule) in set.url_rules.iter().enumerate() {
        store.set_string(
            &format!("{KEY_URL_PATTERNS}.{i}"),
            &format!("{}|{}", rule.pattern(), rule.is_enabled()),
        );
    }

    store.set_i64(KEY_COUNT_EXTRACTION_RULES, set.body_rules.len() as i64);
    for (i, rule) in set.body_rules.iter().enumerate() {
        store.set_string(
            &format!("{KEY_EXTRACTION_RULES}.{i}"),
            &format!(
                "{}|{}|{}",
                rule.kind().as_tag(),
                rule.pattern(),
                rule.is_enabled()
            ),
        );
    }

    store.set_string(KEY_DEFAULT_RULE_TYPE, set.default_kind.as_tag());
    info!("rule configuration saved");
}

// `pattern|enabled`, split at the first `|`. A pattern containing `|` shifts
// its tail into the enabled field, which then fails to parse; the entry is
// rejected rather than loaded corrupted.
fn decode_url_entry(entry: &str) -> Result<UrlRule, RuleError> {
    let (pattern, enabled) = entry
        .split_once('|')
        .ok_or_else(|| RuleError::MalformedEntry(entry.to_string()))?;
    let enabled: bool = enabled
        .parse()
        .map_err(|_| RuleError::MalformedEntry(entry.to_string()))?;
    UrlRule::new(pattern, enabled)
}

// `KIND|pattern|enabled`, same `|` caveat as URL entries.
fn decode_rule_entry(entry: &str) -> Result<ExtractionRule, RuleError> {
    let mut parts = entry.splitn(3, '|');
    let (Some(tag), Some(pattern), Some(enabled)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(RuleError::MalformedEntry(entry.to_string()));
    };
    let kind = RuleKind::from_tag(tag)?;
    let enabled: bool = enabled
        .parse()
        .map_err(|_| RuleError::MalformedEntry(entry.to_string()))?;
    extractors::validate_pattern(kind, pattern)?;
    Ok(ExtractionRule::new(kind, pattern, enabled))
}

/// Interchange document: the full rule set as one JSON value
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDocument {
    pub enabled: bool,
    pub url_patterns: Vec<UrlPatternEntry>,
    pub extraction_rules: Vec<ExtractionRuleEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UrlPatternEntry {
    pub pattern: String,
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRuleEntry {
    pub rule_type: RuleKind,
    pub pattern: String,
    pub enabled: bool,
}

/// Export the rule set as a pretty-printed JSON document
pub fn export_json(set: &RuleSet) -> Result<String, RuleError> {
    let doc = RuleDocument {
        enabled: set.enabled,
        url_patterns: set
            .url_rules
            .iter()
            .map(|r| UrlPatternEntry {
                pattern: r.pattern().to_string(),
                enabled: r.is_enabled(),
            })
            .collect(),
        extraction_rules: set
            .body_rules
            .iter()
            .map(|r| ExtractionRuleEntry {
                rule_type: r.kind(),
                pattern: r.pattern().to_string(),
                enabled: r.is_enabled(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&doc).map_err(|e| RuleError::InvalidDocument(e.to_string()))
}

/// Parse and validate a JSON document into a rule set
///
/// All-or-nothing: every pattern in the document must validate before any
/// rule is accepted, so a failed import leaves the caller's existing
/// configuration untouched.
pub fn import_json(json: &str) -> Result<RuleSet, RuleError> {
    let doc: RuleDocument =
        serde_json::from_str(json).map_err(|e| RuleError::InvalidDocument(e.to_string()))?;

    let mut set = RuleSet::empty();
    set.enabled = doc.enabled;
    for entry in doc.url_patterns {
        set.url_rules.push(UrlRule::new(entry.pattern, entry.enabled)?);
    }
    for entry in doc.extraction_rules {
        extractors::validate_pattern(entry.rule_type, &entry.pattern)?;
        set.body_rules
            .push(ExtractionRule::new(entry.rule_type, entry.pattern, entry.enabled));
    }
    Ok(set)
}
