//! Two-stage extraction pipeline: URL first, body as fallback
//!
//! A URL rule that captures wins outright and body rules are never
//! consulted. Within each stage the stored rule order is a strict priority
//! chain and the first non-empty result ends the stage. The pipeline is
//! side-effect-free; the caller attaches the extracted name to its own
//! request object.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::extractors;
use crate::rules::{RuleSet, RuleStore};

/// Result of one pipeline invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The extracted operation name, if any rule fired
    pub name: Option<String>,
    /// Whether any rule fired; always `name.is_some()`
    pub matched: bool,
}

impl Outcome {
    fn no_match() -> Self {
        Self {
            name: None,
            matched: false,
        }
    }

    fn from_name(name: Option<String>) -> Self {
        Self {
            matched: name.is_some(),
            name,
        }
    }
}

/// Extraction pipeline bound to a rule store
///
/// Each invocation evaluates against one consistent snapshot taken at entry,
/// so concurrent configuration updates never tear an evaluation. Invocations
/// are pure: identical `(url, body)` inputs yield identical outcomes.
#[derive(Debug)]
pub struct ExtractionPipeline {
    store: Arc<RuleStore>,
}

impl ExtractionPipeline {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    /// Run the two-stage extraction for one request
    pub fn process(&self, url: &str, body: &str) -> Outcome {
        Self::process_with(&self.store.snapshot(), url, body)
    }

    /// Run the two-stage extraction against an explicit snapshot
    ///
    /// Batch scans use this to hold one snapshot across many items.
    pub fn process_with(rules: &RuleSet, url: &str, body: &str) -> Outcome {
        if !rules.enabled {
            return Outcome::no_match();
        }

        if let Some(name) = extract_from_url(rules, url) {
            debug!(url, %name, "operation name extracted from URL");
            return Outcome::from_name(Some(name));
        }

        let outcome = Outcome::from_name(extract_from_body(rules, body));
        if let Some(name) = &outcome.name {
            debug!(url, %name, "operation name extracted from body");
        }
        outcome
    }
}

// Stage 1: first enabled URL rule whose capture group 1 is non-empty wins.
fn extract_from_url(rules: &RuleSet, url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    rules.url_rules.iter().find_map(|rule| rule.capture(url))
}

// Stage 2: first enabled body rule producing a non-empty extraction wins.
// A rule whose extractor cannot be built counts as "no match" for that rule.
fn extract_from_body(rules: &RuleSet, body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    for rule in rules.body_rules.iter().filter(|r| r.is_enabled()) {
        match extractors::create_extractor(rule.kind(), rule.pattern()) {
            Ok(extractor) => {
                if let Some(name) = extractor.extract(body) {
                    return Some(name);
                }
            }
            Err(err) => {
                warn!(kind = %rule.kind(), pattern = rule.pattern(), %err, "skipping unbuildable rule");
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ExtractionRule, RuleKind, RuleSet, UrlRule};

    fn pipeline_with(set: RuleSet) -> ExtractionPipeline {
        ExtractionPipeline::new(Arc::new(RuleStore::new(set)))
    }

    fn body_only_set(rules: Vec<ExtractionRule>) -> RuleSet {
        let mut set = RuleSet::empty();
        // One URL rule without a capture group so the store does not reseed
        // defaults; it can never produce a URL-stage extraction.
        set.url_rules.push(UrlRule::new(".*", true).unwrap());
        set.body_rules = rules;
        set
    }

    #[test]
    fn test_url_capture_takes_precedence() {
        let mut set = RuleSet::empty();
        set.url_rules
            .push(UrlRule::new(r"/rpc/(\w+)", true).unwrap());
        set.body_rules
            .push(ExtractionRule::new(RuleKind::JsonPath, "$.method", true));

        let pipeline = pipeline_with(set);
        let outcome = pipeline.process("https://host/rpc/login", r#"{"method":"fromBody"}"#);
        assert_eq!(outcome.name.as_deref(), Some("login"));
        assert!(outcome.matched);
    }

    #[test]
    fn test_disabled_url_rule_skipped_in_order() {
        let mut set = RuleSet::empty();
        set.url_rules
            .push(UrlRule::new(r"/rpc/(\w+)", false).unwrap());
        set.url_rules
            .push(UrlRule::new(r"op=(\w+)", true).unwrap());
        set.body_rules
            .push(ExtractionRule::new(RuleKind::Form, "ignored", true));

        let pipeline = pipeline_with(set);
        let outcome = pipeline.process("https://host/rpc/first?op=second", "x=1");
        assert_eq!(outcome.name.as_deref(), Some("second"));
    }

    #[test]
    fn test_body_fallback_when_no_url_rule_captures() {
        let set = body_only_set(vec![ExtractionRule::new(
            RuleKind::JsonPath,
            "$.method",
            true,
        )]);
        let pipeline = pipeline_with(set);
        let outcome = pipeline.process("https://host/misc", r#"{"method":"sync"}"#);
        assert_eq!(outcome.name.as_deref(), Some("sync"));
    }

    #[test]
    fn test_empty_body_after_url_miss_is_no_match() {
        let set = body_only_set(vec![ExtractionRule::new(
            RuleKind::Regex,
            "(never)",
            true,
        )]);
        let pipeline = pipeline_with(set);
        let outcome = pipeline.process("https://host/misc", "   \n  ");
        assert_eq!(outcome, Outcome::no_match());
    }

    #[test]
    fn test_second_rule_wins_third_never_consulted() {
        // Rule order: a miss, a hit, then a catch-all that matches any body
        // and would report a different name if the chain ran past the hit.
        let set = body_only_set(vec![
            ExtractionRule::new(RuleKind::Regex, r#""nope":"([^"]+)""#, true),
            ExtractionRule::new(RuleKind::JsonPath, "$.action", true),
            ExtractionRule::new(RuleKind::Regex, "(.+)", true),
        ]);
        let pipeline = pipeline_with(set);
        let outcome = pipeline.process("https://host/misc", r#"{"action":"submit"}"#);
        assert_eq!(outcome.name.as_deref(), Some("submit"));
    }

    #[test]
    fn test_disabled_body_rule_skipped() {
        let set = body_only_set(vec![
            ExtractionRule::new(RuleKind::JsonPath, "$.method", false),
            ExtractionRule::new(RuleKind::JsonPath, "$.action", true),
        ]);
        let pipeline = pipeline_with(set);
        let outcome = pipeline.process("u", r#"{"method":"m","action":"a"}"#);
        assert_eq!(outcome.name.as_deref(), Some("a"));
    }

    #[test]
    fn test_globally_disabled_snapshot_never_matches() {
        let mut set = RuleSet::with_defaults();
        set.enabled = false;
        let pipeline = pipeline_with(set);
        let outcome = pipeline.process("https://host/api/x", r#"{"method":"login"}"#);
        assert_eq!(outcome, Outcome::no_match());
    }

    #[test]
    fn test_process_is_idempotent() {
        let pipeline = pipeline_with(RuleSet::with_defaults());
        let url = "https://host/api/v1";
        let body = r#"{"method":"user.login"}"#;
        assert_eq!(pipeline.process(url, body), pipeline.process(url, body));
    }

    #[test]
    fn test_default_rules_extract_method_key() {
        let pipeline = pipeline_with(RuleSet::with_defaults());
        let outcome = pipeline.process("https://host/api/v1", r#"{"method":"user.login"}"#);
        assert_eq!(outcome.name.as_deref(), Some("user.login"));
    }
}
