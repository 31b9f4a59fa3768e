//! End-to-end tests for the extraction pipeline and batch scanner

use std::sync::Arc;

use opname::{
    BatchScanner, ExtractionPipeline, ExtractionRule, HistoryEntry, RuleKind, RuleSet, RuleStore,
    UrlRule,
};
use yare::parameterized;

fn store_with(set: RuleSet) -> Arc<RuleStore> {
    Arc::new(RuleStore::new(set))
}

#[derive(Debug)]
struct Recorded {
    url: String,
    body: String,
    note: Option<String>,
}

impl Recorded {
    fn new(url: &str, body: &str) -> Self {
        Self {
            url: url.to_string(),
            body: body.to_string(),
            note: None,
        }
    }
}

impl HistoryEntry for Recorded {
    type Error = String;

    fn url(&self) -> &str {
        &self.url
    }

    fn body(&self) -> Result<String, String> {
        Ok(self.body.clone())
    }

    fn annotate(&mut self, name: &str) -> Result<(), String> {
        self.note = Some(name.to_string());
        Ok(())
    }
}

// The worked examples from the four extraction strategies, run through the
// whole pipeline rather than against a bare extractor.
#[parameterized(
    regex = { RuleKind::Regex, r#""method"\s*:\s*"([^"]+)""#, r#"{"method":"login"}"#, "login" },
    json_path = { RuleKind::JsonPath, "$.action", r#"{"action":"submit","id":1}"#, "submit" },
    xpath = { RuleKind::XPath, "/req/@op", r#"<req op="create"/>"#, "create" },
    form = { RuleKind::Form, "action", "id=5&action=delete&x=1", "delete" },
)]
fn body_rule_kinds_extract(kind: RuleKind, pattern: &str, body: &str, expected: &str) {
    let mut set = RuleSet::empty();
    set.url_rules.push(UrlRule::new(".*", true).unwrap());
    set.body_rules.push(ExtractionRule::new(kind, pattern, true));

    let pipeline = ExtractionPipeline::new(store_with(set));
    let outcome = pipeline.process("https://host/api", body);
    assert_eq!(outcome.name.as_deref(), Some(expected));
    assert!(outcome.matched);
}

#[test]
fn url_capture_wins_even_when_body_would_match() {
    let mut set = RuleSet::empty();
    set.url_rules
        .push(UrlRule::new(r"/rpc/([\w.]+)", true).unwrap());
    set.body_rules
        .push(ExtractionRule::new(RuleKind::JsonPath, "$.method", true));

    let pipeline = ExtractionPipeline::new(store_with(set));
    let outcome = pipeline.process("https://host/rpc/fromUrl", r#"{"method":"fromBody"}"#);
    assert_eq!(outcome.name.as_deref(), Some("fromUrl"));
}

#[test]
fn url_rule_without_group_falls_through_to_body() {
    let mut set = RuleSet::empty();
    // Matches the URL but has no capture group, so it contributes nothing.
    set.url_rules.push(UrlRule::new(".*api.*", true).unwrap());
    set.body_rules
        .push(ExtractionRule::new(RuleKind::JsonPath, "$.method", true));

    let pipeline = ExtractionPipeline::new(store_with(set));
    let outcome = pipeline.process("https://host/api", r#"{"method":"fallback"}"#);
    assert_eq!(outcome.name.as_deref(), Some("fallback"));
}

#[test]
fn no_url_match_and_empty_body_is_no_match() {
    let pipeline = ExtractionPipeline::new(store_with(RuleSet::with_defaults()));
    let outcome = pipeline.process("https://host/unrelated", "");
    assert_eq!(outcome.name, None);
    assert!(!outcome.matched);
}

#[test]
fn second_of_three_rules_decides() {
    let mut set = RuleSet::empty();
    set.url_rules.push(UrlRule::new(".*", true).unwrap());
    set.body_rules.extend([
        ExtractionRule::new(RuleKind::Regex, r#""missing":"([^"]+)""#, true),
        ExtractionRule::new(RuleKind::Form, "action", true),
        // Would match anything; must never be reached.
        ExtractionRule::new(RuleKind::Regex, "(.+)", true),
    ]);

    let pipeline = ExtractionPipeline::new(store_with(set));
    let outcome = pipeline.process("https://host/x", "id=1&action=reset");
    assert_eq!(outcome.name.as_deref(), Some("reset"));
}

#[test]
fn repeated_processing_is_stable() {
    let pipeline = ExtractionPipeline::new(store_with(RuleSet::with_defaults()));
    let url = "https://host/api/gateway";
    let body = r#"{"action":"order.create"}"#;

    let first = pipeline.process(url, body);
    let second = pipeline.process(url, body);
    assert_eq!(first, second);
    assert_eq!(first.name.as_deref(), Some("order.create"));
}

#[test]
fn concurrent_reads_with_writer_see_consistent_snapshots() {
    let store = store_with(RuleSet::with_defaults());
    let pipeline = Arc::new(ExtractionPipeline::new(store.clone()));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = pipeline.clone();
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let outcome =
                        pipeline.process("https://host/api", r#"{"method":"spin"}"#);
                    // A snapshot either extracts or the set was replaced with
                    // a disabled one; it never errors or tears.
                    if let Some(name) = outcome.name {
                        assert_eq!(name, "spin");
                    }
                }
            })
        })
        .collect();

    for i in 0..50 {
        store.set_enabled(i % 2 == 0);
    }
    for reader in readers {
        reader.join().expect("reader thread panicked");
    }
}

#[test]
fn batch_scan_annotates_matching_history() {
    let mut items = vec![
        Recorded::new("https://a.example/api", r#"{"method":"login"}"#),
        Recorded::new("https://b.example/static/logo.png", ""),
        Recorded::new("https://c.example/api", r#"{"method":"logout"}"#),
    ];

    let scanner = BatchScanner::new(store_with(RuleSet::with_defaults()));
    let report = scanner.process_all(&mut items, None);
    assert_eq!(report.processed, 3);
    assert_eq!(report.matched, 2);
    assert_eq!(items[0].note.as_deref(), Some("login"));
    assert_eq!(items[2].note.as_deref(), Some("logout"));
}

#[test]
fn collect_unique_dedupes_across_history() {
    let items = vec![
        Recorded::new("https://a/api", r#"{"method":"login"}"#),
        Recorded::new("https://b/api", r#"{"method":"logout"}"#),
        Recorded::new("https://c/api", r#"{"method":"login"}"#),
    ];

    let scanner = BatchScanner::new(store_with(RuleSet::with_defaults()));
    let names = scanner.collect_unique(&items);
    assert_eq!(names.len(), 2);
    assert!(names.contains("login"));
    assert!(names.contains("logout"));
}
