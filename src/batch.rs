//! Batch processing of historical request items
//!
//! A thin iterator over the extraction pipeline: one rule snapshot for the
//! whole scan, an optional host-supplied scope predicate, and per-item fault
//! tolerance — a failing item is logged and skipped, never aborting the
//! batch. History is unbounded, so scans honor a cancellation token between
//! items.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::pipeline::ExtractionPipeline;
use crate::rules::RuleStore;

/// One historical request/response item supplied by the host
///
/// `body` and `annotate` are fallible because they cross back into the host
/// (lazy body decoding, annotation storage); failures there are per-item
/// faults, not batch faults.
pub trait HistoryEntry {
    type Error: fmt::Display;

    /// The request URL
    fn url(&self) -> &str;

    /// The request body, decoded to text
    fn body(&self) -> Result<String, Self::Error>;

    /// Attach the extracted name as free-text metadata on the item
    fn annotate(&mut self, name: &str) -> Result<(), Self::Error>;
}

/// Shared flag for stopping an in-flight scan between items
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Aggregate counts for one batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Items that passed the scope filter and were processed without fault
    pub processed: usize,
    /// Items that yielded an extraction and were annotated
    pub matched: usize,
    /// Whether the scan stopped early on the cancel token
    pub cancelled: bool,
}

/// Applies the extraction pipeline across a collection of history items
pub struct BatchScanner {
    store: Arc<RuleStore>,
    cancel: CancelToken,
}

impl BatchScanner {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self {
            store,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(store: Arc<RuleStore>, cancel: CancelToken) -> Self {
        Self { store, cancel }
    }

    /// Token the host can hand to another thread to stop the scan
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Process every item, optionally filtered by a scope predicate on the URL
    ///
    /// No predicate means process everything. Matching items are annotated
    /// with the extracted name.
    pub fn process_all<I: HistoryEntry>(
        &self,
        items: &mut [I],
        scope: Option<&dyn Fn(&str) -> bool>,
    ) -> BatchReport {
        let rules = self.store.snapshot();
        let mut report = BatchReport::default();

        info!(total = items.len(), "starting history scan");
        for item in items.iter_mut() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if let Some(in_scope) = scope {
                if !in_scope(item.url()) {
                    continue;
                }
            }

            let body = match item.body() {
                Ok(body) => body,
                Err(err) => {
                    warn!(url = item.url(), %err, "skipping item: body unavailable");
                    continue;
                }
            };

            let outcome = ExtractionPipeline::process_with(&rules, item.url(), &body);
            if let Some(name) = outcome.name {
                if let Err(err) = item.annotate(&name) {
                    warn!(url = item.url(), %err, "skipping item: annotation failed");
                    continue;
                }
                debug!(url = item.url(), %name, "annotated history item");
                report.matched += 1;
            }
            report.processed += 1;
        }

        info!(
            processed = report.processed,
            matched = report.matched,
            cancelled = report.cancelled,
            "history scan finished"
        );
        report
    }

    /// Process an explicit selection of items; returns the match count
    pub fn process_selected<I: HistoryEntry>(&self, items: &mut [I]) -> usize {
        self.process_all(items, None).matched
    }

    /// Collect the distinct extracted names across items, without annotating
    ///
    /// Intended for reporting and export; items are only read.
    pub fn collect_unique<I: HistoryEntry>(&self, items: &[I]) -> BTreeSet<String> {
        let rules = self.store.snapshot();
        let mut names = BTreeSet::new();

        for item in items {
            if self.cancel.is_cancelled() {
                break;
            }
            let body = match item.body() {
                Ok(body) => body,
                Err(err) => {
                    warn!(url = item.url(), %err, "skipping item: body unavailable");
                    continue;
                }
            };
            if let Some(name) = ExtractionPipeline::process_with(&rules, item.url(), &body).name {
                names.insert(name);
            }
        }

        info!(distinct = names.len(), "collected distinct operation names");
        names
    }
}
