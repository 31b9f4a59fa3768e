//! Copy-on-write holder for the live rule configuration
//!
//! Pipeline invocations may run concurrently from many threads while a
//! configuration UI mutates rules from one writer thread. The store keeps the
//! whole configuration in an `Arc<RuleSet>` behind an `RwLock`: readers clone
//! the `Arc` and evaluate against that immutable snapshot, writers build a
//! modified copy and swap it in. A reader never observes a half-updated list.

use std::sync::{Arc, RwLock};

use tracing::info;

use crate::error::RuleError;
use crate::extractors;
use crate::rules::{ExtractionRule, RuleKind, RuleSet, UrlRule};

/// Thread-safe snapshot holder with validated mutation operations
///
/// Every mutation validates its inputs first and leaves the stored set in an
/// immediately-persistable state. A failed mutation leaves the previous
/// snapshot fully intact.
#[derive(Debug)]
pub struct RuleStore {
    inner: RwLock<Arc<RuleSet>>,
}

impl RuleStore {
    /// Wrap an initial rule set, seeding built-in defaults for empty lists
    ///
    /// Mirrors startup from persisted state: a host that has never saved any
    /// rules gets the permissive defaults instead of a dead configuration.
    pub fn new(initial: RuleSet) -> Self {
        let mut set = initial;
        if set.url_rules.is_empty() {
            set.seed_default_url_rules();
            info!("no URL rules configured, seeded built-in defaults");
        }
        if set.body_rules.is_empty() {
            set.seed_default_body_rules();
            info!("no extraction rules configured, seeded built-in defaults");
        }
        Self {
            inner: RwLock::new(Arc::new(set)),
        }
    }

    /// Current consistent snapshot; cheap (one `Arc` clone)
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn mutate<T>(&self, op: impl FnOnce(&mut RuleSet) -> Result<T, RuleError>) -> Result<T, RuleError> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let mut next = (**guard).clone();
        let out = op(&mut next)?;
        *guard = Arc::new(next);
        Ok(out)
    }

    pub fn set_enabled(&self, enabled: bool) {
        let _ = self.mutate(|set| {
            set.enabled = enabled;
            Ok(())
        });
    }

    pub fn set_default_kind(&self, kind: RuleKind) {
        let _ = self.mutate(|set| {
            set.default_kind = kind;
            Ok(())
        });
    }

    pub fn add_url_rule(&self, pattern: &str, enabled: bool) -> Result<(), RuleError> {
        let rule = UrlRule::new(pattern, enabled)?;
        self.mutate(|set| {
            set.url_rules.push(rule);
            Ok(())
        })
    }

    pub fn update_url_rule(
        &self,
        index: usize,
        pattern: &str,
        enabled: bool,
    ) -> Result<(), RuleError> {
        let rule = UrlRule::new(pattern, enabled)?;
        self.mutate(|set| {
            let slot = set
                .url_rules
                .get_mut(index)
                .ok_or(RuleError::IndexOutOfRange(index))?;
            *slot = rule;
            Ok(())
        })
    }

    pub fn remove_url_rule(&self, index: usize) -> Result<UrlRule, RuleError> {
        self.mutate(|set| {
            if index >= set.url_rules.len() {
                return Err(RuleError::IndexOutOfRange(index));
            }
            Ok(set.url_rules.remove(index))
        })
    }

    pub fn add_body_rule(
        &self,
        kind: RuleKind,
        pattern: &str,
        enabled: bool,
    ) -> Result<(), RuleError> {
        extractors::validate_pattern(kind, pattern)?;
        self.mutate(|set| {
            set.body_rules.push(ExtractionRule::new(kind, pattern, enabled));
            Ok(())
        })
    }

    pub fn update_body_rule(
        &self,
        index: usize,
        kind: RuleKind,
        pattern: &str,
        enabled: bool,
    ) -> Result<(), RuleError> {
        extractors::validate_pattern(kind, pattern)?;
        self.mutate(|set| {
            let slot = set
                .body_rules
                .get_mut(index)
                .ok_or(RuleError::IndexOutOfRange(index))?;
            *slot = ExtractionRule::new(kind, pattern, enabled);
            Ok(())
        })
    }

    pub fn remove_body_rule(&self, index: usize) -> Result<ExtractionRule, RuleError> {
        self.mutate(|set| {
            if index >= set.body_rules.len() {
                return Err(RuleError::IndexOutOfRange(index));
            }
            Ok(set.body_rules.remove(index))
        })
    }

    /// Replace the whole configuration atomically (used by document import)
    pub fn replace(&self, set: RuleSet) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(set);
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new(RuleSet::with_defaults())
    }
}
