//! opname - rule-based extraction of RPC operation names from HTTP requests
//!
//! Many internal RPC gateways multiplex every operation over a handful of
//! URLs; the operation name hides in the request itself — a `"method"` key in
//! a JSON body, an attribute in an XML envelope, a form field, or a URL path
//! segment. This crate recovers that name with an ordered set of user-defined
//! extraction rules and annotates traffic with the result.
//!
//! # Core Concepts
//!
//! - **Rules**: ordered `(kind, pattern, enabled)` triples for body content
//!   plus regex rules for the URL; first enabled rule with a non-empty result
//!   wins
//! - **Extractors**: one strategy per rule kind (regex, JSON path, XPath,
//!   URL-encoded form), each sniffing content shape before parsing and
//!   degrading every evaluation failure to "no match"
//! - **Pipeline**: URL stage strictly before body stage, evaluated against an
//!   immutable configuration snapshot
//! - **Batch scanning**: the same pipeline over historical traffic, with
//!   scope filtering, cancellation, and duplicate-free name collection
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use opname::{ExtractionPipeline, RuleSet, RuleStore};
//!
//! let store = Arc::new(RuleStore::new(RuleSet::with_defaults()));
//! let pipeline = ExtractionPipeline::new(store);
//!
//! let outcome = pipeline.process(
//!     "https://host/api/gateway",
//!     r#"{"method":"user.login","params":{}}"#,
//! );
//! assert_eq!(outcome.name.as_deref(), Some("user.login"));
//! ```
//!
//! # Project Structure
//!
//! - [`rules`]: rule model, copy-on-write store, persistence and interchange
//! - [`extractors`]: the four extraction strategies and their factory
//! - [`pipeline`]: the two-stage URL-then-body evaluation
//! - [`batch`]: batch scanning over history items
//! - [`util`]: logging setup for hosts without their own subscriber

pub mod batch;
pub mod error;
pub mod extractors;
pub mod pipeline;
pub mod rules;
pub mod util;

pub use batch::{BatchReport, BatchScanner, CancelToken, HistoryEntry};
pub use error::RuleError;
pub use extractors::{create_extractor, validate_pattern, NameExtractor};
pub use pipeline::{ExtractionPipeline, Outcome};
pub use rules::persist::{KeyValueStore, MemoryStore};
pub use rules::{ExtractionRule, RuleKind, RuleSet, RuleStore, UrlRule};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
