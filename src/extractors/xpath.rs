//! XPath extractor over XML content
//!
//! Parsing is hardened against XML external-entity injection: payloads
//! carrying a DOCTYPE declaration are rejected before any parsing happens, so
//! no entity expansion or external fetch can ever occur. `sxd-document`
//! performs no DTD or external-entity resolution either, so the guarantee
//! does not rest on parser internals.

use std::sync::OnceLock;

use regex::Regex;
use sxd_document::parser;
use sxd_xpath::nodeset::Node;
use sxd_xpath::{Context, Factory, Value, XPath};
use tracing::{debug, warn};

use crate::error::RuleError;
use crate::extractors::{non_empty, NameExtractor};

// XML-like envelope: trimmed content starts with `<` followed by `?` (prolog)
// or a name character, and ends with `>`.
fn xml_envelope() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^<[?\w].*>$").expect("valid regex"))
}

/// Extracts the first node selected by an XPath expression
///
/// Expects a node-set result: an attribute node yields its value, an element
/// its concatenated text content, any other node its string value. Empty
/// node-sets, parse failures, and non-node-set results degrade to `None`.
pub struct XPathExtractor {
    xpath: XPath,
    expression: String,
}

impl XPathExtractor {
    pub fn new(expression: &str) -> Result<Self, RuleError> {
        let xpath = Factory::new()
            .build(expression)
            .map_err(|e| RuleError::InvalidXPath {
                pattern: expression.to_string(),
                message: e.to_string(),
            })?
            .ok_or_else(|| RuleError::InvalidXPath {
                pattern: expression.to_string(),
                message: "empty expression".to_string(),
            })?;
        Ok(Self {
            xpath,
            expression: expression.to_string(),
        })
    }
}

impl NameExtractor for XPathExtractor {
    fn extract(&self, content: &str) -> Option<String> {
        if content.is_empty() {
            return None;
        }
        let trimmed = content.trim();
        if !xml_envelope().is_match(trimmed) {
            return None;
        }
        // XXE defense: DOCTYPE declarations (and with them entity
        // definitions) are not allowed in request bodies.
        if trimmed.to_ascii_lowercase().contains("<!doctype") {
            warn!(xpath = %self.expression, "rejecting XML content with DOCTYPE declaration");
            return None;
        }

        let package = match parser::parse(trimmed) {
            Ok(package) => package,
            Err(err) => {
                debug!(xpath = %self.expression, %err, "content sniffed as XML but failed to parse");
                return None;
            }
        };
        let document = package.as_document();

        let value = match self.xpath.evaluate(&Context::new(), document.root()) {
            Ok(value) => value,
            Err(err) => {
                debug!(xpath = %self.expression, %err, "XPath evaluation failed");
                return None;
            }
        };

        match value {
            Value::Nodeset(nodes) => nodes.document_order_first().and_then(|node| match node {
                Node::Attribute(attribute) => non_empty(attribute.value().to_string()),
                other => non_empty(other.string_value()),
            }),
            other => {
                debug!(xpath = %self.expression, ?other, "expected a node-set result");
                None
            }
        }
    }
}
