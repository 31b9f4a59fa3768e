//! URL-encoded form field extractor

use std::borrow::Cow;
use std::sync::OnceLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use tracing::debug;

use crate::extractors::{non_empty, NameExtractor};

// Loose key=value pair shape; content without at least one pair is not a
// form body.
fn pair_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^&=]+=[^&]*").expect("valid regex"))
}

/// Looks up one field in a `key=value&key=value` body
///
/// Keys and values are percent-decoded as UTF-8 with `+` as space. The first
/// pair whose decoded key equals the target field decides the outcome;
/// segments without `=` are skipped.
#[derive(Debug)]
pub struct FormExtractor {
    field: String,
}

impl FormExtractor {
    pub fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
        }
    }

    fn decode(&self, raw: &str) -> Option<String> {
        let plus_decoded: Cow<'_, str> = if raw.contains('+') {
            Cow::Owned(raw.replace('+', " "))
        } else {
            Cow::Borrowed(raw)
        };
        match percent_decode_str(&plus_decoded).decode_utf8() {
            Ok(decoded) => Some(decoded.into_owned()),
            Err(err) => {
                debug!(field = %self.field, %err, "form segment is not valid UTF-8 after decoding");
                None
            }
        }
    }
}

impl NameExtractor for FormExtractor {
    fn extract(&self, content: &str) -> Option<String> {
        if content.is_empty() || !pair_shape().is_match(content) {
            return None;
        }

        for segment in content.split('&') {
            let Some((raw_key, raw_value)) = segment.split_once('=') else {
                continue;
            };
            let key = self.decode(raw_key)?;
            if key == self.field {
                return self.decode(raw_value).and_then(non_empty);
            }
        }
        None
    }
}
