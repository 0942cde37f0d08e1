//! Round-trip markers carrying a diagram's source through the generated
//! document.
//!
//! A marker is `MDOCX-DIAGRAM:<base64 of {"type":..,"code":..}>`. It is placed
//! in the diagram image's alt text and in a hidden paragraph after the image,
//! so the reverse pass can restore the fenced block the image came from.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::block::Dialect;

pub const PREFIX: &str = "MDOCX-DIAGRAM";

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("{}:[A-Za-z0-9+/]+=*", regex::escape(PREFIX)))
        .expect("marker pattern is valid")
});

#[derive(Serialize)]
struct PayloadRef<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    code: &'a str,
}

#[derive(Deserialize)]
struct Payload {
    #[serde(rename = "type")]
    kind: String,
    code: String,
}

/// A decoded marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramSource {
    pub dialect: Dialect,
    pub source: String,
}

pub fn encode(dialect: Dialect, source: &str) -> String {
    let payload = PayloadRef {
        kind: dialect.as_str(),
        code: source,
    };
    // Serializing two string fields cannot fail
    let json = serde_json::to_string(&payload).unwrap_or_default();
    format!("{PREFIX}:{}", STANDARD.encode(json))
}

/// Decode a marker string. Anything that is not a well-formed marker,
/// including arbitrary text, yields `None`.
pub fn decode(text: &str) -> Option<DiagramSource> {
    let encoded = text.strip_prefix(PREFIX)?.strip_prefix(':')?;
    let bytes = STANDARD.decode(encoded).ok()?;
    let payload: Payload = serde_json::from_slice(&bytes).ok()?;
    Some(DiagramSource {
        dialect: Dialect::from_tag(&payload.kind)?,
        source: payload.code,
    })
}

/// Every decodable marker embedded anywhere in `text`, in order.
pub fn find_markers(text: &str) -> Vec<DiagramSource> {
    MARKER_RE
        .find_iter(text)
        .filter_map(|m| decode(m.as_str()))
        .collect()
}

/// The marker pattern, for callers that need match positions.
pub(crate) fn pattern() -> &'static Regex {
    &MARKER_RE
}
