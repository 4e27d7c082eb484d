// Input event representation: an unordered key-value map plus the small set
// of value types the field predicate and flag template engines understand.
//
// Modeled on the teacher's `match_clause::FieldValue` (same tagged-enum
// shape), extended with a `Bytes` variant — the spec requires base64-aware
// byte-string comparison that the teacher enum doesn't carry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single field value carried by a `Record`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// String rendering used by Equal (cross-type fallback), TextContains,
    /// RegexMatch, and flag template substitution. Byte values are decoded
    /// with `decoding`; a decode failure renders as an empty string.
    pub fn render_as_text(&self, decoding: ByteDecoding) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Bytes(b) => decoding.decode(b).unwrap_or_default(),
        }
    }

    /// Numeric view, for GreaterThan's direct-compare fast path.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Length used by LengthEqual/LengthGreaterThan. Undefined (`None`) for
    /// numeric/boolean content, per spec.
    pub fn len_for_match(&self) -> Option<usize> {
        match self {
            FieldValue::Text(s) => Some(s.len()),
            FieldValue::Bytes(b) => Some(b.len()),
            _ => None,
        }
    }

    /// Attempts an integer parse, used by GreaterThan's fallback path and
    /// by length comparisons' target-side coercion.
    pub fn parse_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            FieldValue::Float(f) => Some(*f as i64),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Boolean(_) | FieldValue::Bytes(_) => None,
        }
    }

    /// Raw bytes view, decoding a base64 `Text` payload if necessary; used
    /// when the comparison target is itself `Bytes`. A malformed base64
    /// string decodes to an empty byte vector (best-effort, never an error).
    pub fn as_bytes_lossy(&self) -> Vec<u8> {
        match self {
            FieldValue::Bytes(b) => b.clone(),
            FieldValue::Text(s) => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD
                    .decode(s)
                    .unwrap_or_default()
            }
            other => other.render_as_text(ByteDecoding::Utf8).into_bytes(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Text(_) => "text",
            FieldValue::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render_as_text(ByteDecoding::Utf8))
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}
impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}
impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}
impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}
impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}
impl From<Vec<u8>> for FieldValue {
    fn from(b: Vec<u8>) -> Self {
        FieldValue::Bytes(b)
    }
}

/// Decoding scheme applied to `Bytes` fields when they must be rendered as
/// text (flag template substitution, string-coerced predicates). Defaults
/// to UTF-16, per spec; configurable because real deployments mix encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteDecoding {
    #[default]
    Utf16Le,
    Utf8,
}

impl ByteDecoding {
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            ByteDecoding::Utf8 => std::str::from_utf8(bytes).ok().map(|s| s.to_string()),
            ByteDecoding::Utf16Le => {
                if bytes.len() % 2 != 0 {
                    return None;
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&units).ok()
            }
        }
    }
}

/// An incoming event: an unordered key-value map. Missing keys are legal
/// everywhere a field is looked up; callers never need to pre-populate
/// absent fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record(pub HashMap<String, FieldValue>);

impl Record {
    pub fn new() -> Self {
        Record(HashMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Record(HashMap::from_iter(iter))
    }
}
