// Flag rendering: substitutes `{field}` placeholders in a template string
// with values pulled out of a `Record`. Grounded on the original
// `_DefaultFlagGenerator`, with one documented deviation: a missing key
// leaves the literal placeholder in place rather than raising, per the
// engine's acceptable-degradation contract (such flags simply fail to
// correlate later). An undecodable bytes field still renders empty.

use crate::record::{ByteDecoding, Record};

/// A flag name pattern such as `"login_fail:{user}"`. Rendering is plain
/// text substitution, not a templating engine — no conditionals, no
/// nested lookups, matching the reference implementation's
/// `str.format(**data)` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagTemplate(pub String);

impl FlagTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        FlagTemplate(template.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders the template against `record`. An empty template renders to
    /// an empty string, which callers treat as "no flag" (falsy).
    pub fn render(&self, record: &Record, decoding: ByteDecoding) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let mut out = String::with_capacity(self.0.len());
        let bytes = self.0.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'{' {
                if let Some(end) = self.0[i + 1..].find('}') {
                    let key = &self.0[i + 1..i + 1 + end];
                    match record.get(key) {
                        Some(value) => out.push_str(&value.render_as_text(decoding)),
                        None => {
                            out.push('{');
                            out.push_str(key);
                            out.push('}');
                        }
                    }
                    i = i + 1 + end + 1;
                    continue;
                }
            }
            let ch = self.0[i..].chars().next().unwrap();
            out.push(ch);
            i += ch.len_utf8();
        }
        out
    }
}

impl From<&str> for FlagTemplate {
    fn from(s: &str) -> Self {
        FlagTemplate::new(s)
    }
}
impl From<String> for FlagTemplate {
    fn from(s: String) -> Self {
        FlagTemplate::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;

    fn rec(pairs: &[(&str, FieldValue)]) -> Record {
        pairs.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn substitutes_known_field() {
        let r = rec(&[("user", FieldValue::Text("alice".into()))]);
        let t = FlagTemplate::new("login_fail:{user}");
        assert_eq!(t.render(&r, ByteDecoding::Utf8), "login_fail:alice");
    }

    #[test]
    fn missing_field_leaves_placeholder_literal() {
        let r = rec(&[]);
        let t = FlagTemplate::new("fail:{user}:{ip}");
        assert_eq!(t.render(&r, ByteDecoding::Utf8), "fail:{user}:{ip}");
    }

    #[test]
    fn empty_template_is_empty() {
        let r = rec(&[]);
        let t = FlagTemplate::new("");
        assert_eq!(t.render(&r, ByteDecoding::Utf8), "");
        assert!(t.is_empty());
    }

    #[test]
    fn no_placeholders_passes_through() {
        let r = rec(&[]);
        let t = FlagTemplate::new("static_flag");
        assert_eq!(t.render(&r, ByteDecoding::Utf8), "static_flag");
    }
}
