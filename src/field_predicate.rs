// Field-level predicate evaluation: one `FieldMatchSpec` against one
// `Record`. Grounded on the original reference implementation's
// `_DefaultFieldCheck` — the try/except-as-false shape is preserved
// deliberately: a missing field, a bad regex, or a failed numeric parse
// all evaluate to `false` rather than propagating an error. See
// `crate::error` for why that's not modeled with `Result`.

use crate::record::{ByteDecoding, FieldValue, Record};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The comparator identity, independent of sign. `MatchCode` on the wire
/// is `operator as i64`, possibly negated; negation flips the boolean
/// result, it never changes which comparator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i64)]
pub enum MatchOperator {
    Equal = 1,
    TextContains = 2,
    RegexMatch = 3,
    GreaterThan = 4,
    LengthEqual = 5,
    LengthGreaterThan = 6,
    /// Resolved Open Question: length-of-target variants, kept distinct
    /// from 5/6 rather than silently overloading them.
    LengthOfTargetEqual = 8,
    LengthOfTargetGreaterThan = 9,
}

impl MatchOperator {
    fn from_abs_code(code: i64) -> Option<Self> {
        Some(match code {
            1 => MatchOperator::Equal,
            2 => MatchOperator::TextContains,
            3 => MatchOperator::RegexMatch,
            4 => MatchOperator::GreaterThan,
            5 => MatchOperator::LengthEqual,
            6 => MatchOperator::LengthGreaterThan,
            8 => MatchOperator::LengthOfTargetEqual,
            9 => MatchOperator::LengthOfTargetGreaterThan,
            _ => return None,
        })
    }
}

/// One predicate over a single named field. `match_code`'s sign is the
/// negation bit; its absolute value selects the `MatchOperator`. A
/// `match_code` of `0` ("Preserve") always evaluates to `true` and is
/// used by plugins that want a field spec to participate without
/// constraining it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMatchSpec {
    pub field_name: String,
    pub match_content: FieldValue,
    pub match_code: i64,
    #[serde(default)]
    pub byte_decoding: ByteDecoding,
    /// Consumed only by the slicer plugin, which rewrites this spec
    /// before the default evaluator ever sees it. `None` for ordinary
    /// field specs.
    #[serde(default)]
    pub slice_from: Option<i64>,
    #[serde(default)]
    pub slice_to: Option<i64>,
}

impl FieldMatchSpec {
    pub fn new(field_name: impl Into<String>, match_content: impl Into<FieldValue>, match_code: i64) -> Self {
        FieldMatchSpec {
            field_name: field_name.into(),
            match_content: match_content.into(),
            match_code,
            byte_decoding: ByteDecoding::default(),
            slice_from: None,
            slice_to: None,
        }
    }

    pub fn with_slice(mut self, from: i64, to: Option<i64>) -> Self {
        self.slice_from = Some(from);
        self.slice_to = to;
        self
    }

    /// Evaluates this predicate against `record`. Never panics, never
    /// returns an error: any failure mode (missing field, bad regex,
    /// non-numeric comparison) degrades to `false`, then gets sign-negated
    /// like every other outcome.
    pub fn evaluate(&self, record: &Record) -> bool {
        if self.match_code == 0 {
            return true;
        }
        let negate = self.match_code < 0;
        let result = match MatchOperator::from_abs_code(self.match_code.abs()) {
            Some(op) => self.evaluate_operator(op, record),
            None => false,
        };
        result ^ negate
    }

    fn evaluate_operator(&self, op: MatchOperator, record: &Record) -> bool {
        let Some(field) = record.get(&self.field_name) else {
            return false;
        };
        match op {
            MatchOperator::Equal => self.eval_equal(field),
            MatchOperator::TextContains => self.eval_text_contains(field),
            MatchOperator::RegexMatch => self.eval_regex(field),
            MatchOperator::GreaterThan => self.eval_greater_than(field),
            MatchOperator::LengthEqual => self.eval_length(field, |a, b| a == b),
            MatchOperator::LengthGreaterThan => self.eval_length(field, |a, b| a > b),
            MatchOperator::LengthOfTargetEqual => self.eval_length_of_target(field, |a, b| a == b),
            MatchOperator::LengthOfTargetGreaterThan => self.eval_length_of_target(field, |a, b| a > b),
        }
    }

    fn eval_equal(&self, field: &FieldValue) -> bool {
        if let (FieldValue::Bytes(_), _) | (_, FieldValue::Bytes(_)) = (field, &self.match_content) {
            return field.as_bytes_lossy() == self.match_content.as_bytes_lossy();
        }
        match (field, &self.match_content) {
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a == b,
            (FieldValue::Float(a), FieldValue::Float(b)) => a == b,
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a == b,
            _ => field.render_as_text(self.byte_decoding) == self.match_content.render_as_text(self.byte_decoding),
        }
    }

    /// substring-in-target, case-insensitive: does `field` contain
    /// `match_content`. This is the latest-source direction per the
    /// resolved Open Question — not the historically reversed "is target
    /// a substring of content" form.
    fn eval_text_contains(&self, field: &FieldValue) -> bool {
        let haystack = field.render_as_text(self.byte_decoding).to_lowercase();
        let needle = self.match_content.render_as_text(self.byte_decoding).to_lowercase();
        haystack.contains(&needle)
    }

    /// Anchored-prefix match: Python `re.match` semantics, not `re.search`.
    fn eval_regex(&self, field: &FieldValue) -> bool {
        let pattern = self.match_content.render_as_text(self.byte_decoding);
        let anchored = if pattern.starts_with('^') {
            pattern
        } else {
            format!("^(?:{pattern})")
        };
        match Regex::new(&anchored) {
            Ok(re) => re.is_match(&field.render_as_text(self.byte_decoding)),
            Err(_) => false,
        }
    }

    /// `MatchContent > field`, not the other way around — this compares
    /// the rule's configured bound against the record's value.
    fn eval_greater_than(&self, field: &FieldValue) -> bool {
        match (self.match_content.as_f64(), field.as_f64()) {
            (Some(a), Some(b)) => a > b,
            _ => match (self.match_content.parse_i64(), field.parse_i64()) {
                (Some(a), Some(b)) => a > b,
                _ => false,
            },
        }
    }

    fn eval_length(&self, field: &FieldValue, cmp: fn(usize, i64) -> bool) -> bool {
        let Some(len) = field.len_for_match() else {
            return false;
        };
        let Some(target) = self.match_content.parse_i64() else {
            return false;
        };
        cmp(len, target)
    }

    fn eval_length_of_target(&self, field: &FieldValue, cmp: fn(usize, usize) -> bool) -> bool {
        let Some(field_len) = field.len_for_match() else {
            return false;
        };
        let Some(target_len) = self.match_content.len_for_match() else {
            return false;
        };
        cmp(field_len, target_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pairs: &[(&str, FieldValue)]) -> Record {
        pairs.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn equal_matches_and_negates() {
        let r = rec(&[("user", FieldValue::Text("alice".into()))]);
        let spec = FieldMatchSpec::new("user", "alice", 1);
        assert!(spec.evaluate(&r));
        let spec_neg = FieldMatchSpec::new("user", "alice", -1);
        assert!(!spec_neg.evaluate(&r));
    }

    #[test]
    fn missing_field_is_false() {
        let r = rec(&[]);
        let spec = FieldMatchSpec::new("user", "alice", 1);
        assert!(!spec.evaluate(&r));
    }

    #[test]
    fn missing_field_negated_is_still_false() {
        // matching Python semantics: a KeyError is caught before the XOR,
        // so negation of "couldn't evaluate" stays false, not true.
        let r = rec(&[]);
        let spec = FieldMatchSpec::new("user", "alice", -1);
        assert!(!spec.evaluate(&r));
    }

    #[test]
    fn text_contains_direction() {
        let r = rec(&[("path", FieldValue::Text("/api/v1/login".into()))]);
        let spec = FieldMatchSpec::new("path", "login", 2);
        assert!(spec.evaluate(&r));
        let spec_rev = FieldMatchSpec::new("path", "/api/v1/login/extra", 2);
        assert!(!spec_rev.evaluate(&r));
    }

    #[test]
    fn regex_is_anchored() {
        let r = rec(&[("path", FieldValue::Text("abc123".into()))]);
        let spec = FieldMatchSpec::new("path", "abc", 3);
        assert!(spec.evaluate(&r));
        let spec_mid = FieldMatchSpec::new("path", "123", 3);
        assert!(!spec_mid.evaluate(&r));
    }

    #[test]
    fn greater_than_numeric() {
        // MatchContent > field: a ceiling of 10 is not cleared by a
        // count of 5, but is cleared by a count of 15.
        let under = rec(&[("count", FieldValue::Integer(5))]);
        let spec = FieldMatchSpec::new("count", 10i64, 4);
        assert!(spec.evaluate(&under));

        let over = rec(&[("count", FieldValue::Integer(15))]);
        assert!(!spec.evaluate(&over));
    }

    #[test]
    fn length_equal() {
        let r = rec(&[("token", FieldValue::Text("abcd".into()))]);
        let spec = FieldMatchSpec::new("token", 4i64, 5);
        assert!(spec.evaluate(&r));
    }

    #[test]
    fn preserve_code_always_true() {
        let r = rec(&[]);
        let spec = FieldMatchSpec::new("anything", "x", 0);
        assert!(spec.evaluate(&r));
    }
}
