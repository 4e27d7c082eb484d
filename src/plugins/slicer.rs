// Field-spec rewriting plugin. Grounded on
// `plugins/AnalyzerPluginSlicer.py`: for each `FieldCheckList` entry that
// carries `SliceFrom`/`SliceTo`, compute the slice of the named field,
// perform the comparison itself (Equal/TextContains only), stash the
// boolean result under a synthesized record key, then rewrite the spec
// in place to a trivial Equal-against-true check on that key. After
// rewriting, evaluation falls through to the default evaluator.

use crate::field_predicate::FieldMatchSpec;
use crate::flag_store::Payload;
use crate::plugin::{EngineHandle, Plugin};
use crate::record::{FieldValue, Record};
use crate::rule::Rule;

#[derive(Default)]
pub struct Slicer;

impl Slicer {
    pub fn new() -> Self {
        Slicer
    }

    fn slice(field: &FieldValue, from: i64, to: Option<i64>) -> Option<FieldValue> {
        match field {
            FieldValue::Text(s) => {
                let chars: Vec<char> = s.chars().collect();
                let (start, end) = Self::resolve_range(chars.len(), from, to);
                Some(FieldValue::Text(chars[start..end].iter().collect()))
            }
            FieldValue::Bytes(b) => {
                let (start, end) = Self::resolve_range(b.len(), from, to);
                Some(FieldValue::Bytes(b[start..end].to_vec()))
            }
            _ => None,
        }
    }

    fn resolve_range(len: usize, from: i64, to: Option<i64>) -> (usize, usize) {
        let norm = |idx: i64| -> usize {
            if idx < 0 {
                len.saturating_sub(idx.unsigned_abs() as usize)
            } else {
                (idx as usize).min(len)
            }
        };
        let start = norm(from);
        let end = to.map(norm).unwrap_or(len).max(start);
        (start, end)
    }
}

impl Plugin for Slicer {
    fn name(&self) -> &str {
        "Slicer"
    }

    fn instructions(&self) -> &str {
        "Compares a substring/subslice of a field instead of the whole value, \
         via SliceFrom/SliceTo on a FieldCheckList entry."
    }

    fn extra_rule_fields(&self) -> &[&str] {
        &["SliceFrom", "SliceTo"]
    }

    fn analyse_single_data(
        &self,
        engine: &dyn EngineHandle,
        record: &mut Record,
        rule: &mut Rule,
    ) -> (bool, Option<Payload>) {
        for (i, spec) in rule.field_check_list.iter_mut().enumerate() {
            let Some(from) = spec.slice_from else { continue };
            let Some(field) = record.get(&spec.field_name).cloned() else {
                continue;
            };
            let Some(sliced) = Self::slice(&field, from, spec.slice_to) else {
                continue;
            };
            let matched = match spec.match_code.abs() {
                1 => match (&sliced, &spec.match_content) {
                    (FieldValue::Bytes(_), _) | (_, FieldValue::Bytes(_)) => {
                        sliced.as_bytes_lossy() == spec.match_content.as_bytes_lossy()
                    }
                    _ => sliced.render_as_text(spec.byte_decoding) == spec.match_content.render_as_text(spec.byte_decoding),
                },
                2 => sliced
                    .render_as_text(spec.byte_decoding)
                    .to_lowercase()
                    .contains(&spec.match_content.render_as_text(spec.byte_decoding).to_lowercase()),
                _ => false,
            };
            let negate = spec.match_code < 0;
            let result = matched ^ negate;

            let synth_key = format!("Slicer_Result_{i}");
            record.insert(synth_key.clone(), result);
            *spec = FieldMatchSpec::new(synth_key, true, 1);
        }

        if !engine.field_check(record, rule) {
            return (false, None);
        }
        if rule.prev_flag.is_empty() {
            return (true, None);
        }
        let prev = engine.render_flag(record, &rule.prev_flag);
        match engine.flag_get(&prev) {
            Some(payload) => (true, Some(payload)),
            None => (false, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_text_range() {
        let field = FieldValue::Text("abcdef".into());
        let sliced = Slicer::slice(&field, 1, Some(4)).unwrap();
        assert_eq!(sliced, FieldValue::Text("bcd".into()));
    }

    #[test]
    fn slice_negative_from() {
        let field = FieldValue::Text("abcdef".into());
        let sliced = Slicer::slice(&field, -2, None).unwrap();
        assert_eq!(sliced, FieldValue::Text("ef".into()));
    }
}
