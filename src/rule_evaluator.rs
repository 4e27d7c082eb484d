// Default single-rule test: field predicate aggregation plus the
// prior-flag lookup. Grounded on the original `_DefaultSingleRuleTest`.

use crate::flag_store::{FlagStore, Payload};
use crate::record::{ByteDecoding, Record};
use crate::rule::Rule;

/// Aggregates `rule.field_check_list` against `record`.
///
/// An empty `field_check_list` trivially passes (per the data model: "may
/// be empty/absent ⇒ field check trivially passes"). A non-empty list
/// where every entry names a field absent from the record computes zero
/// sub-results and is forced to `false` regardless of operator — a rule
/// cannot fire on a record none of its field specs apply to.
pub fn field_check(record: &Record, rule: &Rule) -> bool {
    if rule.field_check_list.is_empty() {
        return true;
    }
    let applicable: Vec<bool> = rule
        .field_check_list
        .iter()
        .filter(|spec| record.contains_key(&spec.field_name))
        .map(|spec| spec.evaluate(record))
        .collect();
    if applicable.is_empty() {
        return false;
    }
    let negate = rule.operator < 0;
    let aggregate = match rule.operator.abs() {
        2 => applicable.iter().any(|&b| b),
        _ => applicable.iter().all(|&b| b),
    };
    aggregate ^ negate
}

/// The default evaluator: field check, then prior-flag lookup.
pub struct RuleEvaluator;

impl RuleEvaluator {
    /// Evaluates `rule` against `record`. Returns `(hit, prior_payload)`.
    pub fn evaluate(
        record: &Record,
        rule: &Rule,
        flag_store: &FlagStore,
        decoding: ByteDecoding,
    ) -> (bool, Option<Payload>) {
        if !field_check(record, rule) {
            return (false, None);
        }
        if rule.prev_flag.is_empty() {
            return (true, None);
        }
        let prev = rule.prev_flag.render(record, decoding);
        match flag_store.get(&prev) {
            Some(payload) => (true, Some(payload)),
            None => (false, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_predicate::FieldMatchSpec;
    use crate::record::FieldValue;
    use std::sync::Arc;

    fn rec(pairs: &[(&str, FieldValue)]) -> Record {
        pairs.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn entry_rule_fires_on_field_match() {
        let r = rec(&[("a", FieldValue::Integer(1))]);
        let rule = Rule::new().with_operator(1).with_field(FieldMatchSpec::new("a", 1i64, 1));
        let store = FlagStore::new();
        let (hit, payload) = RuleEvaluator::evaluate(&r, &rule, &store, ByteDecoding::Utf8);
        assert!(hit);
        assert!(payload.is_none());
    }

    #[test]
    fn chained_rule_requires_prev_flag() {
        let r = rec(&[("b", FieldValue::Integer(2)), ("k", FieldValue::Text("x".into()))]);
        let rule = Rule::new()
            .with_field(FieldMatchSpec::new("b", 2i64, 1))
            .with_prev_flag("f:{k}");
        let store = FlagStore::new();
        let (hit, _) = RuleEvaluator::evaluate(&r, &rule, &store, ByteDecoding::Utf8);
        assert!(!hit);

        store.install("f:x", Arc::new(42i64));
        let (hit2, payload2) = RuleEvaluator::evaluate(&r, &rule, &store, ByteDecoding::Utf8);
        assert!(hit2);
        assert_eq!(*payload2.unwrap().downcast::<i64>().unwrap(), 42);
    }

    #[test]
    fn empty_applicable_set_is_false_even_for_or() {
        let r = rec(&[]);
        let rule = Rule::new()
            .with_operator(-2)
            .with_field(FieldMatchSpec::new("a", 1i64, 1))
            .with_field(FieldMatchSpec::new("a", 2i64, 1));
        assert!(!field_check(&r, &rule));
    }

    #[test]
    fn or_with_negation_matches_s3_scenario() {
        let rule = Rule::new()
            .with_operator(-2)
            .with_field(FieldMatchSpec::new("a", 1i64, 1))
            .with_field(FieldMatchSpec::new("a", 2i64, 1));
        assert!(field_check(&rec(&[("a", FieldValue::Integer(3))]), &rule));
        assert!(!field_check(&rec(&[("a", FieldValue::Integer(1))]), &rule));
        assert!(!field_check(&rec(&[("a", FieldValue::Integer(2))]), &rule));
        assert!(!field_check(&rec(&[]), &rule));
    }
}
