// Multi-flag prior-state check. Grounded on
// `plugins/AnalyzerPluginMultiflag.py`'s `PrevFlags`/`RemoveFlags`/
// `MultiFlagOperator` handling and `MultiPrevFlagCheck`.

use crate::flag_store::Payload;
use crate::plugin::{EngineHandle, Plugin};
use crate::record::Record;
use crate::rule::Rule;
use std::collections::HashSet;

#[derive(Default)]
pub struct MultiFlag;

impl MultiFlag {
    pub fn new() -> Self {
        MultiFlag
    }

    /// `rule.prev_flag` plus every entry in the `PrevFlags` extra field,
    /// rendered. The rule's own `PrevFlag` participates in the same
    /// combination as the explicit list.
    fn all_prev_templates(rule: &Rule) -> Vec<String> {
        let mut templates = rule.extra_str_list("PrevFlags");
        if !rule.prev_flag.is_empty() {
            templates.push(rule.prev_flag.0.clone());
        }
        templates
    }

    fn all_remove_templates(rule: &Rule) -> Vec<String> {
        let mut templates = rule.extra_str_list("RemoveFlags");
        if !rule.remove_flag.is_empty() {
            templates.push(rule.remove_flag.0.clone());
        }
        templates
    }
}

impl Plugin for MultiFlag {
    fn name(&self) -> &str {
        "MultiFlag"
    }

    fn instructions(&self) -> &str {
        "Combines several prior flags (PrevFlags) under an AND/OR operator \
         instead of checking a single PrevFlag."
    }

    fn extra_rule_fields(&self) -> &[&str] {
        &["PrevFlags", "RemoveFlags", "MultiFlagOperator"]
    }

    fn analyse_single_data(
        &self,
        engine: &dyn EngineHandle,
        record: &mut Record,
        rule: &mut Rule,
    ) -> (bool, Option<Payload>) {
        if !engine.field_check(record, rule) {
            return (false, None);
        }

        let prev_templates = Self::all_prev_templates(rule);
        if prev_templates.is_empty() {
            return (true, None);
        }

        let rendered: Vec<String> = prev_templates
            .iter()
            .map(|t| engine.render_flag(record, &crate::flag_template::FlagTemplate::new(t.clone())))
            .collect();

        // If every rendered flag is literally the same string, this is
        // just a single prior-flag check in disguise; fall through to the
        // plain lookup rather than running the multi-flag combinator.
        if rendered.windows(2).all(|w| w[0] == w[1]) {
            let prev = &rendered[0];
            return match engine.flag_get(prev) {
                Some(payload) => (true, Some(payload)),
                None => (false, None),
            };
        }

        let lookups: Vec<Option<Payload>> = rendered.iter().map(|f| engine.flag_get(f)).collect();
        let hits: Vec<bool> = lookups.iter().map(Option::is_some).collect();

        let operator = rule.extra_i64("MultiFlagOperator").unwrap_or(1);
        let negate = operator < 0;
        let combined = match operator.abs() {
            2 => hits.iter().any(|&b| b),
            _ => hits.iter().all(|&b| b),
        } ^ negate;

        if !combined {
            return (false, None);
        }

        for remove in Self::all_remove_templates(rule) {
            let rendered_remove = engine.render_flag(record, &crate::flag_template::FlagTemplate::new(remove));
            engine.remove_flag(&rendered_remove);
        }

        let mut distinct: Vec<Payload> = Vec::new();
        for payload in lookups.into_iter().flatten() {
            if !distinct.iter().any(|p| std::sync::Arc::ptr_eq(p, &payload)) {
                distinct.push(payload);
            }
        }
        match distinct.len() {
            1 => (true, Some(distinct.remove(0))),
            _ => (true, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_templates_include_own_remove_flag() {
        let rule = Rule::new()
            .with_remove_flag("r:{k}")
            .with_extra("RemoveFlags", serde_json::json!(["r2:{k}"]));
        let templates = MultiFlag::all_remove_templates(&rule);
        assert!(templates.contains(&"r:{k}".to_string()));
        assert!(templates.contains(&"r2:{k}".to_string()));
    }
}
