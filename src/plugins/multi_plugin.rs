// Composes several named plugins under one rule. Grounded on
// `plugins/AnalyzerPluginMultiPlugins.py`'s parallel/serial dispatch and
// its "no nesting of MultiPlugin within itself" validation.
//
// The nested plugin list lives under its own extra key, `MultiPluginNames`,
// rather than overloading the top-level `PluginNames` routing field the
// way the original source does — the same key can't mean two different
// things in one Rust struct without ambiguity, and this keeps the feature
// without reproducing that quirk (see DESIGN.md).

use crate::flag_store::{payload_eq, Payload};
use crate::plugin::{EngineHandle, Plugin};
use crate::record::Record;
use crate::rule::Rule;

#[derive(Default)]
pub struct MultiPlugin;

impl MultiPlugin {
    pub fn new() -> Self {
        MultiPlugin
    }
}

impl Plugin for MultiPlugin {
    fn name(&self) -> &str {
        "MultiPlugin"
    }

    fn instructions(&self) -> &str {
        "Runs several named plugins (MultiPluginNames) in parallel or serial \
         (MultiPluginMode: 0=parallel, 1=serial) and collapses their results \
         with the same serial-AND rule PluginChain uses."
    }

    fn extra_rule_fields(&self) -> &[&str] {
        &["MultiPluginNames", "MultiPluginMode"]
    }

    fn analyse_single_data(
        &self,
        engine: &dyn EngineHandle,
        record: &mut Record,
        rule: &mut Rule,
    ) -> (bool, Option<Payload>) {
        let targets = rule.extra_str_list("MultiPluginNames");
        if targets.is_empty() {
            return (false, None);
        }
        if targets.iter().any(|n| n == self.name()) {
            // nesting MultiPlugin within itself is disallowed
            return (false, None);
        }

        let serial = rule.extra_i64("MultiPluginMode").unwrap_or(0) == 1;
        let mut agreed: Option<Option<Payload>> = None;

        if serial {
            for name in &targets {
                let (hit, payload) = engine.plugin_exec(name, record, rule);
                if !hit {
                    return (false, None);
                }
                match &agreed {
                    None => agreed = Some(payload),
                    Some(prev) if payload_eq(prev, &payload) => {}
                    Some(_) => return (false, None),
                }
            }
        } else {
            for name in &targets {
                let mut record_copy = record.clone();
                let mut rule_copy = rule.clone();
                let (hit, payload) = engine.plugin_exec(name, &mut record_copy, &mut rule_copy);
                if !hit {
                    return (false, None);
                }
                match &agreed {
                    None => agreed = Some(payload),
                    Some(prev) if payload_eq(prev, &payload) => {}
                    Some(_) => return (false, None),
                }
            }
        }

        (true, agreed.flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nesting_self_is_rejected_without_calling_engine() {
        let plugin = MultiPlugin::new();
        let mut record = Record::new();
        let mut rule = Rule::new().with_extra("MultiPluginNames", serde_json::json!(["MultiPlugin"]));
        struct Unreachable;
        impl EngineHandle for Unreachable {
            fn render_flag(&self, _: &Record, _: &crate::flag_template::FlagTemplate) -> String {
                unreachable!()
            }
            fn field_check(&self, _: &Record, _: &Rule) -> bool {
                unreachable!()
            }
            fn remove_flag(&self, _: &str) {
                unreachable!()
            }
            fn flag_get(&self, _: &str) -> Option<Payload> {
                unreachable!()
            }
            fn flag_install(&self, _: &str, _: Payload) {
                unreachable!()
            }
            fn byte_decoding(&self) -> crate::record::ByteDecoding {
                unreachable!()
            }
            fn plugin_exec(&self, _: &str, _: &mut Record, _: &mut Rule) -> (bool, Option<Payload>) {
                unreachable!()
            }
        }
        let (hit, payload) = plugin.analyse_single_data(&Unreachable, &mut record, &mut rule);
        assert!(!hit);
        assert!(payload.is_none());
    }
}
