// Rule definition: the field predicate list, the prior/current/removed
// flag templates, and the plugin routing name. Grounded on
// `rule_bundle`'s rule shape and `rule_metadata::RuleMetadata`'s builder
// idiom, trimmed to what the engine actually consumes — bundle rollout
// policy, enforcement class, and the rest of `rule_metadata`'s
// deployment-facing fields aren't part of this engine's contract.
//
// Plugin-specific fields (`Threshold`, `Lifetime`, `Delay`, `Expire`,
// `SliceFrom`/`SliceTo`, `PrevFlags`, `RemoveFlags`, `MultiFlagOperator`,
// `MultiPluginMode`) are carried in `extra` rather than as named struct
// fields, since the core engine doesn't know about them — only the
// plugin that declared them does. `ExtraRuleFields`-style typed accessors
// live here for plugins to share rather than re-implementing JSON
// extraction five times.

use crate::field_predicate::FieldMatchSpec;
use crate::flag_template::FlagTemplate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Human-readable identifier, used only in logs and audit records.
    #[serde(default)]
    pub name: String,

    /// Signed aggregation operator: `|op| == 1` is AND, `|op| == 2` is OR,
    /// negative inverts the aggregate. `0` is reserved (treated as AND).
    #[serde(default = "default_operator")]
    pub operator: i64,

    #[serde(default)]
    pub field_check_list: Vec<FieldMatchSpec>,

    #[serde(default)]
    pub prev_flag: FlagTemplate,
    #[serde(default)]
    pub current_flag: FlagTemplate,
    #[serde(default)]
    pub remove_flag: FlagTemplate,

    /// Semicolon-separated plugin names, evaluated in order. Empty means
    /// "use the default evaluator".
    #[serde(default)]
    pub plugin_names: String,

    /// Everything else: plugin-owned configuration keyed by field name.
    #[serde(flatten)]
    pub extra: HashMap<String, JsonValue>,
}

fn default_operator() -> i64 {
    1
}

impl Rule {
    pub fn new() -> Self {
        Rule {
            name: String::new(),
            operator: 1,
            field_check_list: Vec::new(),
            prev_flag: FlagTemplate::default(),
            current_flag: FlagTemplate::default(),
            remove_flag: FlagTemplate::default(),
            plugin_names: String::new(),
            extra: HashMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
    pub fn with_operator(mut self, operator: i64) -> Self {
        self.operator = operator;
        self
    }
    pub fn with_field(mut self, spec: FieldMatchSpec) -> Self {
        self.field_check_list.push(spec);
        self
    }
    pub fn with_prev_flag(mut self, template: impl Into<FlagTemplate>) -> Self {
        self.prev_flag = template.into();
        self
    }
    pub fn with_current_flag(mut self, template: impl Into<FlagTemplate>) -> Self {
        self.current_flag = template.into();
        self
    }
    pub fn with_remove_flag(mut self, template: impl Into<FlagTemplate>) -> Self {
        self.remove_flag = template.into();
        self
    }
    pub fn with_plugin_names(mut self, names: impl Into<String>) -> Self {
        self.plugin_names = names.into();
        self
    }
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Splits `plugin_names` on `;`, trims whitespace, discards empties —
    /// the routing contract shared by `PluginChain` and `MultiPlugin`.
    pub fn plugin_name_list(&self) -> Vec<String> {
        self.plugin_names
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn extra_i64(&self, key: &str) -> Option<i64> {
        self.extra.get(key).and_then(|v| v.as_i64())
    }
    pub fn extra_f64(&self, key: &str) -> Option<f64> {
        self.extra.get(key).and_then(|v| v.as_f64())
    }
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }
    pub fn extra_str_list(&self, key: &str) -> Vec<String> {
        match self.extra.get(key) {
            Some(JsonValue::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(JsonValue::String(s)) => s
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Default for Rule {
    fn default() -> Self {
        Rule::new()
    }
}
