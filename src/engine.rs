// Main analysis loop. Grounded on the original `_DefaultAnalyseMain`:
// iterate rules in declaration order, route each through the plugin
// chain, and only the branch where `CurrentFlag` renders non-empty *and*
// isn't already installed performs removal + install + emission. Any
// other outcome (falsy CurrentFlag, or a flag conflict) leaves FlagStore
// untouched — not even the RemoveFlag call runs.

use crate::error::EngineError;
use crate::flag_store::{FlagStore, Payload};
use crate::flag_template::FlagTemplate;
use crate::plugin::{EngineHandle, PluginChain};
use crate::plugins;
use crate::record::{ByteDecoding, Record};
use crate::rule::Rule;
use crate::rule_evaluator::field_check;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// User hit callback: `(record, rule, prior_payload, current_flag) -> new_payload`.
/// Returning `None` suppresses installation/emission for that rule only.
pub type Action = dyn Fn(&Record, &Rule, Option<Payload>, &str) -> Option<Payload> + Send + Sync;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub byte_decoding: ByteDecoding,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            byte_decoding: ByteDecoding::default(),
        }
    }
}

struct EngineCore {
    flags: FlagStore,
    plugins: PluginChain,
    config: EngineConfig,
}

impl EngineHandle for EngineCore {
    fn render_flag(&self, record: &Record, template: &FlagTemplate) -> String {
        template.render(record, self.config.byte_decoding)
    }

    fn field_check(&self, record: &Record, rule: &Rule) -> bool {
        field_check(record, rule)
    }

    fn remove_flag(&self, flag: &str) {
        log::trace!(target: "seqflow::flag", "removing flag {flag:?}");
        self.flags.remove(flag);
    }

    fn flag_get(&self, flag: &str) -> Option<Payload> {
        self.flags.get(flag)
    }

    fn flag_install(&self, flag: &str, payload: Payload) {
        log::trace!(target: "seqflow::flag", "installing flag {flag:?}");
        self.flags.install(flag, payload);
    }

    fn byte_decoding(&self) -> ByteDecoding {
        self.config.byte_decoding
    }

    fn plugin_exec(&self, name: &str, record: &mut Record, rule: &mut Rule) -> (bool, Option<Payload>) {
        match self.plugins.get(name) {
            Some(plugin) => crate::plugin::run_guarded(plugin.as_ref(), self, record, rule),
            None => (false, None),
        }
    }
}

/// The rule-evaluation engine: one rule set, one FlagStore, one plugin
/// registry. Single-threaded cooperative per instance — callers must
/// either serialize calls into one `Engine` or shard records across
/// engines with disjoint state.
pub struct Engine {
    core: Arc<EngineCore>,
    rules: Mutex<Vec<Rule>>,
}

impl Engine {
    /// Constructs an engine with the default plugin registry (all five
    /// representative plugins) and default configuration.
    pub fn new(rules: Vec<Rule>) -> Result<Self, EngineError> {
        Self::with_config(rules, EngineConfig::default())
    }

    pub fn with_config(rules: Vec<Rule>, config: EngineConfig) -> Result<Self, EngineError> {
        let mut chain = PluginChain::new();
        chain.register(Arc::new(plugins::threshold_lifetime::ThresholdLifetime::new()))?;
        chain.register(Arc::new(plugins::timed_flag::TimedFlag::new()))?;
        chain.register(Arc::new(plugins::slicer::Slicer::new()))?;
        chain.register(Arc::new(plugins::multi_flag::MultiFlag::new()))?;
        chain.register(Arc::new(plugins::multi_plugin::MultiPlugin::new()))?;
        Self::with_plugins(rules, config, chain)
    }

    /// Constructs an engine from an explicit, caller-assembled plugin
    /// registry — the in-process equivalent of loading a plugin
    /// directory at construction, since a registry populated here is
    /// this crate's stand-in for dynamic module discovery.
    pub fn with_plugins(rules: Vec<Rule>, config: EngineConfig, plugins: PluginChain) -> Result<Self, EngineError> {
        let core = Arc::new(EngineCore {
            flags: FlagStore::new(),
            plugins,
            config,
        });
        let handle: Arc<dyn EngineHandle> = core.clone();
        core.plugins.attach_all(handle);
        log::debug!(target: "seqflow::engine", "engine constructed with {} rules", rules.len());
        Ok(Engine {
            core,
            rules: Mutex::new(rules),
        })
    }

    /// Runs `record` through every rule (or `rules_override` if given),
    /// returning the set of new payloads produced by this invocation.
    pub fn analyse(&self, record: &mut Record, action: Option<&Action>, rules_override: Option<&[Rule]>) -> Vec<Payload> {
        let owned;
        let rules: &[Rule] = match rules_override {
            Some(r) => r,
            None => {
                owned = self.rules.lock().unwrap().clone();
                &owned
            }
        };

        let mut hits = Vec::new();
        for rule in rules {
            let mut rule_copy = rule.clone();
            let (hit, prior_payload) = self.core.plugins.evaluate(self.core.as_ref(), record, &mut rule_copy);
            if !hit {
                continue;
            }

            let current_flag = rule_copy.current_flag.render(record, self.core.config.byte_decoding);
            let remove_flag = rule_copy.remove_flag.render(record, self.core.config.byte_decoding);

            // Action runs unconditionally once a rule hits — the conflict
            // policy below only gates installation, not the callback.
            let new_payload = match action {
                Some(f) => f(record, &rule_copy, prior_payload.clone(), &current_flag),
                None => Some(default_payload()),
            };

            if current_flag.is_empty() || self.core.flags.contains(&current_flag) {
                // empty CurrentFlag, or a conflict with an already-installed
                // flag — the rule still counted as evaluated, but no
                // removal, no install, no emission.
                continue;
            }

            // RemoveFlag runs regardless of whether the action suppressed
            // emission — only the install + hit-set push are conditional
            // on a payload actually coming back.
            self.core.flags.remove(&remove_flag);

            let Some(new_payload) = new_payload else {
                log::trace!(target: "seqflow::engine", "rule {:?} hit but action suppressed emission", rule_copy.name);
                continue;
            };

            self.core.flags.install(&current_flag, new_payload.clone());
            hits.push(new_payload);
        }
        hits
    }

    /// Purges FlagStore. Plugin sidecar state (threshold/lifetime
    /// counters, live timed-flag sets) is scoped to each plugin instance
    /// and not reset here; construct a fresh `Engine` for a full reset.
    pub fn clear(&self) {
        self.core.flags.clear();
    }

    pub fn remove_flag(&self, flag: &str) {
        self.core.flags.remove(flag);
    }

    pub fn rules(&self) -> Vec<Rule> {
        self.rules.lock().unwrap().clone()
    }

    pub fn set_rules(&self, rules: Vec<Rule>) {
        *self.rules.lock().unwrap() = rules;
    }
}

fn default_payload() -> Payload {
    Arc::new(Uuid::new_v4().to_string())
}
