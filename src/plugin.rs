// Plugin mechanism: the trait every extension implements, the callback
// surface plugins get into the engine, and the serial-AND composition
// that strings several named plugins together. Grounded on the original
// `SingleRuleTest`/`PluginExec` dispatch and the teacher's
// registry-by-name idiom in `hot_reload`.

use crate::error::EngineError;
use crate::flag_store::Payload;
use crate::record::{ByteDecoding, Record};
use crate::rule::Rule;
use std::collections::HashMap;
use std::sync::Arc;

/// Callback surface a plugin gets into its owning engine, so it can
/// render flags, run the default field check, remove flags, or delegate
/// to another named plugin — without holding a reference to `Engine`
/// itself (which would need to also hold the plugin, a cycle).
pub trait EngineHandle: Send + Sync {
    fn render_flag(&self, record: &Record, template: &crate::flag_template::FlagTemplate) -> String;
    fn field_check(&self, record: &Record, rule: &Rule) -> bool;
    fn remove_flag(&self, flag: &str);
    fn flag_get(&self, flag: &str) -> Option<Payload>;
    fn flag_install(&self, flag: &str, payload: Payload);
    fn byte_decoding(&self) -> ByteDecoding;
    /// Runs another registered plugin by name against the same engine.
    /// Returns `(false, None)` if no plugin is registered under that name.
    fn plugin_exec(&self, name: &str, record: &mut Record, rule: &mut Rule) -> (bool, Option<Payload>);
}

/// One pluggable extension to single-rule evaluation.
pub trait Plugin: Send + Sync {
    /// Runs this plugin's version of single-rule evaluation. May mutate
    /// `record`/`rule` — later plugins in a chain observe the mutation
    /// (used deliberately by the slicer plugin).
    fn analyse_single_data(
        &self,
        engine: &dyn EngineHandle,
        record: &mut Record,
        rule: &mut Rule,
    ) -> (bool, Option<Payload>);

    /// Human-readable documentation for rule authors.
    fn instructions(&self) -> &str {
        ""
    }

    /// Extra rule fields this plugin reads, for schema introspection.
    fn extra_rule_fields(&self) -> &[&str] {
        &[]
    }

    /// Called once at registration with an owned, shareable handle back
    /// into the engine. Plugins that spawn background work (timers) need
    /// this because their `analyse_single_data` borrow doesn't outlive
    /// the call. Stateless plugins ignore it.
    fn attach(&self, _engine: Arc<dyn EngineHandle>) {}

    fn name(&self) -> &str;
}

/// Registry of plugins keyed by name, plus the serial-AND composition
/// rule described for multi-plugin rule routing.
#[derive(Default)]
pub struct PluginChain {
    registry: HashMap<String, Arc<dyn Plugin>>,
}

impl PluginChain {
    pub fn new() -> Self {
        PluginChain {
            registry: HashMap::new(),
        }
    }

    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), EngineError> {
        let name = plugin.name().to_string();
        if self.registry.contains_key(&name) {
            return Err(EngineError::DuplicatePlugin(name));
        }
        self.registry.insert(name, plugin);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.registry.get(name).cloned()
    }

    /// Hands every registered plugin a shareable handle back into the
    /// engine, once the engine itself is fully constructed.
    pub fn attach_all(&self, engine: Arc<dyn EngineHandle>) {
        for plugin in self.registry.values() {
            plugin.attach(engine.clone());
        }
    }

    /// Runs `rule.plugin_name_list()` against `record` in order, folding
    /// results with the serial-AND rule: stop at the first `hit == false`;
    /// if every plugin that ran reported the same `(hit, payload)`, return
    /// it; any disagreement collapses to `(false, None)`. Empty plugin
    /// list delegates to the default evaluator.
    pub fn evaluate(
        &self,
        engine: &dyn EngineHandle,
        record: &mut Record,
        rule: &mut Rule,
    ) -> (bool, Option<Payload>) {
        let names = rule.plugin_name_list();
        if names.is_empty() {
            if !engine.field_check(record, rule) {
                return (false, None);
            }
            if rule.prev_flag.is_empty() {
                return (true, None);
            }
            let prev = engine.render_flag(record, &rule.prev_flag);
            return match engine.flag_get(&prev) {
                Some(payload) => (true, Some(payload)),
                None => (false, None),
            };
        }

        let mut agreed: Option<PayloadKey> = None;
        let mut last_payload: Option<Payload> = None;
        for name in &names {
            let Some(plugin) = self.get(name) else {
                return (false, None);
            };
            let (hit, payload) = run_guarded(plugin.as_ref(), engine, record, rule);
            if !hit {
                return (false, None);
            }
            let key = PayloadKey::from(&payload);
            match agreed {
                None => agreed = Some(key),
                Some(prev_key) if prev_key == key => {}
                Some(_) => return (false, None),
            }
            last_payload = payload;
        }
        (true, last_payload)
    }
}

/// Identity key used to compare payloads across plugins in a chain
/// without requiring `Payload` (`Arc<dyn Any>`) to implement `Eq`.
#[derive(Clone, Copy, PartialEq, Eq)]
enum PayloadKey {
    None,
    Some(*const ()),
}

impl From<&Option<Payload>> for PayloadKey {
    fn from(p: &Option<Payload>) -> Self {
        match p {
            None => PayloadKey::None,
            Some(arc) => PayloadKey::Some(Arc::as_ptr(arc) as *const ()),
        }
    }
}

/// Runs a plugin, catching a panic and treating it as "no match" — per
/// the error-handling design's "plugin raises: skip that plugin, engine
/// logs and continues".
pub(crate) fn run_guarded(
    plugin: &dyn Plugin,
    engine: &dyn EngineHandle,
    record: &mut Record,
    rule: &mut Rule,
) -> (bool, Option<Payload>) {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        plugin.analyse_single_data(engine, record, rule)
    }));
    match outcome {
        Ok(result) => result,
        Err(_) => {
            log::warn!(target: "seqflow::plugin", "plugin {} panicked; treating as no match", plugin.name());
            (false, None)
        }
    }
}
