// Delay/expire-governed flags. Grounded on
// `plugins/AnalyzerPluginTimedFlag.py`'s `threading.Timer`-based
// `__delayFunc`/`__expireFunc` pair and its `_liveFlags` set.
//
// Timers run on detached `std::thread::spawn` + `sleep` single-shot
// timers, matching the concurrency model's "platform single-shot timer
// primitive with explicit cancel tokens" design note. Each timer closure
// captures the generation counter current at arm time; when it wakes, it
// re-checks that counter before acting, so a superseding re-arm or a
// `Clear()` makes a stale callback a safe no-op rather than requiring
// actual thread cancellation.

use crate::flag_store::Payload;
use crate::plugin::{EngineHandle, Plugin};
use crate::record::Record;
use crate::rule::Rule;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Default)]
struct State {
    live: HashSet<String>,
    generation: HashMap<String, u64>,
}

pub struct TimedFlag {
    state: Arc<Mutex<State>>,
    engine: Mutex<Option<Arc<dyn EngineHandle>>>,
}

impl Default for TimedFlag {
    fn default() -> Self {
        TimedFlag {
            state: Arc::new(Mutex::new(State::default())),
            engine: Mutex::new(None),
        }
    }
}

impl TimedFlag {
    pub fn new() -> Self {
        TimedFlag::default()
    }

    fn bump_generation(&self, flag: &str) -> u64 {
        let mut state = self.state.lock().unwrap();
        let gen = state.generation.entry(flag.to_string()).or_insert(0);
        *gen += 1;
        *gen
    }

    /// Arms the expire timer directly: flag is already live, remove it
    /// from the live set and `FlagStore` after `expire_secs`.
    fn arm_expire(&self, flag: String, expire_secs: f64) {
        let generation = self.bump_generation(&flag);
        let Some(engine) = self.engine.lock().unwrap().clone() else {
            return;
        };
        let state = self.state.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs_f64(expire_secs.max(0.0)));
            let mut guard = state.lock().unwrap();
            if guard.generation.get(&flag).copied() != Some(generation) {
                return; // superseded or cleared
            }
            guard.live.remove(&flag);
            drop(guard);
            engine.remove_flag(&flag);
        });
    }

    /// Arms the delay timer: flag becomes live after `delay_secs`, at
    /// which point it arms its own follow-on expire timer if `expire_secs`
    /// is configured.
    fn arm_delay(&self, flag: String, delay_secs: f64, expire_secs: f64) {
        let generation = self.bump_generation(&flag);
        let Some(engine) = self.engine.lock().unwrap().clone() else {
            return;
        };
        let state = self.state.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs_f64(delay_secs.max(0.0)));
            let mut guard = state.lock().unwrap();
            if guard.generation.get(&flag).copied() != Some(generation) {
                return; // superseded or cleared before becoming live
            }
            guard.live.insert(flag.clone());
            if expire_secs > 0.0 {
                let expire_generation = guard.generation.get(&flag).copied().unwrap_or(generation);
                drop(guard);
                let state2 = state.clone();
                let flag2 = flag;
                let engine2 = engine;
                thread::spawn(move || {
                    thread::sleep(Duration::from_secs_f64(expire_secs.max(0.0)));
                    let mut guard2 = state2.lock().unwrap();
                    if guard2.generation.get(&flag2).copied() != Some(expire_generation) {
                        return;
                    }
                    guard2.live.remove(&flag2);
                    drop(guard2);
                    engine2.remove_flag(&flag2);
                });
            }
        });
    }
}

impl Plugin for TimedFlag {
    fn name(&self) -> &str {
        "TimedFlag"
    }

    fn instructions(&self) -> &str {
        "Delays a CurrentFlag's liveness by `Delay` seconds after installation, \
         then forcibly expires it `Expire` seconds after becoming live."
    }

    fn extra_rule_fields(&self) -> &[&str] {
        &["Delay", "Expire"]
    }

    fn attach(&self, engine: Arc<dyn EngineHandle>) {
        *self.engine.lock().unwrap() = Some(engine);
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
        let base_payload = if rule.prev_flag.is_empty() {
            None
        } else {
            let prev = engine.render_flag(record, &rule.prev_flag);
            let is_live = self.state.lock().unwrap().live.contains(&prev);
            match engine.flag_get(&prev) {
                Some(payload) if is_live => Some(payload),
                _ => return (false, None),
            }
        };

        let current = engine.render_flag(record, &rule.current_flag);
        if !current.is_empty() {
            let delay = rule.extra_f64("Delay").unwrap_or(0.0);
            let expire = rule.extra_f64("Expire").unwrap_or(0.0);
            if delay > 0.0 {
                self.arm_delay(current, delay, expire);
            } else if expire > 0.0 {
                self.state.lock().unwrap().live.insert(current.clone());
                self.arm_expire(current, expire);
            } else {
                self.state.lock().unwrap().live.insert(current);
            }
        }
        (true, base_payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_bump_detects_supersession() {
        let plugin = TimedFlag::new();
        let g1 = plugin.bump_generation("f:x");
        let g2 = plugin.bump_generation("f:x");
        assert_ne!(g1, g2);
    }
}
