// Threshold/lifetime counters layered on top of flag installation.
// Grounded on `plugins/AnalyzerPluginThresholdLifetime.py`'s `CacheItem`,
// `_ConsumeThreshold`/`_ConsumeLifetime`/`Check` trio.

use crate::flag_store::Payload;
use crate::plugin::{EngineHandle, Plugin};
use crate::record::Record;
use crate::rule::Rule;
use std::collections::HashMap;
use std::sync::Mutex;

struct CacheItem {
    threshold: i64,
    lifetime: i64,
    valid: bool,
}

impl CacheItem {
    /// Consumes one evaluation. Returns `true` once the flag is effective
    /// (threshold exhausted) and still within its lifetime budget.
    /// `lifetime <= 0` means permanent: never retires.
    fn check(&mut self) -> bool {
        if !self.valid {
            return false;
        }
        if self.threshold > 0 {
            self.threshold -= 1;
            return false;
        }
        if self.lifetime > 0 {
            self.lifetime -= 1;
            if self.lifetime <= 0 {
                self.valid = false;
            }
        }
        true
    }
}

/// Gates a rule's `CurrentFlag` behind repeat-hit counters before it's
/// allowed to register as a real hit. Maintains its own cache, separate
/// from `FlagStore`, keyed by the rendered `CurrentFlag`.
#[derive(Default)]
pub struct ThresholdLifetime {
    cache: Mutex<HashMap<String, CacheItem>>,
}

impl ThresholdLifetime {
    pub fn new() -> Self {
        ThresholdLifetime {
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl Plugin for ThresholdLifetime {
    fn name(&self) -> &str {
        "ThresholdLifetime"
    }

    fn instructions(&self) -> &str {
        "Gates CurrentFlag installation behind a repeat-hit threshold, then \
         retires the flag after a bounded number of further hits (lifetime)."
    }

    fn extra_rule_fields(&self) -> &[&str] {
        &["Threshold", "Lifetime"]
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
            match engine.flag_get(&prev) {
                Some(payload) => Some(payload),
                None => return (false, None),
            }
        };

        let threshold = rule.extra_i64("Threshold").unwrap_or(0);
        let lifetime = rule.extra_i64("Lifetime").unwrap_or(0);
        let current = engine.render_flag(record, &rule.current_flag);
        if current.is_empty() {
            return (true, base_payload);
        }

        let mut cache = self.cache.lock().unwrap();
        let fires = {
            let item = cache.entry(current.clone()).or_insert_with(|| CacheItem {
                threshold,
                lifetime,
                valid: true,
            });
            item.check()
        };
        if fires {
            if let Some(item) = cache.get(&current) {
                if !item.valid {
                    cache.remove(&current);
                    drop(cache);
                    engine.remove_flag(&current);
                    return (true, base_payload);
                }
            }
            (true, base_payload)
        } else {
            (false, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_one_fires_on_second_hit_then_retires() {
        let mut item = CacheItem {
            threshold: 1,
            lifetime: 1,
            valid: true,
        };
        assert!(!item.check()); // first match: pending
        assert!(item.check()); // second match: effective, fires
        assert!(!item.check()); // retired, never fires again
    }

    #[test]
    fn zero_threshold_is_effective_immediately() {
        let mut item = CacheItem {
            threshold: 0,
            lifetime: 0,
            valid: true,
        };
        assert!(item.check());
        assert!(item.check()); // lifetime 0 == permanent
        assert!(item.check());
    }
}
