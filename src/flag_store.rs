// Flag bookkeeping: a single mutex-guarded map from rendered flag name to
// whatever payload was installed alongside it. Deliberately simpler than
// the teacher's `rule_table::RuleTable` — that structure's copy-on-write
// multi-index design exists to serve concurrent readers of a rule set
// that rarely changes; FlagStore mutates on nearly every record, so a
// plain mutex is the right fit (see SPEC_FULL.md §4).

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Opaque payload attached to an installed flag. Existential/boxed rather
/// than generic so `Engine` and `Plugin` stay non-generic.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Identity comparison for two optional payloads. `Payload` (`Arc<dyn
/// Any>`) has no `Eq` impl to compare by value, and plugins only ever
/// need to know "is this the same installed payload", so pointer
/// identity via `Arc::ptr_eq` is the right notion of equality here.
pub fn payload_eq(a: &Option<Payload>, b: &Option<Payload>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => Arc::ptr_eq(x, y),
        _ => false,
    }
}

#[derive(Default)]
pub struct FlagStore {
    flags: Mutex<HashMap<String, Payload>>,
}

impl FlagStore {
    pub fn new() -> Self {
        FlagStore {
            flags: Mutex::new(HashMap::new()),
        }
    }

    /// `true` if `flag` is currently installed. An empty flag name is
    /// never considered present.
    pub fn contains(&self, flag: &str) -> bool {
        if flag.is_empty() {
            return false;
        }
        self.flags.lock().unwrap().contains_key(flag)
    }

    pub fn get(&self, flag: &str) -> Option<Payload> {
        if flag.is_empty() {
            return None;
        }
        self.flags.lock().unwrap().get(flag).cloned()
    }

    /// Installs `payload` under `flag`, overwriting anything already there.
    /// No-op for an empty flag name.
    pub fn install(&self, flag: &str, payload: Payload) {
        if flag.is_empty() {
            return;
        }
        self.flags.lock().unwrap().insert(flag.to_string(), payload);
    }

    /// Removes `flag` if present. No-op (not an error) for an empty name
    /// or a flag that was never installed, matching the reference
    /// implementation's `dict.pop(flag, None)`.
    pub fn remove(&self, flag: &str) {
        if flag.is_empty() {
            return;
        }
        self.flags.lock().unwrap().remove(flag);
    }

    pub fn clear(&self) {
        self.flags.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.flags.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_and_contains() {
        let store = FlagStore::new();
        store.install("a", Arc::new(1i64));
        assert!(store.contains("a"));
        assert!(!store.contains("b"));
    }

    #[test]
    fn remove_is_idempotent() {
        let store = FlagStore::new();
        store.remove("never-there");
        store.install("a", Arc::new(1i64));
        store.remove("a");
        store.remove("a");
        assert!(!store.contains("a"));
    }

    #[test]
    fn empty_flag_name_never_present() {
        let store = FlagStore::new();
        store.install("", Arc::new(1i64));
        assert!(!store.contains(""));
    }
}
