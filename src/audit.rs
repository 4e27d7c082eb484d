// Ambient audit trail: a bounded in-memory log of engine decisions, kept
// for observability rather than as a core data-model component. Grounded
// on the teacher's `audit_record::{AuditLogLevel, DecisionOutcome}`
// classification, trimmed of the payload/sidecar/WASM-specific variants
// that don't apply to this engine's decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Severity classification for an audit entry, ordered like the
/// teacher's `AuditLogLevel` (lower is more severe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum AuditLogLevel {
    High = 1,
    Medium = 2,
    Low = 3,
    Trace = 4,
}

impl AuditLogLevel {
    pub fn should_log(&self, threshold: AuditLogLevel) -> bool {
        *self <= threshold
    }
}

/// What happened as a result of evaluating one rule against one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionOutcome {
    /// Rule fired and a new flag was installed.
    Installed { flag: String },
    /// Rule fired but the current flag was already present (conflict).
    Conflict { flag: String },
    /// Rule's action suppressed emission by returning no payload.
    Suppressed,
    /// Rule did not match this record.
    NoMatch,
    /// A named plugin in the chain was not found in the registry.
    UnknownPlugin { name: String },
}

impl DecisionOutcome {
    pub fn level(&self) -> AuditLogLevel {
        match self {
            DecisionOutcome::Installed { .. } => AuditLogLevel::Medium,
            DecisionOutcome::Conflict { .. } => AuditLogLevel::Low,
            DecisionOutcome::Suppressed => AuditLogLevel::Trace,
            DecisionOutcome::NoMatch => AuditLogLevel::Trace,
            DecisionOutcome::UnknownPlugin { .. } => AuditLogLevel::High,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub sequence: u64,
    pub rule_name: String,
    pub outcome: DecisionOutcome,
    pub timestamp: DateTime<Utc>,
}

/// Bounded ring buffer of recent audit records. Not part of the core
/// data model — this is ambient observability, standalone and
/// caller-owned: construct one alongside an `Engine` and call `record`
/// from the `Action` closure passed to `Engine::analyse` for each
/// decision worth keeping.
pub struct AuditTrail {
    capacity: usize,
    records: Mutex<VecDeque<AuditRecord>>,
    next_sequence: Mutex<u64>,
}

impl AuditTrail {
    pub fn new(capacity: usize) -> Self {
        AuditTrail {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            next_sequence: Mutex::new(0),
        }
    }

    pub fn record(&self, rule_name: impl Into<String>, outcome: DecisionOutcome, now: DateTime<Utc>) {
        let mut seq = self.next_sequence.lock().unwrap();
        let sequence = *seq;
        *seq += 1;
        drop(seq);

        let level = outcome.level();
        let rule_name = rule_name.into();
        log::log!(
            target: "seqflow::audit",
            match level {
                AuditLogLevel::High => log::Level::Warn,
                AuditLogLevel::Medium => log::Level::Info,
                AuditLogLevel::Low => log::Level::Debug,
                AuditLogLevel::Trace => log::Level::Trace,
            },
            "rule={rule_name} outcome={outcome:?}"
        );

        let mut records = self.records.lock().unwrap();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(AuditRecord {
            sequence,
            rule_name,
            outcome,
            timestamp: now,
        });
    }

    pub fn recent(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_evicts_oldest() {
        let trail = AuditTrail::new(2);
        let now = Utc::now();
        trail.record("r1", DecisionOutcome::NoMatch, now);
        trail.record("r2", DecisionOutcome::NoMatch, now);
        trail.record("r3", DecisionOutcome::NoMatch, now);
        let recent = trail.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].rule_name, "r2");
        assert_eq!(recent[1].rule_name, "r3");
    }

    #[test]
    fn log_level_threshold() {
        assert!(AuditLogLevel::High.should_log(AuditLogLevel::Low));
        assert!(!AuditLogLevel::Trace.should_log(AuditLogLevel::Medium));
    }
}
