//! A temporal/sequential rule-matching engine for key-value event
//! streams. Records flow in one at a time; rules chain across records by
//! installing and consuming named flags in a shared `FlagStore`.

pub mod audit;
pub mod engine;
pub mod error;
pub mod field_predicate;
pub mod flag_store;
pub mod flag_template;
pub mod plugin;
pub mod plugins;
pub mod record;
pub mod rule;
pub mod rule_evaluator;

pub use audit::{AuditLogLevel, AuditRecord, AuditTrail, DecisionOutcome};
pub use engine::{Action, Engine, EngineConfig};
pub use error::EngineError;
pub use field_predicate::{FieldMatchSpec, MatchOperator};
pub use flag_store::{FlagStore, Payload};
pub use flag_template::FlagTemplate;
pub use plugin::{EngineHandle, Plugin, PluginChain};
pub use record::{ByteDecoding, FieldValue, Record};
pub use rule::Rule;
pub use rule_evaluator::RuleEvaluator;
