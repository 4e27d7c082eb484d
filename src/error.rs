// Error types for engine construction and plugin composition.
//
// Per-record, per-predicate evaluation never produces an `Err`: a bad regex,
// a failed numeric parse, or a missing template key all degrade to `false`/
// a literal placeholder, by design (see the module docs on `field_predicate`
// and `flag_template`). `EngineError` only covers the boundary-level failures
// that occur at construction time or when a rule is structurally invalid.

use thiserror::Error;

/// Errors surfaced by engine/plugin construction and rule validation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("plugin '{0}' is already registered")]
    DuplicatePlugin(String),

    #[error("rule nests plugin '{0}' within itself, which is disallowed")]
    PluginNesting(String),

    #[error("invalid constraint configuration: {0}")]
    InvalidConstraint(String),

    #[error("invalid input: expected {expected}, got {actual}")]
    InvalidInput {
        expected: &'static str,
        actual: &'static str,
    },
}
