// Shared types used across all leastiam crates

pub mod document;
pub mod formulation;
pub mod limits;
pub mod report;

// Re-export commonly used types for convenience
pub use document::{ConditionMap, Effect, PolicyDocument, Principal, Statement, StringList};
pub use formulation::{FormulatedRole, FormulationOutput, PolicyDraft};
pub use limits::{
    MANAGED_POLICY_SIZE_LIMIT_BYTES, MAX_SESSION_DURATION_SECS, MIN_SESSION_DURATION_SECS,
    POLICY_LANGUAGE_VERSION,
};
pub use report::{
    PolicyType, PolicyValidationResult, RoleValidationResult, RuleId, Severity, ValidationOutput,
    ValidationStats, Violation,
};
