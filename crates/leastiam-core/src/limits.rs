//! Fixed IAM service limits shared across the workspace.

/// The only supported policy-language version.
pub const POLICY_LANGUAGE_VERSION: &str = "2012-10-17";

/// Size ceiling for a managed policy document, in bytes.
pub const MANAGED_POLICY_SIZE_LIMIT_BYTES: usize = 6144;

/// Inclusive lower bound for a role's max session duration, in seconds.
pub const MIN_SESSION_DURATION_SECS: i64 = 3600;

/// Inclusive upper bound for a role's max session duration, in seconds.
pub const MAX_SESSION_DURATION_SECS: i64 = 43200;
