//! Engine configuration.

use leastiam_core::MANAGED_POLICY_SIZE_LIMIT_BYTES;
use std::collections::BTreeSet;

/// Tunable constants for the validation engine.
///
/// The defaults track IAM's published service limits; tests override single
/// fields to probe the bounds.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on Fixing passes.
    pub max_fix_iterations: usize,
    /// Policy document size ceiling, in bytes.
    pub max_policy_size_bytes: usize,
    /// Fraction of the ceiling at which size pressure is reported.
    pub size_warning_ratio: f64,
    /// Services whose `service:*` actions are deliberately permitted.
    pub allowed_wildcard_services: BTreeSet<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_fix_iterations: 5,
            max_policy_size_bytes: MANAGED_POLICY_SIZE_LIMIT_BYTES,
            size_warning_ratio: 0.9,
            allowed_wildcard_services: BTreeSet::new(),
        }
    }
}

impl EngineConfig {
    /// Size at which the size-pressure warning fires.
    pub fn size_warning_threshold(&self) -> usize {
        (self.max_policy_size_bytes as f64 * self.size_warning_ratio) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_is_ninety_percent_of_limit() {
        let config = EngineConfig::default();
        assert_eq!(config.max_fix_iterations, 5);
        assert_eq!(config.size_warning_threshold(), 5529);
    }
}
