//! Validation report model.
//!
//! Rule violations are always data, never errors: a policy with violations
//! still produces a complete, inspectable result, and the report is what
//! downstream synthesis gates on.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Stable identifiers for the validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    // =========================================================================
    // Permission policy rules
    // =========================================================================
    /// `Resource: "*"` on an action that supports resource-level scoping.
    WildcardResourceOnScopableAction,
    /// `Action: "*"` or `service:*` outside the allow-list.
    ServiceWildcardAction,
    /// Statement carries no `Sid`.
    MissingStatementSid,
    /// Two statements share a `Sid`.
    DuplicateStatementSid,
    /// Document size estimate is approaching the IAM ceiling.
    PolicySizePressure,

    // =========================================================================
    // Trust policy rules
    // =========================================================================
    /// `Principal` absent, empty, or a bare `"*"`.
    WildcardTrustPrincipal,
    /// `Version` missing or not the supported policy-language version.
    UnpinnedPolicyVersion,
    /// Federated principal without audience/subject conditions.
    FederatedTrustMissingConditions,
    /// Companion `max_session_duration` outside the valid range.
    SessionDurationOutOfRange,
}

impl RuleId {
    /// Rules whose violations the fixer repairs deterministically.
    pub const AUTO_FIXABLE: &'static [RuleId] = &[
        RuleId::MissingStatementSid,
        RuleId::DuplicateStatementSid,
        RuleId::UnpinnedPolicyVersion,
        RuleId::SessionDurationOutOfRange,
    ];

    /// The stable identifier string used in serialized reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::WildcardResourceOnScopableAction => "wildcard-resource-on-scopable-action",
            RuleId::ServiceWildcardAction => "service-wildcard-action",
            RuleId::MissingStatementSid => "missing-statement-sid",
            RuleId::DuplicateStatementSid => "duplicate-statement-sid",
            RuleId::PolicySizePressure => "policy-size-pressure",
            RuleId::WildcardTrustPrincipal => "wildcard-trust-principal",
            RuleId::UnpinnedPolicyVersion => "unpinned-policy-version",
            RuleId::FederatedTrustMissingConditions => "federated-trust-missing-conditions",
            RuleId::SessionDurationOutOfRange => "session-duration-out-of-range",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single rule violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: RuleId,
    pub severity: Severity,
    pub message: String,

    /// `Sid` of the offending statement, when it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_sid: Option<String>,

    /// Index of the offending statement; required when `Sid` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_index: Option<usize>,

    /// Which attribute of the statement is implicated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// The offending value, opaque to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<Value>,

    pub auto_fixable: bool,

    /// Human-readable description of the remedy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,

    /// Structured payload the fixer uses to apply the remedy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_data: Option<Value>,
}

impl Violation {
    fn new(rule_id: RuleId, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule_id,
            severity,
            message: message.into(),
            statement_sid: None,
            statement_index: None,
            field: None,
            current_value: None,
            auto_fixable: false,
            fix_hint: None,
            fix_data: None,
        }
    }

    /// Create an error-severity violation.
    pub fn error(rule_id: RuleId, message: impl Into<String>) -> Self {
        Self::new(rule_id, Severity::Error, message)
    }

    /// Create a warning-severity violation.
    pub fn warning(rule_id: RuleId, message: impl Into<String>) -> Self {
        Self::new(rule_id, Severity::Warning, message)
    }

    /// Locate the violation at a statement.
    pub fn at_statement(mut self, index: usize, sid: Option<&str>) -> Self {
        self.statement_index = Some(index);
        self.statement_sid = sid.map(str::to_string);
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_current_value(mut self, value: Value) -> Self {
        self.current_value = Some(value);
        self
    }

    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Mark the violation auto-fixable with the structured fix payload.
    pub fn fixable_with(mut self, fix_data: Value) -> Self {
        self.auto_fixable = true;
        self.fix_data = Some(fix_data);
        self
    }
}

/// Counters for one policy's validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStats {
    pub total_statements: usize,
    pub total_actions: usize,
    pub errors: usize,
    pub warnings: usize,
    pub auto_fixable_errors: usize,
    pub auto_fixable_warnings: usize,
}

impl ValidationStats {
    /// Tally one violation into the severity counters.
    pub fn record(&mut self, violation: &Violation) {
        match violation.severity {
            Severity::Error => {
                self.errors += 1;
                if violation.auto_fixable {
                    self.auto_fixable_errors += 1;
                }
            }
            Severity::Warning => {
                self.warnings += 1;
                if violation.auto_fixable {
                    self.auto_fixable_warnings += 1;
                }
            }
        }
    }
}

/// Whether a result covers a permission or a trust policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyType {
    Permission,
    Trust,
}

/// Validation result for one policy document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyValidationResult {
    pub policy_name: String,
    pub policy_type: PolicyType,
    /// True iff no error-severity violation remains.
    pub valid: bool,
    /// Ordered: statement order, then rule order within a statement.
    pub violations: Vec<Violation>,
    pub stats: ValidationStats,
}

impl PolicyValidationResult {
    /// Assemble a result from evaluated violations; `valid` and the severity
    /// counters are derived, never supplied.
    pub fn new(
        policy_name: impl Into<String>,
        policy_type: PolicyType,
        violations: Vec<Violation>,
        total_statements: usize,
        total_actions: usize,
    ) -> Self {
        let mut stats = ValidationStats {
            total_statements,
            total_actions,
            ..Default::default()
        };
        for violation in &violations {
            stats.record(violation);
        }
        Self {
            policy_name: policy_name.into(),
            policy_type,
            valid: stats.errors == 0,
            violations,
            stats,
        }
    }

    /// Violations the fixer could act on.
    pub fn auto_fixable(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.auto_fixable)
    }
}

/// Validation result for one role (trust policy result first, then
/// permission policy results in input order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleValidationResult {
    pub role_name: String,
    pub valid: bool,
    pub policy_results: Vec<PolicyValidationResult>,
}

impl RoleValidationResult {
    pub fn new(role_name: impl Into<String>, policy_results: Vec<PolicyValidationResult>) -> Self {
        let valid = policy_results.iter().all(|result| result.valid);
        Self {
            role_name: role_name.into(),
            valid,
            policy_results,
        }
    }
}

/// The full validate-and-fix report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutput {
    pub valid: bool,
    /// Input role order preserved.
    pub role_results: Vec<RoleValidationResult>,
    /// Fix passes actually performed.
    pub fix_iterations: usize,
}

impl ValidationOutput {
    pub fn new(role_results: Vec<RoleValidationResult>, fix_iterations: usize) -> Self {
        let valid = role_results.iter().all(|result| result.valid);
        Self {
            valid,
            role_results,
            fix_iterations,
        }
    }

    /// Error count across every policy of every role.
    pub fn total_errors(&self) -> usize {
        self.role_results
            .iter()
            .flat_map(|role| role.policy_results.iter())
            .map(|result| result.stats.errors)
            .sum()
    }

    /// Warning count across every policy of every role.
    pub fn total_warnings(&self) -> usize {
        self.role_results
            .iter()
            .flat_map(|role| role.policy_results.iter())
            .map(|result| result.stats.warnings)
            .sum()
    }
}
