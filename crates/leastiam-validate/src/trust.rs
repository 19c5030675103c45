//! Trust policy validation rules.
//!
//! The version check runs first (document header), then the per-statement
//! principal rules in statement order, then the role-level session-duration
//! bound.

use leastiam_core::{
    ConditionMap, PolicyDocument, PolicyType, PolicyValidationResult, RuleId, Statement, Violation,
    MAX_SESSION_DURATION_SECS, MIN_SESSION_DURATION_SECS, POLICY_LANGUAGE_VERSION,
};
use serde_json::json;

/// Evaluates one trust policy document against the trust-specific rules.
#[derive(Debug, Default)]
pub struct TrustValidator;

impl TrustValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a trust policy document and its companion session duration.
    pub fn validate(
        &self,
        policy_name: &str,
        document: &PolicyDocument,
        max_session_duration: Option<i64>,
    ) -> PolicyValidationResult {
        let mut violations = Vec::new();

        check_version(document, &mut violations);
        for (index, statement) in document.statement.iter().enumerate() {
            let principal_pinned = check_principal(index, statement, &mut violations);
            // A bare wildcard already produced an error for this statement;
            // asking for federated conditions on it would double-report.
            if principal_pinned {
                check_federated_conditions(index, statement, &mut violations);
            }
        }
        check_session_duration(max_session_duration, &mut violations);

        PolicyValidationResult::new(
            policy_name,
            PolicyType::Trust,
            violations,
            document.statement.len(),
            document.total_actions(),
        )
    }
}

/// Rule 2: the policy-language version must be pinned to the supported
/// value. Auto-fixable by rewriting it.
fn check_version(document: &PolicyDocument, violations: &mut Vec<Violation>) {
    let version = document.version.as_deref();
    if version == Some(POLICY_LANGUAGE_VERSION) {
        return;
    }

    let message = match version {
        Some(found) => format!("Policy Version is '{found}', expected '{POLICY_LANGUAGE_VERSION}'"),
        None => format!("Policy has no Version; pin it to '{POLICY_LANGUAGE_VERSION}'"),
    };
    let mut violation = Violation::error(RuleId::UnpinnedPolicyVersion, message)
        .with_field("Version")
        .with_fix_hint(format!("Rewrite Version to '{POLICY_LANGUAGE_VERSION}'"))
        .fixable_with(json!({ "version": POLICY_LANGUAGE_VERSION }));
    if let Some(found) = version {
        violation = violation.with_current_value(json!(found));
    }
    violations.push(violation);
}

/// Rule 1: the principal must name who may assume the role. Absent, empty,
/// and bare-wildcard principals are errors that require human judgment.
///
/// Returns true when the principal is concrete enough for the federated
/// condition check to apply.
fn check_principal(index: usize, statement: &Statement, violations: &mut Vec<Violation>) -> bool {
    let sid = statement.sid.as_deref();
    match &statement.principal {
        None => {
            violations.push(
                Violation::error(
                    RuleId::WildcardTrustPrincipal,
                    format!("Statement {index} has no Principal; a trust policy must name who may assume the role"),
                )
                .at_statement(index, sid)
                .with_field("Principal")
                .with_fix_hint("Declare the account, service, or identity provider allowed to assume this role"),
            );
            false
        }
        Some(principal) if principal.is_empty() => {
            violations.push(
                Violation::error(
                    RuleId::WildcardTrustPrincipal,
                    format!("Statement {index} has an empty Principal"),
                )
                .at_statement(index, sid)
                .with_field("Principal")
                .with_fix_hint("Declare the account, service, or identity provider allowed to assume this role"),
            );
            false
        }
        Some(principal) if principal.is_wildcard() => {
            let mut violation = Violation::error(
                RuleId::WildcardTrustPrincipal,
                format!("Statement {index} trusts the bare wildcard \"*\"; any principal could assume the role"),
            )
            .at_statement(index, sid)
            .with_field("Principal")
            .with_fix_hint("Pin the principal to the specific account, service, or provider");
            if let Ok(value) = serde_json::to_value(principal) {
                violation = violation.with_current_value(value);
            }
            violations.push(violation);
            false
        }
        Some(_) => true,
    }
}

/// Rule 3: a federated principal must constrain the provider's audience and
/// subject claims. Not auto-fixable: the correct subject claim cannot be
/// synthesized without external context.
fn check_federated_conditions(index: usize, statement: &Statement, violations: &mut Vec<Violation>) {
    let Some(principal) = &statement.principal else {
        return;
    };
    let providers = principal.federated_providers();
    if providers.is_empty() {
        return;
    }

    let (has_audience, has_subject) = condition_claim_coverage(statement.condition.as_ref());
    if has_audience && has_subject {
        return;
    }

    let missing = if !has_audience && !has_subject {
        "audience and subject claims"
    } else if !has_audience {
        "audience claim"
    } else {
        "subject claim"
    };
    violations.push(
        Violation::error(
            RuleId::FederatedTrustMissingConditions,
            format!(
                "Federated principal '{}' does not constrain the {missing}",
                providers[0]
            ),
        )
        .at_statement(index, statement.sid.as_deref())
        .with_field("Condition")
        .with_fix_hint("Add conditions for the provider's ':aud' and ':sub' claim keys"),
    );
}

/// Look for condition keys constraining the federated audience and subject
/// claims, under any operator.
fn condition_claim_coverage(condition: Option<&ConditionMap>) -> (bool, bool) {
    let mut has_audience = false;
    let mut has_subject = false;
    if let Some(operators) = condition {
        for keys in operators.values() {
            for key in keys.keys() {
                if key.ends_with(":aud") {
                    has_audience = true;
                }
                if key.ends_with(":sub") {
                    has_subject = true;
                }
            }
        }
    }
    (has_audience, has_subject)
}

/// Rule 4: the companion session duration must lie inside the IAM bounds.
/// Auto-fixable by clamping to the nearer bound.
fn check_session_duration(max_session_duration: Option<i64>, violations: &mut Vec<Violation>) {
    let Some(duration) = max_session_duration else {
        return;
    };
    if (MIN_SESSION_DURATION_SECS..=MAX_SESSION_DURATION_SECS).contains(&duration) {
        return;
    }

    let clamped = duration.clamp(MIN_SESSION_DURATION_SECS, MAX_SESSION_DURATION_SECS);
    violations.push(
        Violation::error(
            RuleId::SessionDurationOutOfRange,
            format!(
                "max_session_duration {duration} is outside the allowed {MIN_SESSION_DURATION_SECS}-{MAX_SESSION_DURATION_SECS} second range"
            ),
        )
        .with_field("max_session_duration")
        .with_current_value(json!(duration))
        .with_fix_hint(format!("Clamp the session duration to {clamped} seconds"))
        .fixable_with(json!({ "max_session_duration": clamped })),
    );
}
