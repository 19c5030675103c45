//! Permission policy validation rules.
//!
//! Rules are evaluated per statement, in statement order, so the violation
//! list is ordered by statement index first and rule number second. The
//! document-level size check runs last.

use crate::config::EngineConfig;
use leastiam_core::{
    Effect, PolicyDocument, PolicyType, PolicyValidationResult, RuleId, Statement, Violation,
};
use serde_json::json;
use std::collections::BTreeMap;

/// Evaluates one permission policy document against the least-privilege
/// rules.
pub struct PermissionValidator<'a> {
    config: &'a EngineConfig,
}

impl<'a> PermissionValidator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Validate a permission policy document.
    ///
    /// `estimated_size_bytes` is the serialized size accompanying the draft;
    /// the size-pressure rule is skipped when no estimate is supplied.
    pub fn validate(
        &self,
        policy_name: &str,
        document: &PolicyDocument,
        estimated_size_bytes: Option<usize>,
    ) -> PolicyValidationResult {
        let mut violations = Vec::new();
        let mut seen_sids: BTreeMap<&str, usize> = BTreeMap::new();

        for (index, statement) in document.statement.iter().enumerate() {
            self.check_wildcard_resource(index, statement, &mut violations);
            self.check_wildcard_actions(index, statement, &mut violations);
            check_missing_sid(index, statement, &mut violations);
            check_duplicate_sid(index, statement, &mut seen_sids, &mut violations);
        }
        self.check_size_pressure(estimated_size_bytes, &mut violations);

        PolicyValidationResult::new(
            policy_name,
            PolicyType::Permission,
            violations,
            document.statement.len(),
            document.total_actions(),
        )
    }

    /// Rule 1: `Resource: "*"` on an Allow statement whose actions support
    /// resource-level scoping. Not auto-fixable: no narrower ARN context is
    /// available, and the engine does not guess one.
    fn check_wildcard_resource(
        &self,
        index: usize,
        statement: &Statement,
        violations: &mut Vec<Violation>,
    ) {
        if statement.effect != Effect::Allow || !statement.has_wildcard_resource() {
            return;
        }

        let scopable: Vec<&str> = statement
            .action
            .iter()
            .filter(|action| !leastiam_actions::is_unscoped(action))
            .collect();
        if scopable.is_empty() {
            return;
        }

        let current_value = statement
            .resource
            .as_ref()
            .and_then(|resource| serde_json::to_value(resource).ok());

        let mut violation = Violation::error(
            RuleId::WildcardResourceOnScopableAction,
            format!(
                "Statement allows {} on Resource \"*\" but the action(s) support resource-level scoping",
                scopable.join(", ")
            ),
        )
        .at_statement(index, statement.sid.as_deref())
        .with_field("Resource")
        .with_fix_hint("Replace \"*\" with ARN patterns covering only the resources this role manages");
        if let Some(value) = current_value {
            violation = violation.with_current_value(value);
        }
        violations.push(violation);
    }

    /// Rule 2: `Action: "*"` or `service:*` outside the allow-list. Requires
    /// human judgment on intended scope, so never auto-fixable.
    fn check_wildcard_actions(
        &self,
        index: usize,
        statement: &Statement,
        violations: &mut Vec<Violation>,
    ) {
        for action in statement.action.iter() {
            let flagged = if action == "*" {
                true
            } else if let Some(service) = action.strip_suffix(":*") {
                !self.config.allowed_wildcard_services.contains(service)
            } else {
                false
            };
            if !flagged {
                continue;
            }

            violations.push(
                Violation::error(
                    RuleId::ServiceWildcardAction,
                    format!("Action '{action}' grants every operation it matches"),
                )
                .at_statement(index, statement.sid.as_deref())
                .with_field("Action")
                .with_current_value(json!(action))
                .with_fix_hint("Enumerate the specific actions the role needs"),
            );
        }
    }

    /// Rule 5: the document is approaching the IAM policy size ceiling.
    fn check_size_pressure(&self, estimated_size_bytes: Option<usize>, violations: &mut Vec<Violation>) {
        let Some(size) = estimated_size_bytes else {
            return;
        };
        let threshold = self.config.size_warning_threshold();
        if size < threshold {
            return;
        }

        violations.push(
            Violation::warning(
                RuleId::PolicySizePressure,
                format!(
                    "Policy document is {size} bytes, within {} bytes of the {}-byte limit",
                    self.config.max_policy_size_bytes.saturating_sub(size),
                    self.config.max_policy_size_bytes
                ),
            )
            .with_current_value(json!(size))
            .with_fix_hint("Split the policy or consolidate statements before it reaches the hard limit"),
        );
    }
}

/// Rule 3: a statement without a `Sid`. Auto-fixable with a generated
/// identifier derived from the statement index and primary action.
fn check_missing_sid(index: usize, statement: &Statement, violations: &mut Vec<Violation>) {
    let has_sid = statement
        .sid
        .as_deref()
        .map(|sid| !sid.is_empty())
        .unwrap_or(false);
    if has_sid {
        return;
    }

    let generated = generated_sid(index, statement.action.first());
    violations.push(
        Violation::warning(
            RuleId::MissingStatementSid,
            format!("Statement {index} has no Sid; statements should carry stable identifiers"),
        )
        .at_statement(index, None)
        .with_field("Sid")
        .with_fix_hint(format!("Assign the generated identifier '{generated}'"))
        .fixable_with(json!({ "sid": generated })),
    );
}

/// Rule 4: two statements sharing a non-empty `Sid`. The later occurrence is
/// reported and auto-fixable by deterministic regeneration.
fn check_duplicate_sid<'doc>(
    index: usize,
    statement: &'doc Statement,
    seen_sids: &mut BTreeMap<&'doc str, usize>,
    violations: &mut Vec<Violation>,
) {
    let Some(sid) = statement.sid.as_deref().filter(|sid| !sid.is_empty()) else {
        return;
    };

    if let Some(&first_index) = seen_sids.get(sid) {
        let regenerated = format!("{sid}At{index}");
        violations.push(
            Violation::error(
                RuleId::DuplicateStatementSid,
                format!(
                    "Sid '{sid}' already used by statement {first_index}; identifiers must be unique within a document"
                ),
            )
            .at_statement(index, Some(sid))
            .with_field("Sid")
            .with_current_value(json!(sid))
            .with_fix_hint(format!("Rename the duplicate to '{regenerated}'"))
            .fixable_with(json!({ "sid": regenerated })),
        );
    } else {
        seen_sids.insert(sid, index);
    }
}

/// Derive a statement identifier from its index and primary action, e.g.
/// index 2 and `s3:GetObject` become `Stmt2S3GetObject`.
fn generated_sid(index: usize, primary_action: Option<&str>) -> String {
    let action_part = primary_action
        .map(sid_component)
        .filter(|part| !part.is_empty())
        .unwrap_or_else(|| "Statement".to_string());
    format!("Stmt{index}{action_part}")
}

fn sid_component(action: &str) -> String {
    let mut out = String::with_capacity(action.len());
    let mut upper_next = true;
    for c in action.chars() {
        if c.is_ascii_alphanumeric() {
            if upper_next {
                out.extend(c.to_uppercase());
                upper_next = false;
            } else {
                out.push(c);
            }
        } else if c == '*' {
            out.push_str("All");
            upper_next = true;
        } else {
            upper_next = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use leastiam_core::Severity;

    fn document(value: serde_json::Value) -> PolicyDocument {
        serde_json::from_value(value).expect("test document must parse")
    }

    fn validate(value: serde_json::Value) -> PolicyValidationResult {
        let config = EngineConfig::default();
        PermissionValidator::new(&config).validate("test-policy", &document(value), None)
    }

    #[test]
    fn unscoped_action_with_wildcard_resource_is_clean() {
        let result = validate(json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Sid": "S3Loc",
                "Effect": "Allow",
                "Action": ["s3:GetBucketLocation"],
                "Resource": "*"
            }]
        }));

        assert!(result.valid);
        assert!(result.violations.is_empty());
        assert_eq!(result.stats.total_statements, 1);
        assert_eq!(result.stats.total_actions, 1);
    }

    #[test]
    fn scopable_action_with_wildcard_resource_is_an_error() {
        let result = validate(json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Sid": "S3Read",
                "Effect": "Allow",
                "Action": ["s3:GetObject"],
                "Resource": "*"
            }]
        }));

        assert!(!result.valid);
        assert_eq!(result.violations.len(), 1);
        let violation = &result.violations[0];
        assert_eq!(violation.rule_id, RuleId::WildcardResourceOnScopableAction);
        assert_eq!(violation.severity, Severity::Error);
        assert_eq!(violation.field.as_deref(), Some("Resource"));
        assert_eq!(violation.statement_sid.as_deref(), Some("S3Read"));
        assert!(!violation.auto_fixable);
        assert!(violation.fix_data.is_none());
    }

    #[test]
    fn deny_statements_may_use_wildcard_resources() {
        let result = validate(json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Sid": "DenyAll",
                "Effect": "Deny",
                "Action": ["s3:DeleteBucket"],
                "Resource": "*"
            }]
        }));

        assert!(result.valid);
    }

    #[test]
    fn mixed_actions_still_flag_the_scopable_one() {
        let result = validate(json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Sid": "Mixed",
                "Effect": "Allow",
                "Action": ["s3:GetBucketLocation", "s3:GetObject"],
                "Resource": "*"
            }]
        }));

        assert_eq!(result.violations.len(), 1);
        assert!(result.violations[0].message.contains("s3:GetObject"));
        assert!(!result.violations[0].message.contains("s3:GetBucketLocation"));
    }

    #[test]
    fn bare_and_service_wildcard_actions_are_errors() {
        let result = validate(json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Sid": "Wild",
                "Effect": "Allow",
                "Action": ["*", "ec2:*"],
                "Resource": ["arn:aws:ec2:eu-west-1:123456789012:instance/*"]
            }]
        }));

        let wildcards: Vec<_> = result
            .violations
            .iter()
            .filter(|v| v.rule_id == RuleId::ServiceWildcardAction)
            .collect();
        assert_eq!(wildcards.len(), 2);
        assert!(wildcards.iter().all(|v| !v.auto_fixable));
    }

    #[test]
    fn allow_listed_service_wildcard_is_permitted() {
        let mut config = EngineConfig::default();
        config.allowed_wildcard_services.insert("logs".to_string());
        let document = document(json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Sid": "Logs",
                "Effect": "Allow",
                "Action": ["logs:*"],
                "Resource": ["arn:aws:logs:eu-west-1:123456789012:log-group:*"]
            }]
        }));

        let result = PermissionValidator::new(&config).validate("p", &document, None);
        assert!(result.valid);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn missing_sid_is_a_fixable_warning() {
        let result = validate(json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Action": ["s3:GetObject"],
                "Resource": ["arn:aws:s3:::my-bucket/*"]
            }]
        }));

        assert!(result.valid, "a warning alone must not invalidate the policy");
        assert_eq!(result.violations.len(), 1);
        let violation = &result.violations[0];
        assert_eq!(violation.rule_id, RuleId::MissingStatementSid);
        assert_eq!(violation.severity, Severity::Warning);
        assert!(violation.auto_fixable);
        assert_eq!(
            violation.fix_data.as_ref().and_then(|d| d["sid"].as_str()),
            Some("Stmt0S3GetObject")
        );
    }

    #[test]
    fn duplicate_sid_flags_the_later_statement() {
        let result = validate(json!({
            "Version": "2012-10-17",
            "Statement": [
                {"Sid": "Dup", "Effect": "Allow", "Action": ["s3:GetObject"], "Resource": ["arn:aws:s3:::b/*"]},
                {"Sid": "Dup", "Effect": "Allow", "Action": ["s3:PutObject"], "Resource": ["arn:aws:s3:::b/*"]}
            ]
        }));

        assert!(!result.valid);
        assert_eq!(result.violations.len(), 1);
        let violation = &result.violations[0];
        assert_eq!(violation.rule_id, RuleId::DuplicateStatementSid);
        assert_eq!(violation.statement_index, Some(1));
        assert!(violation.auto_fixable);
        assert_eq!(
            violation.fix_data.as_ref().and_then(|d| d["sid"].as_str()),
            Some("DupAt1")
        );
    }

    #[test]
    fn size_pressure_warns_near_the_limit() {
        let config = EngineConfig::default();
        let validator = PermissionValidator::new(&config);
        let doc = document(json!({
            "Version": "2012-10-17",
            "Statement": [{"Sid": "S", "Effect": "Allow", "Action": ["s3:GetBucketLocation"], "Resource": "*"}]
        }));

        let under = validator.validate("p", &doc, Some(5000));
        assert!(under.violations.is_empty());

        let over = validator.validate("p", &doc, Some(6000));
        assert_eq!(over.violations.len(), 1);
        assert_eq!(over.violations[0].rule_id, RuleId::PolicySizePressure);
        assert_eq!(over.violations[0].severity, Severity::Warning);
        assert!(!over.violations[0].auto_fixable);
        assert!(over.valid, "size pressure alone keeps the policy valid");
    }

    #[test]
    fn violations_follow_statement_order() {
        let result = validate(json!({
            "Version": "2012-10-17",
            "Statement": [
                {"Effect": "Allow", "Action": ["s3:GetObject"], "Resource": "*"},
                {"Sid": "Second", "Effect": "Allow", "Action": ["ec2:*"], "Resource": ["arn:aws:ec2:*:*:instance/*"]}
            ]
        }));

        let indices: Vec<_> = result.violations.iter().map(|v| v.statement_index).collect();
        assert_eq!(indices, vec![Some(0), Some(0), Some(1)]);
        // statement 0: wildcard resource error then missing sid warning
        assert_eq!(result.violations[0].rule_id, RuleId::WildcardResourceOnScopableAction);
        assert_eq!(result.violations[1].rule_id, RuleId::MissingStatementSid);
        assert_eq!(result.violations[2].rule_id, RuleId::ServiceWildcardAction);
    }

    #[test]
    fn stats_match_violation_counts() {
        let result = validate(json!({
            "Version": "2012-10-17",
            "Statement": [
                {"Effect": "Allow", "Action": ["s3:GetObject"], "Resource": "*"},
                {"Sid": "Dup", "Effect": "Allow", "Action": ["s3:PutObject"], "Resource": ["arn:aws:s3:::b/*"]},
                {"Sid": "Dup", "Effect": "Allow", "Action": ["s3:DeleteObject"], "Resource": ["arn:aws:s3:::b/*"]}
            ]
        }));

        let errors = result.violations.iter().filter(|v| v.severity == Severity::Error).count();
        let warnings = result.violations.iter().filter(|v| v.severity == Severity::Warning).count();
        assert_eq!(result.stats.errors, errors);
        assert_eq!(result.stats.warnings, warnings);
        assert!(result.stats.auto_fixable_errors <= result.stats.errors);
        assert_eq!(result.stats.total_statements, 3);
        assert_eq!(result.stats.total_actions, 3);
    }

    #[test]
    fn generated_sid_shapes() {
        assert_eq!(generated_sid(0, Some("s3:GetObject")), "Stmt0S3GetObject");
        assert_eq!(generated_sid(3, Some("*")), "Stmt3All");
        assert_eq!(generated_sid(1, None), "Stmt1Statement");
    }
}
