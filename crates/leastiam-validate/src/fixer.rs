//! Deterministic per-rule repairs.
//!
//! `apply_fixes` is a pure function keyed by `rule_id` dispatch: it never
//! mutates its input document, applies only violations that are
//! auto-fixable with well-formed fix data, and reports everything else as
//! skipped so the orchestrator can exclude it from later passes instead of
//! spinning on it.

use leastiam_core::{PolicyDocument, RuleId, Violation};
use serde_json::Value;

/// Outcome of one fixing pass over a single policy document.
#[derive(Debug, Clone)]
pub enum FixOutcome {
    /// At least one repair was applied.
    Applied {
        /// The repaired document.
        document: PolicyDocument,
        /// Updated role session duration, when a clamp was applied.
        max_session_duration: Option<i64>,
        /// Rules whose transforms ran, in violation order.
        applied_rules: Vec<RuleId>,
        skipped: Vec<SkippedFix>,
    },
    /// No repair could be applied.
    NotApplied {
        reason: String,
        skipped: Vec<SkippedFix>,
    },
}

/// A violation the fixer declined to repair in this pass.
#[derive(Debug, Clone)]
pub struct SkippedFix {
    pub rule_id: RuleId,
    pub statement_index: Option<usize>,
    pub reason: String,
}

/// True when the fixer has a transform registered for `rule_id`.
pub fn has_transform(rule_id: RuleId) -> bool {
    matches!(
        rule_id,
        RuleId::MissingStatementSid
            | RuleId::DuplicateStatementSid
            | RuleId::UnpinnedPolicyVersion
            | RuleId::SessionDurationOutOfRange
    )
}

/// Apply every actionable fix among `violations` to a copy of `document`.
pub fn apply_fixes(document: &PolicyDocument, violations: &[Violation]) -> FixOutcome {
    let mut working = document.clone();
    let mut max_session_duration = None;
    let mut applied_rules = Vec::new();
    let mut skipped = Vec::new();

    for violation in violations.iter().filter(|v| v.auto_fixable) {
        // An auto-fixable violation without fix data is an internal
        // inconsistency in the validator, not a reason to abort the pass.
        let Some(fix_data) = violation.fix_data.as_ref() else {
            tracing::warn!(
                rule = %violation.rule_id,
                "auto-fixable violation carries no fix_data; skipping"
            );
            skipped.push(SkippedFix {
                rule_id: violation.rule_id,
                statement_index: violation.statement_index,
                reason: "missing fix_data".to_string(),
            });
            continue;
        };

        match apply_one(&mut working, violation, fix_data) {
            Ok(FixApplication::Document) => applied_rules.push(violation.rule_id),
            Ok(FixApplication::SessionDuration(duration)) => {
                max_session_duration = Some(duration);
                applied_rules.push(violation.rule_id);
            }
            Err(reason) => {
                tracing::warn!(rule = %violation.rule_id, %reason, "fix skipped");
                skipped.push(SkippedFix {
                    rule_id: violation.rule_id,
                    statement_index: violation.statement_index,
                    reason,
                });
            }
        }
    }

    if applied_rules.is_empty() {
        FixOutcome::NotApplied {
            reason: "no applicable fixes".to_string(),
            skipped,
        }
    } else {
        FixOutcome::Applied {
            document: working,
            max_session_duration,
            applied_rules,
            skipped,
        }
    }
}

enum FixApplication {
    /// The working document was changed.
    Document,
    /// The role's session duration must be replaced with this value.
    SessionDuration(i64),
}

fn apply_one(
    document: &mut PolicyDocument,
    violation: &Violation,
    fix_data: &Value,
) -> Result<FixApplication, String> {
    match violation.rule_id {
        RuleId::MissingStatementSid | RuleId::DuplicateStatementSid => {
            let sid = fix_data
                .get("sid")
                .and_then(Value::as_str)
                .ok_or("fix_data has no 'sid' string")?;
            let index = violation
                .statement_index
                .ok_or("violation has no statement_index")?;
            let statement = document
                .statement
                .get_mut(index)
                .ok_or_else(|| format!("statement_index {index} is out of range"))?;
            statement.sid = Some(sid.to_string());
            Ok(FixApplication::Document)
        }
        RuleId::UnpinnedPolicyVersion => {
            let version = fix_data
                .get("version")
                .and_then(Value::as_str)
                .ok_or("fix_data has no 'version' string")?;
            document.version = Some(version.to_string());
            Ok(FixApplication::Document)
        }
        RuleId::SessionDurationOutOfRange => {
            let duration = fix_data
                .get("max_session_duration")
                .and_then(Value::as_i64)
                .ok_or("fix_data has no 'max_session_duration' integer")?;
            Ok(FixApplication::SessionDuration(duration))
        }
        other => {
            // A violation claiming auto_fixable for a rule with no transform
            // is a programmer error; abandon this rule, let the rest proceed.
            tracing::error!(rule = %other, "no fix transform registered for rule");
            Err(format!("no fix transform registered for rule '{other}'"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leastiam_core::POLICY_LANGUAGE_VERSION;
    use serde_json::json;

    fn document(value: serde_json::Value) -> PolicyDocument {
        serde_json::from_value(value).expect("test document must parse")
    }

    #[test]
    fn every_auto_fixable_rule_has_a_transform() {
        for rule in RuleId::AUTO_FIXABLE {
            assert!(has_transform(*rule), "missing transform for '{rule}'");
        }
        assert!(!has_transform(RuleId::WildcardResourceOnScopableAction));
        assert!(!has_transform(RuleId::WildcardTrustPrincipal));
    }

    #[test]
    fn assigns_sid_without_mutating_input() {
        let original = document(json!({
            "Version": "2012-10-17",
            "Statement": [{"Effect": "Allow", "Action": ["s3:GetObject"], "Resource": ["arn:aws:s3:::b/*"]}]
        }));
        let violation = Violation::warning(RuleId::MissingStatementSid, "no sid")
            .at_statement(0, None)
            .fixable_with(json!({"sid": "Stmt0S3GetObject"}));

        let outcome = apply_fixes(&original, std::slice::from_ref(&violation));
        let FixOutcome::Applied { document: fixed, applied_rules, skipped, .. } = outcome else {
            panic!("fix must apply");
        };

        assert_eq!(fixed.statement[0].sid.as_deref(), Some("Stmt0S3GetObject"));
        assert_eq!(applied_rules, vec![RuleId::MissingStatementSid]);
        assert!(skipped.is_empty());
        assert_eq!(original.statement[0].sid, None, "input must stay untouched");
    }

    #[test]
    fn rewrites_version() {
        let original = document(json!({
            "Statement": [{"Effect": "Allow", "Action": "sts:AssumeRole", "Principal": {"AWS": "arn:aws:iam::123456789012:root"}}]
        }));
        let violation = Violation::error(RuleId::UnpinnedPolicyVersion, "no version")
            .fixable_with(json!({"version": POLICY_LANGUAGE_VERSION}));

        let FixOutcome::Applied { document: fixed, .. } = apply_fixes(&original, &[violation])
        else {
            panic!("fix must apply");
        };
        assert_eq!(fixed.version.as_deref(), Some(POLICY_LANGUAGE_VERSION));
        assert_eq!(original.version, None);
    }

    #[test]
    fn clamps_session_duration_via_outcome() {
        let original = document(json!({"Version": "2012-10-17", "Statement": []}));
        let violation = Violation::error(RuleId::SessionDurationOutOfRange, "too short")
            .fixable_with(json!({"max_session_duration": 3600}));

        let FixOutcome::Applied { document: fixed, max_session_duration, .. } =
            apply_fixes(&original, &[violation])
        else {
            panic!("fix must apply");
        };
        assert_eq!(max_session_duration, Some(3600));
        assert_eq!(fixed, original, "the document itself is untouched");
    }

    #[test]
    fn malformed_fix_data_is_skipped_not_fatal() {
        let original = document(json!({
            "Version": "2012-10-17",
            "Statement": [{"Effect": "Allow", "Action": ["s3:GetObject"], "Resource": ["arn:aws:s3:::b/*"]}]
        }));
        let bad = Violation::warning(RuleId::MissingStatementSid, "no sid")
            .at_statement(0, None)
            .fixable_with(json!({"wrong_key": true}));

        let FixOutcome::NotApplied { skipped, .. } = apply_fixes(&original, &[bad]) else {
            panic!("nothing must apply");
        };
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].rule_id, RuleId::MissingStatementSid);
        assert!(skipped[0].reason.contains("sid"));
    }

    #[test]
    fn missing_fix_data_on_fixable_violation_is_skipped() {
        let original = document(json!({"Version": "2012-10-17", "Statement": []}));
        let mut inconsistent = Violation::warning(RuleId::MissingStatementSid, "no sid");
        inconsistent.auto_fixable = true; // fix_data deliberately absent

        let FixOutcome::NotApplied { skipped, .. } = apply_fixes(&original, &[inconsistent])
        else {
            panic!("nothing must apply");
        };
        assert_eq!(skipped[0].reason, "missing fix_data");
    }

    #[test]
    fn unregistered_rule_is_skipped_and_others_proceed() {
        let original = document(json!({
            "Version": "2012-10-17",
            "Statement": [{"Effect": "Allow", "Action": ["s3:GetObject"], "Resource": ["arn:aws:s3:::b/*"]}]
        }));
        let mut rogue = Violation::error(RuleId::WildcardTrustPrincipal, "claims fixable");
        rogue.auto_fixable = true;
        rogue.fix_data = Some(json!({}));
        let good = Violation::warning(RuleId::MissingStatementSid, "no sid")
            .at_statement(0, None)
            .fixable_with(json!({"sid": "Stmt0S3GetObject"}));

        let FixOutcome::Applied { document: fixed, applied_rules, skipped, .. } =
            apply_fixes(&original, &[rogue, good])
        else {
            panic!("the good fix must still apply");
        };
        assert_eq!(applied_rules, vec![RuleId::MissingStatementSid]);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].rule_id, RuleId::WildcardTrustPrincipal);
        assert_eq!(fixed.statement[0].sid.as_deref(), Some("Stmt0S3GetObject"));
    }

    #[test]
    fn out_of_range_statement_index_is_skipped() {
        let original = document(json!({"Version": "2012-10-17", "Statement": []}));
        let violation = Violation::warning(RuleId::MissingStatementSid, "no sid")
            .at_statement(7, None)
            .fixable_with(json!({"sid": "Stmt7Statement"}));

        let FixOutcome::NotApplied { skipped, .. } = apply_fixes(&original, &[violation]) else {
            panic!("nothing must apply");
        };
        assert!(skipped[0].reason.contains("out of range"));
    }

    #[test]
    fn non_fixable_violations_are_ignored_entirely() {
        let original = document(json!({
            "Version": "2012-10-17",
            "Statement": [{"Sid": "S", "Effect": "Allow", "Action": ["s3:GetObject"], "Resource": "*"}]
        }));
        let violation = Violation::error(RuleId::WildcardResourceOnScopableAction, "wildcard")
            .at_statement(0, Some("S"));

        let FixOutcome::NotApplied { skipped, .. } = apply_fixes(&original, &[violation]) else {
            panic!("nothing must apply");
        };
        assert!(skipped.is_empty(), "non-fixable violations are not even skipped");
    }
}
