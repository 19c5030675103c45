//! Validate-and-fix orchestration across roles and policies.
//!
//! The loop runs Validating -> Deciding -> (Fixing -> Validating)* -> Done.
//! Each Fixing pass either repairs an actionable violation or moves it into
//! the per-policy skip set, which only grows; the iteration bound backstops
//! adversarial inputs whose repairs surface new violations, so the loop
//! always terminates.

use crate::config::EngineConfig;
use crate::fixer::{self, FixOutcome};
use crate::permission::PermissionValidator;
use crate::trust::TrustValidator;
use leastiam_core::{
    FormulatedRole, PolicyDocument, PolicyValidationResult, RoleValidationResult, RuleId,
    ValidationOutput, Violation,
};
use std::collections::BTreeSet;

/// Identifies one violation site for the lifetime of a run.
type SkipKey = (RuleId, Option<usize>);

/// Result of a full engine run: the report plus the repaired working copies
/// (what synthesis consumes when the report is valid).
#[derive(Debug, Clone)]
pub struct EngineRun {
    pub output: ValidationOutput,
    pub roles: Vec<FormulatedRole>,
}

/// Composes the validators and the fixer across a whole role set.
pub struct ValidationEngine {
    config: EngineConfig,
}

/// Working state for one role: a mutable copy of the role plus the monotone
/// skip set of each of its policies.
struct RoleWorking {
    role: FormulatedRole,
    trust_skips: BTreeSet<SkipKey>,
    permission_skips: Vec<BTreeSet<SkipKey>>,
}

impl RoleWorking {
    fn new(role: &FormulatedRole) -> Self {
        Self {
            role: role.clone(),
            trust_skips: BTreeSet::new(),
            permission_skips: vec![BTreeSet::new(); role.permission_policies.len()],
        }
    }
}

impl ValidationEngine {
    pub fn new(config: EngineConfig) -> Self {
        // Every rule the validators mark auto-fixable must have a transform;
        // catch a drifted registration at construction, not mid-run.
        for rule in RuleId::AUTO_FIXABLE {
            assert!(
                fixer::has_transform(*rule),
                "no fix transform registered for auto-fixable rule '{rule}'"
            );
        }
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate every role's policies, repairing what can be repaired, until
    /// the set converges or the iteration bound is reached.
    pub fn run(&self, roles: &[FormulatedRole]) -> EngineRun {
        let mut working: Vec<RoleWorking> = roles.iter().map(RoleWorking::new).collect();
        let mut iterations = 0usize;

        loop {
            let snapshot = self.validate_all(&working);
            let actionable = total_actionable(&working, &snapshot);

            if actionable == 0 || iterations >= self.config.max_fix_iterations {
                return EngineRun {
                    output: ValidationOutput::new(snapshot, iterations),
                    roles: working.into_iter().map(|w| w.role).collect(),
                };
            }

            tracing::debug!(iteration = iterations + 1, actionable, "starting fix pass");
            fix_pass(&mut working, &snapshot);
            iterations += 1;
        }
    }

    /// Convenience wrapper returning only the report.
    pub fn validate_and_fix(&self, roles: &[FormulatedRole]) -> ValidationOutput {
        self.run(roles).output
    }

    /// One Validating phase: every policy of every role, independently, with
    /// results assembled in input order (trust first, then permissions).
    fn validate_all(&self, working: &[RoleWorking]) -> Vec<RoleValidationResult> {
        let permission = PermissionValidator::new(&self.config);
        let trust = TrustValidator::new();

        working
            .iter()
            .map(|entry| {
                let role = &entry.role;
                let mut policy_results = Vec::with_capacity(role.permission_policies.len() + 1);
                policy_results.push(trust.validate(
                    &trust_policy_name(role),
                    &role.trust_policy,
                    role.max_session_duration,
                ));
                for draft in &role.permission_policies {
                    policy_results.push(permission.validate(
                        &draft.policy_name,
                        &draft.policy_document,
                        draft.estimated_size_bytes,
                    ));
                }
                RoleValidationResult::new(role.role_name.clone(), policy_results)
            })
            .collect()
    }
}

fn trust_policy_name(role: &FormulatedRole) -> String {
    format!("{}-trust", role.role_name)
}

/// Count violations the next Fixing pass could act on.
fn total_actionable(working: &[RoleWorking], snapshot: &[RoleValidationResult]) -> usize {
    working
        .iter()
        .zip(snapshot)
        .map(|(entry, role_result)| {
            let Some((trust_result, permission_results)) = role_result.policy_results.split_first()
            else {
                return 0;
            };
            let mut count = actionable(&entry.trust_skips, trust_result).count();
            for (skips, result) in entry.permission_skips.iter().zip(permission_results) {
                count += actionable(skips, result).count();
            }
            count
        })
        .sum()
}

fn actionable<'a>(
    skips: &'a BTreeSet<SkipKey>,
    result: &'a PolicyValidationResult,
) -> impl Iterator<Item = &'a Violation> {
    result
        .violations
        .iter()
        .filter(move |v| v.auto_fixable && !skips.contains(&(v.rule_id, v.statement_index)))
}

/// One Fixing phase over every policy with actionable violations.
fn fix_pass(working: &mut [RoleWorking], snapshot: &[RoleValidationResult]) {
    for (entry, role_result) in working.iter_mut().zip(snapshot) {
        let Some((trust_result, permission_results)) = role_result.policy_results.split_first()
        else {
            continue;
        };

        let RoleWorking {
            role,
            trust_skips,
            permission_skips,
        } = entry;

        if let Some((document, session_duration)) =
            fix_document(&role.trust_policy, trust_skips, trust_result)
        {
            role.trust_policy = document;
            if let Some(duration) = session_duration {
                role.max_session_duration = Some(duration);
            }
        }

        for ((draft, skips), result) in role
            .permission_policies
            .iter_mut()
            .zip(permission_skips.iter_mut())
            .zip(permission_results)
        {
            if let Some((document, _)) = fix_document(&draft.policy_document, skips, result) {
                draft.policy_document = document;
                if draft.estimated_size_bytes.is_some() {
                    draft.estimated_size_bytes = Some(draft.policy_document.serialized_size());
                }
            }
        }
    }
}

/// Run the fixer for one policy. Returns the repaired document (and session
/// duration, for trust policies) when anything was applied; skipped
/// violations land in the policy's skip set either way.
fn fix_document(
    document: &PolicyDocument,
    skips: &mut BTreeSet<SkipKey>,
    result: &PolicyValidationResult,
) -> Option<(PolicyDocument, Option<i64>)> {
    let actionable_violations: Vec<Violation> = actionable(skips, result).cloned().collect();
    if actionable_violations.is_empty() {
        return None;
    }

    match fixer::apply_fixes(document, &actionable_violations) {
        FixOutcome::Applied {
            document,
            max_session_duration,
            applied_rules,
            skipped,
        } => {
            tracing::debug!(
                policy = %result.policy_name,
                applied = applied_rules.len(),
                skipped = skipped.len(),
                "fix pass applied repairs"
            );
            for skip in skipped {
                skips.insert((skip.rule_id, skip.statement_index));
            }
            Some((document, max_session_duration))
        }
        FixOutcome::NotApplied { reason, skipped } => {
            tracing::warn!(policy = %result.policy_name, %reason, "fix pass made no changes");
            for skip in skipped {
                skips.insert((skip.rule_id, skip.statement_index));
            }
            None
        }
    }
}
