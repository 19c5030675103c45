//! Policy formulation: resource-change records -> draft IAM roles.
//!
//! The formulator drafts one deployment role per plan. Actions are grouped
//! by IAM service; scopable actions are bound to the catalog's ARN patterns
//! while unscoped actions get their own `Resource: "*"` statement so the
//! validator does not flag a legitimate wildcard.
//!
//! Output is fully deterministic: services, actions, and ARN patterns are
//! emitted in sorted order, and statement identifiers are derived from the
//! service name.

use leastiam_actions::{ActionCatalog, CatalogEntry};
use leastiam_core::{
    Effect, FormulatedRole, FormulationOutput, PolicyDocument, PolicyDraft, Principal, Statement,
    StringList, POLICY_LANGUAGE_VERSION,
};
use leastiam_plan::{ChangeAction, ResourceChange};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors raised during formulation.
#[derive(Debug, Error)]
pub enum FormulateError {
    #[error("no resource change requires IAM permissions (all entries unknown or read-only)")]
    NoActionableChanges,
}

/// Options shaping the formulated role.
#[derive(Debug, Clone)]
pub struct FormulateOptions {
    pub role_name: String,
    pub role_path: String,
    pub max_session_duration: i64,
    pub permission_boundary_arn: Option<String>,
    /// Fills `template_variables.account_id` when present.
    pub account_id: Option<String>,
    /// Fills `template_variables.region` when present.
    pub region: Option<String>,
}

impl Default for FormulateOptions {
    fn default() -> Self {
        Self {
            role_name: "terraform-deployer".to_string(),
            role_path: "/".to_string(),
            max_session_duration: 3600,
            permission_boundary_arn: None,
            account_id: None,
            region: None,
        }
    }
}

/// Accumulated grants for one IAM service.
#[derive(Debug, Default)]
struct ServiceGrant {
    scoped_actions: BTreeSet<String>,
    arn_patterns: BTreeSet<String>,
    unscoped_actions: BTreeSet<String>,
}

/// Formulate draft IAM roles for a set of resource changes.
pub fn formulate(
    changes: &[ResourceChange],
    options: &FormulateOptions,
) -> Result<FormulationOutput, FormulateError> {
    let catalog = ActionCatalog::builtin();
    let mut grants: BTreeMap<String, ServiceGrant> = BTreeMap::new();

    for change in changes {
        let Some(entry) = catalog.lookup(&change.resource_type) else {
            tracing::warn!(
                resource_type = %change.resource_type,
                address = %change.address,
                "no catalog entry for resource type; skipped"
            );
            continue;
        };
        accumulate(&mut grants, entry, &change.actions);
    }

    if grants.is_empty() {
        return Err(FormulateError::NoActionableChanges);
    }

    let permission_policies = grants
        .iter()
        .map(|(service, grant)| permission_policy(&options.role_name, service, grant))
        .collect();

    let role = FormulatedRole {
        role_name: options.role_name.clone(),
        role_path: options.role_path.clone(),
        description: Some("Least-privilege deployment role derived from the Terraform plan".to_string()),
        max_session_duration: Some(options.max_session_duration),
        permission_boundary_arn: options.permission_boundary_arn.clone(),
        trust_policy: trust_policy(),
        permission_policies,
    };

    let mut template_variables = BTreeMap::new();
    if let Some(account_id) = &options.account_id {
        template_variables.insert("account_id".to_string(), account_id.clone());
    }
    if let Some(region) = &options.region {
        template_variables.insert("region".to_string(), region.clone());
    }

    Ok(FormulationOutput {
        roles: vec![role],
        template_variables,
    })
}

/// Fold one catalog entry's actions into the per-service grants.
fn accumulate(grants: &mut BTreeMap<String, ServiceGrant>, entry: &CatalogEntry, actions: &[ChangeAction]) {
    let grant = grants.entry(entry.service.clone()).or_default();

    let mut needed: BTreeSet<&str> = entry.read.iter().map(String::as_str).collect();
    for action in actions {
        let kind_actions = match action {
            ChangeAction::Create => &entry.create,
            ChangeAction::Update => &entry.update,
            ChangeAction::Delete => &entry.delete,
            ChangeAction::NoOp | ChangeAction::Read => continue,
        };
        needed.extend(kind_actions.iter().map(String::as_str));
    }

    let mut granted_scopable = false;
    for action in needed {
        if leastiam_actions::is_unscoped(action) {
            grant.unscoped_actions.insert(action.to_string());
        } else {
            grant.scoped_actions.insert(action.to_string());
            granted_scopable = true;
        }
    }
    if granted_scopable {
        grant
            .arn_patterns
            .extend(entry.resource_arn_patterns.iter().cloned());
    }
}

/// Build the permission policy for one service's grants.
fn permission_policy(role_name: &str, service: &str, grant: &ServiceGrant) -> PolicyDraft {
    let mut statements = Vec::new();

    if !grant.scoped_actions.is_empty() {
        // A catalog entry with scopable actions always supplies patterns; the
        // "*" fallback is left for the validator to flag rather than hidden.
        let resources: Vec<String> = if grant.arn_patterns.is_empty() {
            vec!["*".to_string()]
        } else {
            grant.arn_patterns.iter().cloned().collect()
        };
        statements.push(Statement {
            sid: Some(format!("{}Access", pascal_case(service))),
            effect: Effect::Allow,
            action: StringList::Many(grant.scoped_actions.iter().cloned().collect()),
            resource: Some(StringList::Many(resources)),
            principal: None,
            condition: None,
        });
    }

    if !grant.unscoped_actions.is_empty() {
        statements.push(Statement {
            sid: Some(format!("{}AccountLevel", pascal_case(service))),
            effect: Effect::Allow,
            action: StringList::Many(grant.unscoped_actions.iter().cloned().collect()),
            resource: Some(StringList::One("*".to_string())),
            principal: None,
            condition: None,
        });
    }

    let policy_document = PolicyDocument {
        version: Some(POLICY_LANGUAGE_VERSION.to_string()),
        statement: statements,
    };
    let estimated_size_bytes = Some(policy_document.serialized_size());

    PolicyDraft {
        policy_name: format!("{role_name}-{service}"),
        policy_document,
        estimated_size_bytes,
    }
}

/// The deployment role trusts the owning account; the concrete account id is
/// a template variable resolved at synthesis time.
fn trust_policy() -> PolicyDocument {
    let mut principal = BTreeMap::new();
    principal.insert(
        "AWS".to_string(),
        StringList::One("arn:aws:iam::${account_id}:root".to_string()),
    );

    PolicyDocument {
        version: Some(POLICY_LANGUAGE_VERSION.to_string()),
        statement: vec![Statement {
            sid: Some("DeployerAssumeRole".to_string()),
            effect: Effect::Allow,
            action: StringList::One("sts:AssumeRole".to_string()),
            resource: None,
            principal: Some(Principal::Entries(principal)),
            condition: None,
        }],
    }
}

fn pascal_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut upper_next = true;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if upper_next {
                out.extend(c.to_uppercase());
                upper_next = false;
            } else {
                out.push(c);
            }
        } else {
            upper_next = true;
        }
    }
    out
}
