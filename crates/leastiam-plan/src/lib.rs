//! Terraform plan ingestion.
//!
//! Reads the JSON representation of a Terraform plan (`terraform show -json
//! plan.out`) and reduces its `resource_changes` to the records the
//! formulator consumes. No-op and pure-read changes carry no IAM weight and
//! are dropped here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading a Terraform plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("terraform plan is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("terraform plan has no resource_changes array")]
    MissingResourceChanges,
}

/// One change action from a plan's `change.actions` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeAction {
    NoOp,
    Create,
    Read,
    Update,
    Delete,
}

impl ChangeAction {
    /// True when the action mutates infrastructure and therefore needs IAM
    /// permissions beyond read access.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

/// One resource whose planned changes require IAM permissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceChange {
    /// Full resource address, e.g. `module.storage.aws_s3_bucket.artifacts`.
    pub address: String,
    /// Terraform resource type, e.g. `aws_s3_bucket`.
    pub resource_type: String,
    /// The mutating change actions, in plan order.
    pub actions: Vec<ChangeAction>,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    resource_changes: Option<Vec<RawResourceChange>>,
}

#[derive(Debug, Deserialize)]
struct RawResourceChange {
    address: String,
    #[serde(rename = "type")]
    resource_type: String,
    change: RawChange,
}

#[derive(Debug, Deserialize)]
struct RawChange {
    actions: Vec<ChangeAction>,
}

/// Parse a Terraform plan JSON document into resource-change records.
///
/// Entries whose actions are all no-op or read are dropped; an entry that
/// mixes read with a mutation keeps only the mutating actions.
pub fn parse_plan(input: &str) -> Result<Vec<ResourceChange>, PlanError> {
    let raw: RawPlan = serde_json::from_str(input)?;
    let changes = raw
        .resource_changes
        .ok_or(PlanError::MissingResourceChanges)?;

    let mut records = Vec::new();
    for change in changes {
        let actions: Vec<ChangeAction> = change
            .change
            .actions
            .into_iter()
            .filter(ChangeAction::is_mutation)
            .collect();

        if actions.is_empty() {
            tracing::debug!(address = %change.address, "skipping resource change with no mutations");
            continue;
        }

        records.push(ResourceChange {
            address: change.address,
            resource_type: change.resource_type,
            actions,
        });
    }

    Ok(records)
}
