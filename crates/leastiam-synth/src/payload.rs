//! IAM API payload assembly.

use crate::template::{resolve_document, resolve_str, SynthError};
use leastiam_core::FormulatedRole;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

/// One IAM control-plane call the deployment step will issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IamApiCall {
    pub operation: String,
    pub parameters: serde_json::Value,
}

/// The synthesized call sequence, in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisOutput {
    pub calls: Vec<IamApiCall>,
}

/// Synthesize the IAM calls for a validated role set.
///
/// Per role, in input order: CreateRole, then CreatePolicy followed by
/// AttachRolePolicy for each permission policy. Policy ARNs are derived
/// from the `account_id` template variable, which is therefore required.
pub fn synthesize(
    roles: &[FormulatedRole],
    vars: &BTreeMap<String, String>,
) -> Result<SynthesisOutput, SynthError> {
    let account_id = vars
        .get("account_id")
        .ok_or_else(|| SynthError::UnresolvedVariable("account_id".to_string()))?;

    let mut calls = Vec::new();
    for role in roles {
        let role_name = resolve_str(&role.role_name, vars)?;
        let trust = resolve_document(&role.trust_policy, vars)?;

        let mut parameters = json!({
            "RoleName": role_name,
            "Path": resolve_str(&role.role_path, vars)?,
            "AssumeRolePolicyDocument": serde_json::to_string(&trust)?,
        });
        if let Some(description) = &role.description {
            parameters["Description"] = json!(description);
        }
        if let Some(duration) = role.max_session_duration {
            parameters["MaxSessionDuration"] = json!(duration);
        }
        if let Some(boundary) = &role.permission_boundary_arn {
            parameters["PermissionsBoundary"] = json!(resolve_str(boundary, vars)?);
        }
        calls.push(IamApiCall {
            operation: "CreateRole".to_string(),
            parameters,
        });

        for draft in &role.permission_policies {
            let policy_name = resolve_str(&draft.policy_name, vars)?;
            let document = resolve_document(&draft.policy_document, vars)?;

            calls.push(IamApiCall {
                operation: "CreatePolicy".to_string(),
                parameters: json!({
                    "PolicyName": policy_name,
                    "PolicyDocument": serde_json::to_string(&document)?,
                }),
            });
            calls.push(IamApiCall {
                operation: "AttachRolePolicy".to_string(),
                parameters: json!({
                    "RoleName": role_name,
                    "PolicyArn": format!("arn:aws:iam::{account_id}:policy/{policy_name}"),
                }),
            });
        }
    }

    Ok(SynthesisOutput { calls })
}
