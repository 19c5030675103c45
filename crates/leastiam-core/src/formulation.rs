//! Formulated-role input model.
//!
//! This is the persisted shape the upstream formulator emits and the
//! validation engine consumes. Keep it stable; the JSON schema in
//! `schemas/FormulationOutput.schema.json` mirrors it.

use crate::document::PolicyDocument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The formulator's full output: draft roles plus the deployment template
/// variables their documents reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulationOutput {
    pub roles: Vec<FormulatedRole>,
    #[serde(default)]
    pub template_variables: BTreeMap<String, String>,
}

/// One draft role: a trust policy and its permission policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulatedRole {
    pub role_name: String,

    #[serde(default = "default_role_path")]
    pub role_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Requested session duration in seconds; validated against IAM bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_session_duration: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_boundary_arn: Option<String>,

    pub trust_policy: PolicyDocument,

    #[serde(default)]
    pub permission_policies: Vec<PolicyDraft>,
}

fn default_role_path() -> String {
    "/".to_string()
}

/// One draft permission policy with its accompanying size estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDraft {
    pub policy_name: String,
    pub policy_document: PolicyDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_size_bytes: Option<usize>,
}
