//! IAM policy document model.
//!
//! Documents are treated as immutable values: every transformation clones
//! and returns a new document rather than mutating in place. The serde
//! shapes mirror IAM's JSON, including its string-or-list flexibility for
//! `Action`, `Resource`, and principal identifiers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single string or a list of strings, as IAM JSON allows for `Action`,
/// `Resource`, and principal identifier values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    One(String),
    Many(Vec<String>),
}

impl StringList {
    /// Number of entries.
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate the entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice = match self {
            Self::One(item) => std::slice::from_ref(item),
            Self::Many(items) => items.as_slice(),
        };
        slice.iter().map(String::as_str)
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.iter().any(|entry| entry == needle)
    }

    pub fn first(&self) -> Option<&str> {
        self.iter().next()
    }
}

impl From<&str> for StringList {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<String> for StringList {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<Vec<String>> for StringList {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values)
    }
}

/// Statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// The `Principal` element of a trust policy statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Principal {
    /// Bare principal string; IAM only accepts `"*"` in this position.
    Wildcard(String),
    /// Map of principal type (`AWS`, `Service`, `Federated`) to identifiers.
    Entries(BTreeMap<String, StringList>),
}

impl Principal {
    /// True when the principal grants assume-role to anyone, either as a
    /// top-level `"*"` or as a `"*"` entry under any principal type.
    pub fn is_wildcard(&self) -> bool {
        match self {
            Self::Wildcard(value) => value == "*",
            Self::Entries(map) => map.values().any(|ids| ids.contains("*")),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Entries(map) if map.is_empty())
    }

    /// Federated identity providers named by this principal.
    pub fn federated_providers(&self) -> Vec<&str> {
        match self {
            Self::Wildcard(_) => Vec::new(),
            Self::Entries(map) => map
                .get("Federated")
                .map(|ids| ids.iter().collect())
                .unwrap_or_default(),
        }
    }
}

/// `Condition` block: operator -> condition key -> expected value(s).
pub type ConditionMap = BTreeMap<String, BTreeMap<String, serde_json::Value>>;

/// One statement of a trust or permission policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(rename = "Sid", default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    #[serde(rename = "Effect")]
    pub effect: Effect,

    #[serde(rename = "Action")]
    pub action: StringList,

    /// Resource targets; permission documents only.
    #[serde(rename = "Resource", default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<StringList>,

    /// Who may assume the role; trust documents only.
    #[serde(rename = "Principal", default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,

    #[serde(rename = "Condition", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionMap>,
}

impl Statement {
    /// True when `Resource` contains the bare `"*"` target.
    pub fn has_wildcard_resource(&self) -> bool {
        self.resource
            .as_ref()
            .map(|resource| resource.contains("*"))
            .unwrap_or(false)
    }
}

/// An IAM policy document (trust or permission).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(rename = "Statement", default)]
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    /// Sum of action entries across all statements, counting each list entry.
    pub fn total_actions(&self) -> usize {
        self.statement.iter().map(|s| s.action.len()).sum()
    }

    /// Serialized size of the compact JSON form, in bytes.
    pub fn serialized_size(&self) -> usize {
        serde_json::to_vec(self).map(|bytes| bytes.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn statement_accepts_single_action_string() {
        let statement: Statement = serde_json::from_value(json!({
            "Effect": "Allow",
            "Action": "s3:GetObject",
            "Resource": ["arn:aws:s3:::my-bucket/*"]
        }))
        .expect("statement must parse");

        assert_eq!(statement.action.len(), 1);
        assert_eq!(statement.action.first(), Some("s3:GetObject"));
        assert!(!statement.has_wildcard_resource());
    }

    #[test]
    fn wildcard_resource_detected_in_list() {
        let statement: Statement = serde_json::from_value(json!({
            "Effect": "Allow",
            "Action": ["s3:GetObject"],
            "Resource": ["arn:aws:s3:::my-bucket/*", "*"]
        }))
        .expect("statement must parse");

        assert!(statement.has_wildcard_resource());
    }

    #[test]
    fn principal_wildcard_forms() {
        let bare: Principal = serde_json::from_value(json!("*")).expect("must parse");
        assert!(bare.is_wildcard());

        let federated: Principal =
            serde_json::from_value(json!({"Federated": "*"})).expect("must parse");
        assert!(federated.is_wildcard());

        let pinned: Principal =
            serde_json::from_value(json!({"AWS": "arn:aws:iam::123456789012:root"}))
                .expect("must parse");
        assert!(!pinned.is_wildcard());
        assert!(pinned.federated_providers().is_empty());
    }

    #[test]
    fn federated_providers_listed() {
        let principal: Principal = serde_json::from_value(json!({
            "Federated": ["token.actions.githubusercontent.com"]
        }))
        .expect("must parse");

        assert_eq!(
            principal.federated_providers(),
            vec!["token.actions.githubusercontent.com"]
        );
    }

    #[test]
    fn document_round_trips_without_optional_fields() {
        let document = PolicyDocument {
            version: Some(crate::limits::POLICY_LANGUAGE_VERSION.to_string()),
            statement: vec![Statement {
                sid: None,
                effect: Effect::Allow,
                action: StringList::from("sts:AssumeRole"),
                resource: None,
                principal: None,
                condition: None,
            }],
        };

        let value = serde_json::to_value(&document).expect("must serialize");
        assert_eq!(value["Statement"][0].get("Sid"), None);
        assert_eq!(value["Statement"][0].get("Resource"), None);

        let back: PolicyDocument = serde_json::from_value(value).expect("must parse");
        assert_eq!(back, document);
    }

    #[test]
    fn total_actions_counts_list_entries() {
        let document: PolicyDocument = serde_json::from_value(json!({
            "Version": "2012-10-17",
            "Statement": [
                {"Effect": "Allow", "Action": ["s3:GetObject", "s3:PutObject"], "Resource": "*"},
                {"Effect": "Allow", "Action": "s3:ListBucket", "Resource": "*"}
            ]
        }))
        .expect("document must parse");

        assert_eq!(document.total_actions(), 3);
        assert!(document.serialized_size() > 0);
    }
}
