//! Deployment template variable resolution.

use leastiam_core::PolicyDocument;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors raised during synthesis.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("unresolved template variable '${{{0}}}'")]
    UnresolvedVariable(String),

    #[error("failed to serialize policy document: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("placeholder pattern must compile")
    })
}

/// Substitute every `${name}` placeholder in `input`.
pub fn resolve_str(input: &str, vars: &BTreeMap<String, String>) -> Result<String, SynthError> {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for caps in placeholder().captures_iter(input) {
        let Some(whole) = caps.get(0) else { continue };
        let name = &caps[1];
        let Some(value) = vars.get(name) else {
            return Err(SynthError::UnresolvedVariable(name.to_string()));
        };
        out.push_str(&input[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&input[last..]);
    Ok(out)
}

/// Substitute placeholders in every string of a JSON value, keys included.
pub fn resolve_value(value: &Value, vars: &BTreeMap<String, String>) -> Result<Value, SynthError> {
    match value {
        Value::String(s) => Ok(Value::String(resolve_str(s, vars)?)),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_value(item, vars))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                out.insert(resolve_str(key, vars)?, resolve_value(item, vars)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

/// Resolve placeholders across a whole policy document.
pub fn resolve_document(
    document: &PolicyDocument,
    vars: &BTreeMap<String, String>,
) -> Result<PolicyDocument, SynthError> {
    let value = serde_json::to_value(document)?;
    let resolved = resolve_value(&value, vars)?;
    Ok(serde_json::from_value(resolved)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("account_id".to_string(), "123456789012".to_string()),
            ("region".to_string(), "eu-west-1".to_string()),
        ])
    }

    #[test]
    fn resolves_multiple_placeholders_in_one_string() {
        let resolved = resolve_str("arn:aws:sqs:${region}:${account_id}:*", &vars())
            .expect("must resolve");
        assert_eq!(resolved, "arn:aws:sqs:eu-west-1:123456789012:*");
    }

    #[test]
    fn strings_without_placeholders_pass_through() {
        let resolved = resolve_str("arn:aws:s3:::bucket/*", &vars()).expect("must resolve");
        assert_eq!(resolved, "arn:aws:s3:::bucket/*");
    }

    #[test]
    fn unresolved_placeholder_names_the_variable() {
        let err = resolve_str("arn:aws:iam::${account_id}:role/${role_suffix}", &vars())
            .expect_err("must fail");
        let SynthError::UnresolvedVariable(name) = err else {
            panic!("wrong error kind");
        };
        assert_eq!(name, "role_suffix");
    }

    #[test]
    fn resolves_nested_json_values() {
        let value = json!({
            "Resource": ["arn:aws:dynamodb:${region}:${account_id}:table/*"],
            "Count": 3
        });
        let resolved = resolve_value(&value, &vars()).expect("must resolve");
        assert_eq!(
            resolved["Resource"][0],
            json!("arn:aws:dynamodb:eu-west-1:123456789012:table/*")
        );
        assert_eq!(resolved["Count"], json!(3));
    }

    #[test]
    fn resolves_documents_end_to_end() {
        let document: PolicyDocument = serde_json::from_value(json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Sid": "AssumeRole",
                "Effect": "Allow",
                "Action": "sts:AssumeRole",
                "Principal": {"AWS": "arn:aws:iam::${account_id}:root"}
            }]
        }))
        .expect("document must parse");

        let resolved = resolve_document(&document, &vars()).expect("must resolve");
        let text = serde_json::to_string(&resolved).expect("must serialize");
        assert!(!text.contains("${"), "no placeholder survives resolution");
        assert!(text.contains("arn:aws:iam::123456789012:root"));
    }
}
