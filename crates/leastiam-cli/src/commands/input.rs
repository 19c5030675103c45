//! Input loading shared by the validate and synthesize commands.
//!
//! Formulation output is untrusted JSON from disk: it is parsed, stripped of
//! prototype-polluting keys, checked against the embedded JSON schema, and
//! only then deserialized into the typed model.

use anyhow::{Context, Result};
use leastiam_core::FormulationOutput;
use serde_json::Value;
use std::path::Path;

/// Embedded JSON schema for the formulation output shape.
/// Compiled into the binary so validation works without external files.
const FORMULATION_OUTPUT_SCHEMA: &str =
    include_str!("../../../../schemas/FormulationOutput.schema.json");

/// Keys stripped from untrusted JSON before deserialization.
const UNSAFE_KEYS: &[&str] = &["__proto__", "constructor", "prototype"];

/// Load, sanitize, schema-check, and deserialize a formulation output file.
pub fn load_formulation_output(path: &Path) -> Result<FormulationOutput> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut value: Value =
        serde_json::from_slice(&bytes).context("formulation output is not valid JSON")?;

    strip_unsafe_keys(&mut value);
    validate_against_schema(&value)?;

    serde_json::from_value(value).context("formulation output does not match the expected shape")
}

/// Remove keys that could trigger prototype pollution in permissive
/// deserializers downstream. Stripped silently; never reaches the engine.
pub fn strip_unsafe_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in UNSAFE_KEYS {
                map.remove(*key);
            }
            for (_, nested) in map.iter_mut() {
                strip_unsafe_keys(nested);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_unsafe_keys(item);
            }
        }
        _ => {}
    }
}

fn validate_against_schema(value: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(FORMULATION_OUTPUT_SCHEMA)
        .context("failed to parse embedded formulation schema")?;
    let validator = jsonschema::validator_for(&schema)
        .context("failed to compile embedded formulation schema")?;

    // Keep output readable: show up to 10 errors
    let mut messages = Vec::new();
    for (idx, error) in validator.iter_errors(value).take(10).enumerate() {
        let path = error.instance_path().to_string();
        let location = if path.is_empty() { "(root)".to_string() } else { path };
        messages.push(format!("{}: {} at {}", idx + 1, error, location));
    }

    if messages.is_empty() {
        Ok(())
    } else {
        anyhow::bail!(
            "formulation output failed schema validation: {}",
            messages.join("; ")
        )
    }
}
