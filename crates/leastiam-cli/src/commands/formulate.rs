//! `leastiam formulate` command implementation.

use anyhow::{Context, Result};
use leastiam_formulate::FormulateOptions;
use std::path::Path;

pub fn run(
    file: &Path,
    role_name: &str,
    account_id: Option<String>,
    region: Option<String>,
) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let changes = leastiam_plan::parse_plan(&raw).context("failed to parse terraform plan")?;

    let options = FormulateOptions {
        role_name: role_name.to_string(),
        account_id,
        region,
        ..Default::default()
    };
    let output = leastiam_formulate::formulate(&changes, &options)
        .context("failed to formulate IAM roles")?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
