//! `leastiam synthesize` command implementation.
//!
//! Runs the same validate-and-fix orchestration as `validate`; payload
//! synthesis only happens when the repaired role set is fully valid.

use anyhow::{Context, Result};
use leastiam_validate::{EngineConfig, ValidationEngine};
use std::path::Path;

use super::input;

pub fn run(file: &Path) -> Result<()> {
    let formulation = input::load_formulation_output(file)?;

    let engine = ValidationEngine::new(EngineConfig::default());
    let run = engine.run(&formulation.roles);

    if !run.output.valid {
        println!("{}", serde_json::to_string_pretty(&run.output)?);
        eprintln!(
            "Validation found {} error(s) and {} warning(s)",
            run.output.total_errors(),
            run.output.total_warnings()
        );
        std::process::exit(1);
    }

    let synthesis = leastiam_synth::synthesize(&run.roles, &formulation.template_variables)
        .context("failed to synthesize IAM calls")?;

    println!("{}", serde_json::to_string_pretty(&synthesis)?);
    Ok(())
}
