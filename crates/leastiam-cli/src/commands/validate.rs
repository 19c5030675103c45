//! `leastiam validate` command implementation.
//!
//! Prints the full JSON report to stdout in every case; the summary warning
//! line and the non-zero exit are reserved for invalid role sets.

use anyhow::Result;
use leastiam_validate::{EngineConfig, ValidationEngine};
use std::path::Path;

use super::input;

pub fn run(file: &Path) -> Result<()> {
    let formulation = input::load_formulation_output(file)?;

    let engine = ValidationEngine::new(EngineConfig::default());
    let run = engine.run(&formulation.roles);

    println!("{}", serde_json::to_string_pretty(&run.output)?);

    if !run.output.valid {
        eprintln!(
            "Validation found {} error(s) and {} warning(s)",
            run.output.total_errors(),
            run.output.total_warnings()
        );
        std::process::exit(1);
    }

    Ok(())
}
