use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "leastiam", version, about = "Least-privilege IAM policies from deployment plans")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Formulate draft IAM roles from a Terraform plan JSON file
    Formulate {
        /// Path to the plan JSON (terraform show -json plan.out)
        file: PathBuf,

        /// Name for the formulated deployment role
        #[arg(long, default_value = "terraform-deployer")]
        role_name: String,

        /// AWS account id recorded in template_variables
        #[arg(long)]
        account_id: Option<String>,

        /// AWS region recorded in template_variables
        #[arg(long)]
        region: Option<String>,
    },

    /// Validate formulated policies, applying automatic repairs
    Validate {
        /// Path to the formulation output JSON
        file: PathBuf,
    },

    /// Validate, then synthesize the IAM API calls for a role set
    Synthesize {
        /// Path to the formulation output JSON
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Formulate {
            file,
            role_name,
            account_id,
            region,
        } => commands::formulate::run(&file, &role_name, account_id, region),

        Command::Validate { file } => commands::validate::run(&file),

        Command::Synthesize { file } => commands::synthesize::run(&file),
    }
}
