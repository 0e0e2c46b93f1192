use std::path::PathBuf;

use clap::Parser;

use api_spec_resolver::pipeline::{self, PipelineConfig};
use api_spec_resolver::rules::{FailureThreshold, Severity};

/// API contract pipeline: validates two revisions of an OpenAPI document
/// against a custom rule file, then writes a fully dereferenced copy of
/// each.
#[derive(Parser, Debug)]
#[command(name = "api-spec-resolver", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Validate both documents against a rule file, then resolve them.
    Check(CheckArgs),
    /// Resolve references in both documents without validating.
    Resolve(ResolveArgs),
}

#[derive(clap::Args, Debug)]
struct CheckArgs {
    /// Path to the old revision of the OpenAPI document.
    old: PathBuf,
    /// Path to the new revision of the OpenAPI document.
    new: PathBuf,
    /// Path to the YAML rule file.
    rules: PathBuf,
    /// Fail only on findings at or above this severity. Without it, any
    /// finding fails the run regardless of severity.
    #[arg(long, value_name = "SEVERITY")]
    fail_severity: Option<Severity>,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(clap::Args, Debug)]
struct ResolveArgs {
    /// Path to the old revision of the OpenAPI document.
    old: PathBuf,
    /// Path to the new revision of the OpenAPI document.
    new: PathBuf,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(clap::Args, Debug)]
struct CommonArgs {
    /// Follow $ref targets in relative local files.
    #[arg(long)]
    allow_file_refs: bool,
    /// Directory the resolved documents are written to.
    #[arg(long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,
}

impl Cli {
    fn into_pipeline_config(self) -> PipelineConfig {
        match self.command {
            Commands::Check(args) => {
                let mut config = PipelineConfig::new(args.old, args.new);
                config.rules_path = Some(args.rules);
                config.fail_threshold = match args.fail_severity {
                    Some(severity) => FailureThreshold::AtLeast(severity),
                    None => FailureThreshold::AnyFinding,
                };
                config.allow_file_refs = args.common.allow_file_refs;
                config.out_dir = args.common.out_dir;
                config
            }
            Commands::Resolve(args) => {
                let mut config = PipelineConfig::new(args.old, args.new);
                config.allow_file_refs = args.common.allow_file_refs;
                config.out_dir = args.common.out_dir;
                config
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let validating = matches!(cli.command, Commands::Check(_));
    let config = cli.into_pipeline_config();

    println!("=== API Spec Resolver ===\n");

    let report = match pipeline::run(&config) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("✗ {err}");
            std::process::exit(1);
        }
    };

    if validating {
        println!("✓ Both documents validated");
    }
    for output in &report.outputs {
        println!("✓ Resolved document written: {}", output.display());
    }
    for cycle in report.old_cycles.iter().chain(&report.new_cycles) {
        println!("! Cyclic reference left unexpanded: {cycle}");
    }

    Ok(())
}
