use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use manifest_verify::{ManifestResult, any_errors, init_logging, validate_path};

/// Check operator manifests for missing fields and unmatched examples
#[derive(Debug, Parser)]
#[command(name = "manifest-verify")]
#[command(version = manifest_verify::VERSION)]
struct Cli {
    /// Manifest files or package directories
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(results) if any_errors(&results) => ExitCode::from(1),
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<Vec<ManifestResult>> {
    let mut results = Vec::new();
    for path in &cli.paths {
        let batch =
            validate_path(path).with_context(|| format!("validating {}", path.display()))?;
        results.extend(batch);
    }

    match cli.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Text => print_text(&results),
    }
    Ok(results)
}

fn print_text(results: &[ManifestResult]) {
    for result in results {
        let status = if result.has_errors() { "FAIL" } else { "PASS" };
        println!(
            "{status} {} ({} errors, {} warnings)",
            result.name,
            result.errors.len(),
            result.warnings.len()
        );
        for error in &result.errors {
            println!("  error: {error}");
        }
        for warning in &result.warnings {
            println!("  warning: {warning}");
        }
    }
}
