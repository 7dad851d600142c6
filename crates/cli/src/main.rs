//! kaibench CLI - Main Entry Point
//!
//! Runs the Kai benchmark against a tenant and summarizes existing result
//! files.

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{report, run};

/// kaibench - accuracy and latency benchmark for the Kai assistant
#[derive(Parser)]
#[command(name = "kaibench")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the configured questions and append results to the sink
    Run(run::RunArgs),

    /// Summarize an existing result file
    Report(report::ReportArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => run::execute(args, cli.format).await?,
        Commands::Report(args) => report::execute(args, cli.format)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "kaibench",
            "--format",
            "json",
            "run",
            "--tenant-url",
            "https://tenant.example.com",
            "--questions",
            "Q1,Q5",
            "--headless",
            "false",
        ])
        .unwrap();

        assert!(matches!(cli.format, output::OutputFormat::Json));
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.tenant_url.as_deref(), Some("https://tenant.example.com"));
        assert_eq!(args.questions, vec!["Q1".to_string(), "Q5".to_string()]);
        assert_eq!(args.headless, Some(false));
    }

    #[test]
    fn report_takes_input_path() {
        let cli = Cli::try_parse_from(["kaibench", "report", "--input", "out/results.csv"]).unwrap();
        let Commands::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.input, std::path::PathBuf::from("out/results.csv"));
    }
}
