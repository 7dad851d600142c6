//! Benchmark Run Command

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use kaibench::playwright::PlaywrightSession;
use kaibench::runner::{OutcomeKind, QuestionOutcome};
use kaibench::{BenchConfig, BenchmarkRunner, ChatCompletionValidator, QuestionBank, QuestionKey, RunConfig};

use crate::output::{mark, print_list, print_success, print_summary, print_warning, truncate, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct RunArgs {
    /// Configuration file
    #[arg(short, long, default_value = "kaibench.toml")]
    pub config: PathBuf,

    /// Start page of the tenant under test
    #[arg(long, env = "TENANT_URL")]
    pub tenant_url: Option<String>,

    /// CSV file results are appended to
    #[arg(short, long, env = "KAI_RESULTS_FILE")]
    pub output: Option<PathBuf>,

    /// Question keys to ask, comma-separated (default: whole bank)
    #[arg(short, long, value_delimiter = ',')]
    pub questions: Vec<String>,

    /// YAML question bank
    #[arg(long)]
    pub question_bank: Option<PathBuf>,

    /// Run the browser headless
    #[arg(long)]
    pub headless: Option<bool>,
}

impl RunArgs {
    /// Layer command-line values over the file configuration.
    fn apply(&self, config: &mut BenchConfig) {
        if let Some(url) = &self.tenant_url {
            config.tenant_url = url.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(bank) = &self.question_bank {
            config.question_bank = bank.clone();
        }
        if let Some(headless) = self.headless {
            config.browser.headless = headless;
        }
        let keys: Vec<QuestionKey> = self
            .questions
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(QuestionKey::new)
            .collect();
        if !keys.is_empty() {
            config.questions = keys;
        }
    }
}

/// Outcome display wrapper for serialization
#[derive(Serialize)]
pub struct OutcomeDisplay {
    pub key: String,
    pub question: String,
    pub accurate: bool,
    pub response_secs: f64,
    pub outcome: OutcomeKind,
    pub reason: String,
}

impl From<&QuestionOutcome> for OutcomeDisplay {
    fn from(outcome: &QuestionOutcome) -> Self {
        Self {
            key: outcome.query.question_key.to_string(),
            question: outcome.query.question_text.clone(),
            accurate: outcome.verdict.is_accurate,
            response_secs: outcome.query.elapsed_secs,
            outcome: outcome.kind,
            reason: outcome.verdict.reason.clone(),
        }
    }
}

impl TableDisplay for OutcomeDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Key", "Question", "Accurate", "Time", "Outcome", "Reason"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.key.clone(),
            truncate(&self.question, 60),
            mark(self.accurate),
            format!("{:.2}s", self.response_secs),
            format!("{:?}", self.outcome),
            truncate(&self.reason, 80),
        ]
    }
}

pub async fn execute(args: RunArgs, format: OutputFormat) -> Result<()> {
    let mut config = BenchConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    args.apply(&mut config);
    config.validate()?;

    let bank = QuestionBank::load(&config.question_bank)
        .with_context(|| format!("loading question bank {}", config.question_bank.display()))?;
    let run_config = RunConfig::resolve(&config, &bank)?;
    let validator = ChatCompletionValidator::from_config(&config.validator)?;

    let session = PlaywrightSession::launch(&config).await?;
    let runner = BenchmarkRunner::new(run_config, session, validator);
    let result = runner.run().await;

    if let Err(e) = runner.into_page().close().await {
        warn!("Browser did not shut down cleanly: {}", e);
    }
    let report = result?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            let rows: Vec<OutcomeDisplay> = report.outcomes.iter().map(OutcomeDisplay::from).collect();
            print_list(&rows, format);
            print_summary(&report.summary, format);

            let unfinished = report
                .outcomes
                .iter()
                .filter(|o| matches!(o.kind, OutcomeKind::TimedOut | OutcomeKind::NotAsked))
                .count();
            if unfinished > 0 {
                print_warning(&format!("{} question(s) timed out or were not asked", unfinished));
            }
            print_success(&format!("Results appended to {}", config.output_path.display()));
        }
    }

    info!("Run complete");
    Ok(())
}
