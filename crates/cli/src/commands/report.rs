//! Result File Report Command

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use kaibench::recorder::summarize_records;
use kaibench::{CsvRecorder, ResultRecord};

use crate::output::{mark, print_list, print_summary, truncate, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct ReportArgs {
    /// CSV result file to summarize
    #[arg(short, long, env = "KAI_RESULTS_FILE", default_value = "Kai_Test_Results.csv")]
    pub input: PathBuf,
}

/// Result row display wrapper
#[derive(Serialize)]
pub struct RecordDisplay {
    pub timestamp: String,
    pub question: String,
    pub accurate: bool,
    pub response_secs: f64,
}

impl From<&ResultRecord> for RecordDisplay {
    fn from(record: &ResultRecord) -> Self {
        Self {
            timestamp: record.timestamp.clone(),
            question: record.question.clone(),
            accurate: record.is_accurate,
            response_secs: record.elapsed_secs,
        }
    }
}

impl TableDisplay for RecordDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["DateTime", "Question", "Accurate", "Time"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            truncate(&self.question, 70),
            mark(self.accurate),
            format!("{:.2}s", self.response_secs),
        ]
    }
}

pub fn execute(args: ReportArgs, format: OutputFormat) -> Result<()> {
    let records = CsvRecorder::new(&args.input)
        .read_all()
        .with_context(|| format!("reading {}", args.input.display()))?;
    let summary = summarize_records(&records)
        .with_context(|| format!("{} has no results", args.input.display()))?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Table => {
            let rows: Vec<RecordDisplay> = records.iter().map(RecordDisplay::from).collect();
            print_list(&rows, format);
            print_summary(&summary, format);
        }
        OutputFormat::Plain => print_summary(&summary, format),
    }

    Ok(())
}
