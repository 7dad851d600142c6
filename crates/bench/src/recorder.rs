//! Durable per-question results and end-of-run aggregation

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use chrono::Local;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, info};

use crate::error::{BenchError, BenchResult};

/// One row of the result sink.
///
/// Column names and order are consumed by downstream spreadsheets and must
/// not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(rename = "DateTime")]
    pub timestamp: String,

    #[serde(rename = "Question")]
    pub question: String,

    #[serde(rename = "KaiAnswer")]
    pub raw_response: String,

    #[serde(rename = "IsAccurate", with = "title_case_bool")]
    pub is_accurate: bool,

    #[serde(rename = "ResponseTime")]
    pub elapsed_secs: f64,

    #[serde(rename = "AI Comment")]
    pub comment: String,
}

impl ResultRecord {
    /// Build a record stamped with the local time, e.g. `5/6/2025, 9:36:04 AM`.
    pub fn now(
        question: impl Into<String>,
        raw_response: impl Into<String>,
        is_accurate: bool,
        elapsed_secs: f64,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Local::now().format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
            question: question.into(),
            raw_response: raw_response.into(),
            is_accurate,
            elapsed_secs,
            comment: comment.into(),
        }
    }
}

/// `IsAccurate` is written as the literal strings `True` / `False`.
mod title_case_bool {
    use super::*;

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "True" | "true" => Ok(true),
            "False" | "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected True or False, got {other:?}"
            ))),
        }
    }
}

/// Append-only CSV sink shared across runs.
///
/// The header row is written only when the file is new or empty; existing
/// rows are never truncated.
#[derive(Debug, Clone)]
pub struct CsvRecorder {
    path: PathBuf,
}

impl CsvRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &ResultRecord) -> BenchResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        wtr.serialize(record)?;
        wtr.flush()?;

        debug!("Appended result to {}", self.path.display());
        Ok(())
    }

    /// Read every record back from the sink.
    pub fn read_all(&self) -> BenchResult<Vec<ResultRecord>> {
        let mut rdr = csv::Reader::from_path(&self.path)?;
        let records = rdr
            .deserialize()
            .collect::<Result<Vec<ResultRecord>, csv::Error>>()?;
        Ok(records)
    }
}

/// Elapsed time and outcome for one processed question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionTiming {
    pub label: String,
    pub elapsed_secs: f64,
    pub accurate: bool,
}

/// Aggregate accuracy and timing for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_questions: usize,
    pub correct: usize,
    pub accuracy_percent: f64,
    pub timings: Vec<QuestionTiming>,
    pub average_secs: f64,
    pub min_secs: f64,
    pub max_secs: f64,
    pub slowest: Option<String>,
}

impl RunSummary {
    /// Per-question times followed by the average and accuracy lines.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Response Time Report ===\n");
        for t in &self.timings {
            out.push_str(&format!("Question {}: {}s\n", t.label, t.elapsed_secs));
        }
        out.push_str(&format!("Average Response Time: {:.2}s\n", self.average_secs));
        out.push_str(&format!("Kai Accuracy: {:.2}%\n", self.accuracy_percent));
        out
    }

    pub fn log(&self) {
        for t in &self.timings {
            info!("Response time for {}: {}s", t.label, t.elapsed_secs);
        }
        info!("Average Response Time: {:.2}s", self.average_secs);
        info!(
            "Kai Accuracy: {:.2}% ({}/{})",
            self.accuracy_percent, self.correct, self.total_questions
        );
    }
}

/// Accumulator owned by the runner for the duration of one run.
///
/// The denominator is fixed when the run starts and is never reduced by
/// skipped or failed questions.
#[derive(Debug, Clone)]
pub struct SummaryBuilder {
    total: usize,
    timings: Vec<QuestionTiming>,
}

impl SummaryBuilder {
    pub fn new(total_questions: usize) -> Self {
        Self {
            total: total_questions,
            timings: Vec::with_capacity(total_questions),
        }
    }

    pub fn record(&mut self, label: impl Into<String>, elapsed_secs: f64, accurate: bool) {
        self.timings.push(QuestionTiming {
            label: label.into(),
            elapsed_secs,
            accurate,
        });
    }

    pub fn correct(&self) -> usize {
        self.timings.iter().filter(|t| t.accurate).count()
    }

    pub fn recorded(&self) -> usize {
        self.timings.len()
    }

    pub fn build(self) -> BenchResult<RunSummary> {
        build_summary(self.total, self.timings)
    }
}

/// Summarize timings where every entry counts towards the denominator.
pub fn summarize(timings: &[QuestionTiming]) -> BenchResult<RunSummary> {
    build_summary(timings.len(), timings.to_vec())
}

/// Summarize a sink read back from disk, labelling rows by question text.
pub fn summarize_records(records: &[ResultRecord]) -> BenchResult<RunSummary> {
    let timings: Vec<QuestionTiming> = records
        .iter()
        .map(|r| QuestionTiming {
            label: r.question.clone(),
            elapsed_secs: r.elapsed_secs,
            accurate: r.is_accurate,
        })
        .collect();
    summarize(&timings)
}

fn build_summary(total: usize, timings: Vec<QuestionTiming>) -> BenchResult<RunSummary> {
    if total == 0 {
        return Err(BenchError::EmptyRun);
    }

    let correct = timings.iter().filter(|t| t.accurate).count();
    let (average_secs, min_secs, max_secs) = if timings.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let sum: f64 = timings.iter().map(|t| t.elapsed_secs).sum();
        let min = timings
            .iter()
            .map(|t| t.elapsed_secs)
            .fold(f64::INFINITY, f64::min);
        let max = timings
            .iter()
            .map(|t| t.elapsed_secs)
            .fold(f64::NEG_INFINITY, f64::max);
        (sum / timings.len() as f64, min, max)
    };
    let slowest = timings
        .iter()
        .max_by(|a, b| a.elapsed_secs.total_cmp(&b.elapsed_secs))
        .map(|t| t.label.clone());

    Ok(RunSummary {
        total_questions: total,
        correct,
        accuracy_percent: correct as f64 / total as f64 * 100.0,
        timings,
        average_secs,
        min_secs,
        max_secs,
        slowest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(label: &str, secs: f64, accurate: bool) -> QuestionTiming {
        QuestionTiming {
            label: label.into(),
            elapsed_secs: secs,
            accurate,
        }
    }

    #[test]
    fn empty_summary_is_rejected() {
        assert!(matches!(summarize(&[]), Err(BenchError::EmptyRun)));
        assert!(matches!(SummaryBuilder::new(0).build(), Err(BenchError::EmptyRun)));
    }

    #[test]
    fn single_result_summary() {
        let s = summarize(&[timing("Q1", 4.5, false)]).unwrap();
        assert_eq!(s.average_secs, 4.5);
        assert_eq!(s.accuracy_percent, 0.0);

        let s = summarize(&[timing("Q1", 4.5, true)]).unwrap();
        assert_eq!(s.accuracy_percent, 100.0);
    }

    #[test]
    fn accuracy_uses_fixed_denominator() {
        let mut b = SummaryBuilder::new(4);
        b.record("Q1", 2.0, true);
        b.record("Q2", 4.0, false);
        b.record("Q3", 6.0, true);
        b.record("Q4", 8.0, true);
        assert_eq!(b.correct(), 3);

        let s = b.build().unwrap();
        assert_eq!(s.total_questions, 4);
        assert_eq!(s.accuracy_percent, 75.0);
        assert_eq!(s.average_secs, 5.0);
        assert_eq!(s.min_secs, 2.0);
        assert_eq!(s.max_secs, 8.0);
        assert_eq!(s.slowest.as_deref(), Some("Q4"));
    }

    #[test]
    fn timing_stats_cover_only_asked_questions() {
        let mut b = SummaryBuilder::new(3);
        b.record("Q1", 20.0, true);
        assert_eq!(b.recorded(), 1);

        let s = b.build().unwrap();
        assert_eq!(s.total_questions, 3);
        assert_eq!(s.average_secs, 20.0);
        assert_eq!(s.min_secs, 20.0);
        assert!((s.accuracy_percent - 100.0 / 3.0).abs() < 1e-9);

        let none_asked = SummaryBuilder::new(2).build().unwrap();
        assert_eq!(none_asked.average_secs, 0.0);
        assert_eq!(none_asked.accuracy_percent, 0.0);
        assert!(none_asked.slowest.is_none());
    }

    #[test]
    fn report_formats_two_decimals() {
        let s = summarize(&[timing("Q1", 1.0, true), timing("Q2", 2.0, false), timing("Q3", 2.0, false)])
            .unwrap();
        let text = s.render_text();
        assert!(text.contains("Question Q1: 1s"));
        assert!(text.contains("Average Response Time: 1.67s"));
        assert!(text.contains("Kai Accuracy: 33.33%"));
    }

    #[test]
    fn is_accurate_is_title_case_in_csv() {
        let record = ResultRecord {
            timestamp: "5/6/2025, 9:36:04 AM".into(),
            question: "q".into(),
            raw_response: "a".into(),
            is_accurate: true,
            elapsed_secs: 1.5,
            comment: "matches".into(),
        };
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.serialize(&record).unwrap();
        let text = String::from_utf8(wtr.into_inner().unwrap()).unwrap();

        assert_eq!(
            text,
            "DateTime,Question,KaiAnswer,IsAccurate,ResponseTime,AI Comment\n\
             \"5/6/2025, 9:36:04 AM\",q,a,True,1.5,matches\n"
        );
    }
}
