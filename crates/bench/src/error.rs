//! Error types for the benchmark harness

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Timeout waiting for {what} after {after:?}")]
    Timeout { what: String, after: Duration },

    #[error("No questions configured for this run")]
    EmptyRun,

    #[error("Question not found in bank: {0}")]
    QuestionNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Reference extraction failed: {0}")]
    Extraction(String),

    #[error("Hidden columns still present after {attempts} reveal attempts")]
    ColumnsNotRevealed { attempts: usize },

    #[error("{what} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        what: String,
        attempts: usize,
        last_error: String,
    },

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Validator error: {0}")]
    Validator(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BenchError {
    /// Errors that must abort the whole run rather than a single question.
    ///
    /// A sink that cannot be written leaves the benchmark without a durable
    /// record, and an empty question set has nothing to measure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BenchError::Io(_) | BenchError::Csv(_) | BenchError::EmptyRun)
    }

    pub(crate) fn timeout(what: impl Into<String>, after: Duration) -> Self {
        BenchError::Timeout {
            what: what.into(),
            after,
        }
    }
}

pub type BenchResult<T> = Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_failures_are_fatal() {
        let io = BenchError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "ro"));
        assert!(io.is_fatal());
        assert!(BenchError::EmptyRun.is_fatal());
    }

    #[test]
    fn per_question_failures_are_contained() {
        assert!(!BenchError::timeout("loading indicator", Duration::from_secs(3)).is_fatal());
        assert!(!BenchError::ColumnsNotRevealed { attempts: 5 }.is_fatal());
        assert!(!BenchError::Validator("bad json".into()).is_fatal());
        assert!(!BenchError::Extraction("no table".into()).is_fatal());
    }

    #[test]
    fn timeout_message_names_the_wait() {
        let err = BenchError::timeout("loading indicator", Duration::from_secs(2));
        assert_eq!(err.to_string(), "Timeout waiting for loading indicator after 2s");
    }
}
