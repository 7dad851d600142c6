//! Benchmark configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BenchError, BenchResult};
use crate::playwright::BrowserConfig;
use crate::questions::QuestionKey;
use crate::retry::RetryPolicy;
use crate::validator::ValidatorConfig;

/// Benchmark configuration, loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Start page of the tenant under test
    pub tenant_url: String,

    /// CSV sink, appended to across runs
    pub output_path: PathBuf,

    /// YAML question bank
    pub question_bank: PathBuf,

    /// Keys to ask, in order. Empty means the whole bank.
    pub questions: Vec<QuestionKey>,

    pub timeouts: TimeoutConfig,

    /// Retry policy for reading eventually-consistent tables
    pub retry: RetryPolicy,

    pub columns: ColumnRevealConfig,

    pub browser: BrowserConfig,

    pub validator: ValidatorConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            tenant_url: String::new(),
            output_path: PathBuf::from("Kai_Test_Results.csv"),
            question_bank: PathBuf::from("questions.yaml"),
            questions: Vec::new(),
            timeouts: TimeoutConfig::default(),
            retry: RetryPolicy::default(),
            columns: ColumnRevealConfig::default(),
            browser: BrowserConfig::default(),
            validator: ValidatorConfig::default(),
        }
    }
}

/// Wait bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Maximum wait for the loading indicator to clear
    pub response_secs: u64,

    /// Loading indicator poll interval
    pub poll_interval_ms: u64,

    /// Maximum time for one whole question
    pub question_secs: u64,

    /// Maximum time for the whole run
    pub run_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            response_secs: 180,
            poll_interval_ms: 500,
            question_secs: 300,
            run_secs: 1200,
        }
    }
}

impl TimeoutConfig {
    pub fn response(&self) -> Duration {
        Duration::from_secs(self.response_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn question(&self) -> Duration {
        Duration::from_secs(self.question_secs)
    }

    pub fn run(&self) -> Duration {
        Duration::from_secs(self.run_secs)
    }
}

/// Bounds for the hidden-column reveal loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnRevealConfig {
    /// Maximum "add hidden column" clicks before giving up
    pub max_reveals: usize,

    /// Pause after opening the editor and after applying
    pub settle_ms: u64,
}

impl Default for ColumnRevealConfig {
    fn default() -> Self {
        Self {
            max_reveals: 50,
            settle_ms: 1000,
        }
    }
}

impl ColumnRevealConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl BenchConfig {
    /// Load configuration from file, falling back to defaults if absent
    pub fn load(path: &Path) -> BenchResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> BenchResult<()> {
        if self.tenant_url.trim().is_empty() {
            return Err(BenchError::InvalidConfig("tenant_url is not set".into()));
        }
        if self.timeouts.response_secs == 0 || self.timeouts.question_secs == 0 || self.timeouts.run_secs == 0 {
            return Err(BenchError::InvalidConfig("timeouts must be non-zero".into()));
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(BenchError::InvalidConfig("poll_interval_ms must be non-zero".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(BenchError::InvalidConfig("retry.max_attempts must be at least 1".into()));
        }
        if self.columns.max_reveals == 0 {
            return Err(BenchError::InvalidConfig("columns.max_reveals must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let config = BenchConfig::load(Path::new("/nonexistent/kaibench.toml")).unwrap();
        assert_eq!(config.output_path, PathBuf::from("Kai_Test_Results.csv"));
        assert_eq!(config.timeouts.response(), Duration::from_secs(180));
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let toml = r#"
tenant_url = "https://tenant.example.com"
questions = ["Q21", "Q22"]

[timeouts]
response_secs = 60

[validator]
model = "gpt-4o"
"#;
        let config: BenchConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.tenant_url, "https://tenant.example.com");
        assert_eq!(config.questions, vec![QuestionKey::new("Q21"), QuestionKey::new("Q22")]);
        assert_eq!(config.timeouts.response_secs, 60);
        assert_eq!(config.timeouts.question_secs, 300);
        assert_eq!(config.validator.model, "gpt-4o");
        assert_eq!(config.validator.api_key_env, "OPENAI_API_KEY");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_tenant() {
        let err = BenchConfig::default().validate().unwrap_err();
        assert!(matches!(err, BenchError::InvalidConfig(_)));
    }

    #[test]
    fn validate_rejects_zero_bounds() {
        let mut config = BenchConfig {
            tenant_url: "https://tenant.example.com".into(),
            ..Default::default()
        };
        config.timeouts.response_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn sample_files_load() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        let config = BenchConfig::load(&root.join("kaibench.toml")).unwrap();
        assert_eq!(config.browser.node_binary, "node");
        assert_eq!(config.question_bank, PathBuf::from("questions.yaml"));

        let bank = crate::questions::QuestionBank::load(&root.join(&config.question_bank)).unwrap();
        assert_eq!(bank.select(&config.questions).unwrap().len(), bank.len());
    }
}
