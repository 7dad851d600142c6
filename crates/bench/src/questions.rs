//! Question bank loaded from YAML
//!
//! ```yaml
//! questions:
//!   - key: Q21
//!     question: Which devices have certificates expiring this month?
//!   - key: Q22
//!     question: How many devices are offline?
//!     notes: count only
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::error::{BenchError, BenchResult};

/// Identifier selecting a canned question
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionKey(String);

impl QuestionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuestionKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub key: QuestionKey,

    /// Text sent to the assistant verbatim
    pub question: String,

    /// Free-form notes for whoever maintains the bank
    #[serde(default)]
    pub notes: Option<String>,
}

/// Ordered set of questions with unique keys
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> BenchResult<Self> {
        let mut seen = HashSet::new();
        for q in &questions {
            if !seen.insert(q.key.as_str()) {
                return Err(BenchError::InvalidConfig(format!(
                    "duplicate question key: {}",
                    q.key
                )));
            }
        }
        Ok(Self { questions })
    }

    pub fn from_yaml(yaml: &str) -> BenchResult<Self> {
        let bank: QuestionBank = serde_yaml::from_str(yaml)?;
        Self::new(bank.questions)
    }

    pub fn load(path: &Path) -> BenchResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn get(&self, key: &QuestionKey) -> BenchResult<&Question> {
        self.questions
            .iter()
            .find(|q| &q.key == key)
            .ok_or_else(|| BenchError::QuestionNotFound(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Resolve the configured key sequence into questions, in order.
    ///
    /// An empty selection means every question in bank order. Repeated keys
    /// are kept, so a question can be asked more than once in one run.
    pub fn select(&self, keys: &[QuestionKey]) -> BenchResult<Vec<Question>> {
        let selected: Vec<Question> = if keys.is_empty() {
            self.questions.clone()
        } else {
            keys.iter()
                .map(|k| self.get(k).cloned())
                .collect::<BenchResult<_>>()?
        };

        if selected.is_empty() {
            return Err(BenchError::EmptyRun);
        }
        Ok(selected)
    }
}
