//! Literal phrase classification of assistant replies
//!
//! The phrase lists are a compatibility contract with existing result
//! history. Orchestration only sees the [`ResponseClassifier`] trait, so a
//! structured-output classifier can replace [`PhraseClassifier`] later.

use serde::{Deserialize, Serialize};

/// Marker that the assistant declined or failed to answer.
pub const REFUSAL_MARKER: &str = "Sorry";

/// Phrases in which the assistant reports an empty result set.
pub const NO_DATA_PHRASES: [&str; 5] = [
    "No records were found",
    "I'm sorry, but I couldn't find any records",
    "I was unable to find any",
    "no records",
    "There are no devices",
];

/// Category assigned to a raw assistant reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// The assistant could not answer; no reference extraction is attempted
    Failure,
    /// Reference extraction failed and the assistant itself reported no data
    EmptyResult,
    /// The reply must be checked against a reference dataset
    NeedsVerification,
}

pub trait ResponseClassifier: Send + Sync {
    /// Classify a reply.
    ///
    /// `extraction_failed` is set when reference extraction has already
    /// failed; only then can the reply be classified as `EmptyResult`.
    fn classify(&self, response: &str, extraction_failed: bool) -> Classification;
}

/// Case-sensitive substring matcher over the fixed phrase lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhraseClassifier;

impl PhraseClassifier {
    pub fn is_refusal(response: &str) -> bool {
        response.contains(REFUSAL_MARKER)
    }

    pub fn reports_no_data(response: &str) -> bool {
        NO_DATA_PHRASES.iter().any(|phrase| response.contains(phrase))
    }
}

impl ResponseClassifier for PhraseClassifier {
    fn classify(&self, response: &str, extraction_failed: bool) -> Classification {
        if Self::is_refusal(response) {
            Classification::Failure
        } else if extraction_failed && Self::reports_no_data(response) {
            Classification::EmptyResult
        } else {
            Classification::NeedsVerification
        }
    }
}
