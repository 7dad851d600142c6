//! kaibench - accuracy and latency benchmark for the Kai assistant
//!
//! This crate drives the assistant embedded in the Visibility console through
//! a fixed question set and, for every question:
//! - times the reply from submission until the loading indicator clears
//! - classifies obvious refusals without further work
//! - follows the reply's reference link and extracts the table it points to
//! - asks an external judge whether the reply matches that table
//! - appends one row to a CSV sink shared across runs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    BenchmarkRunner                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  for each question (sequential, per-question timeout):      │
//! │    Navigator::go_to_start / open_assistant                  │
//! │    ResponseTimer::measure(ChatSession::send, !is_busy)      │
//! │    ResponseClassifier::classify  ── Failure ──┐             │
//! │    ReferenceSource::follow/reveal/read_table  │             │
//! │      ├── ok   -> AnswerValidator::validate    │             │
//! │      └── err  -> classify(.., extraction_failed)            │
//! │    CsvRecorder::append  <─────────────────────┘             │
//! │  SummaryBuilder -> RunSummary                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod error;
pub mod page;
pub mod playwright;
pub mod questions;
pub mod recorder;
pub mod retry;
pub mod runner;
pub mod timer;
pub mod validator;

pub use classifier::{Classification, PhraseClassifier, ResponseClassifier};
pub use config::BenchConfig;
pub use dataset::{ReferenceDataset, Row};
pub use error::{BenchError, BenchResult};
pub use questions::{Question, QuestionBank, QuestionKey};
pub use recorder::{CsvRecorder, ResultRecord, RunSummary};
pub use runner::{BenchmarkRunner, RunConfig, RunReport};
pub use validator::{AnswerValidator, ChatCompletionValidator, Verdict};
