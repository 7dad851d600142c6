//! Benchmark orchestration: ask, time, classify, validate, record
//!
//! Questions are processed strictly one after another because the driven
//! browser session is a single stateful resource (one chat context, one
//! navigation state).

use serde::{Deserialize, Serialize};
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::classifier::{Classification, PhraseClassifier, ResponseClassifier};
use crate::config::{BenchConfig, TimeoutConfig};
use crate::dataset::ReferenceDataset;
use crate::error::{BenchError, BenchResult};
use crate::page::BenchPage;
use crate::questions::{Question, QuestionBank, QuestionKey};
use crate::recorder::{CsvRecorder, ResultRecord, RunSummary, SummaryBuilder};
use crate::timer::{round_seconds, ResponseTimer};
use crate::validator::{AnswerValidator, Verdict};

pub const REFUSAL_REASON: &str = "assistant could not answer";
pub const NO_DATA_REASON: &str = "assistant correctly reported no data";
pub const REFERENCE_UNAVAILABLE_REASON: &str = "reference data unavailable or mismatched page";
pub const RUN_BUDGET_REASON: &str = "run time budget exhausted before the question was asked";

/// Where a question got to before its outcome was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionPhase {
    Init,
    Asked,
    TimedResponse,
    Classified,
    Skipped,
    Validated,
    ExtractionFailed,
    Recorded,
}

/// How a question's verdict was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// The assistant declined to answer
    AssistantRefusal,
    /// The judge compared the reply against a reference table
    Validated,
    /// Reference extraction failed and the reply said there was no data
    NoDataReported,
    /// Reference extraction failed and the reply claimed data
    ReferenceUnavailable,
    /// The judge could not be reached or returned garbage
    ValidatorFailed,
    /// A wait exceeded its bound
    TimedOut,
    /// The run budget ran out before this question
    NotAsked,
}

/// What the assistant said and how long it took
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub question_key: QuestionKey,
    pub question_text: String,
    pub raw_response: String,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub query: QueryResult,
    pub kind: OutcomeKind,
    pub verdict: Verdict,
    /// Furthest phase reached; `Recorded` once the result is persisted
    pub phase: QuestionPhase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub outcomes: Vec<QuestionOutcome>,
    pub summary: RunSummary,
}

/// Everything a run needs, resolved up front
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub tenant_url: String,
    pub output_path: std::path::PathBuf,
    pub questions: Vec<Question>,
    pub timeouts: TimeoutConfig,
}

impl RunConfig {
    /// Resolve the configured question selection against the bank.
    pub fn resolve(config: &BenchConfig, bank: &QuestionBank) -> BenchResult<Self> {
        Ok(Self {
            tenant_url: config.tenant_url.clone(),
            output_path: config.output_path.clone(),
            questions: bank.select(&config.questions)?,
            timeouts: config.timeouts.clone(),
        })
    }
}

/// Partial state of the question in flight, kept outside the timed future
/// so a timed-out iteration can still be recorded.
#[derive(Debug)]
struct Progress {
    phase: QuestionPhase,
    elapsed_secs: Option<f64>,
    response: Option<String>,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            phase: QuestionPhase::Init,
            elapsed_secs: None,
            response: None,
        }
    }
}

pub struct BenchmarkRunner<P, V> {
    config: RunConfig,
    page: P,
    validator: V,
    classifier: Box<dyn ResponseClassifier>,
    recorder: CsvRecorder,
    timer: ResponseTimer,
}

impl<P: BenchPage, V: AnswerValidator> BenchmarkRunner<P, V> {
    pub fn new(config: RunConfig, page: P, validator: V) -> Self {
        let recorder = CsvRecorder::new(config.output_path.clone());
        let timer = ResponseTimer::new(config.timeouts.poll_interval(), config.timeouts.response());
        Self {
            config,
            page,
            validator,
            classifier: Box::new(PhraseClassifier),
            recorder,
            timer,
        }
    }

    /// Replace the reply classifier.
    pub fn with_classifier(mut self, classifier: impl ResponseClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    /// Give the page back, e.g. to close the browser after the run.
    pub fn into_page(self) -> P {
        self.page
    }

    /// Ask every configured question and record one result per question.
    ///
    /// Only sink failures abort the run; everything else is contained in the
    /// question that caused it and shows up as a recorded verdict.
    pub async fn run(&self) -> BenchResult<RunReport> {
        let total = self.config.questions.len();
        if total == 0 {
            return Err(BenchError::EmptyRun);
        }

        info!(
            "Running {} question(s) against {} -> {}",
            total,
            self.config.tenant_url,
            self.recorder.path().display()
        );

        let deadline = Instant::now() + self.config.timeouts.run();
        let mut summary = SummaryBuilder::new(total);
        let mut outcomes = Vec::with_capacity(total);

        for question in &self.config.questions {
            let mut outcome = if Instant::now() >= deadline {
                warn!("Run budget exhausted, not asking {}", question.key);
                Self::not_asked(question)
            } else {
                self.run_question(question).await
            };

            let record = ResultRecord::now(
                &question.question,
                &outcome.query.raw_response,
                outcome.verdict.is_accurate,
                outcome.query.elapsed_secs,
                &outcome.verdict.reason,
            );
            if let Err(e) = self.recorder.append(&record) {
                error!("Cannot write result for {}: {}", question.key, e);
                return Err(e);
            }
            outcome.phase = QuestionPhase::Recorded;

            info!("Question: {}", question.question);
            info!("Answer is accurate: {}", outcome.verdict.is_accurate);
            info!("Reason: {}", outcome.verdict.reason);

            // Unasked questions count against accuracy but carry no timing.
            if outcome.kind != OutcomeKind::NotAsked {
                summary.record(
                    question.key.as_str(),
                    outcome.query.elapsed_secs,
                    outcome.verdict.is_accurate,
                );
            }
            outcomes.push(outcome);
        }

        let summary = summary.build()?;
        summary.log();

        Ok(RunReport { outcomes, summary })
    }

    /// Process one question under the per-question bound.
    pub async fn run_question(&self, question: &Question) -> QuestionOutcome {
        let started = Instant::now();
        let mut progress = Progress::default();

        let result = timeout(
            self.config.timeouts.question(),
            self.process(question, &mut progress),
        )
        .await;

        let (kind, verdict) = match result {
            Ok(Ok(decided)) => decided,
            Ok(Err(e)) => {
                warn!("Question {} failed during {:?}: {}", question.key, progress.phase, e);
                self.fallback(&mut progress, &e)
            }
            Err(_) => {
                let e = BenchError::timeout(
                    format!("question {}", question.key),
                    self.config.timeouts.question(),
                );
                warn!("{}", e);
                self.fallback(&mut progress, &e)
            }
        };

        let elapsed_secs = progress
            .elapsed_secs
            .unwrap_or_else(|| round_seconds(started.elapsed().as_secs_f64()));

        QuestionOutcome {
            query: QueryResult {
                question_key: question.key.clone(),
                question_text: question.question.clone(),
                raw_response: progress.response.unwrap_or_default(),
                elapsed_secs,
            },
            kind,
            verdict,
            phase: progress.phase,
        }
    }

    async fn process(
        &self,
        question: &Question,
        progress: &mut Progress,
    ) -> BenchResult<(OutcomeKind, Verdict)> {
        let page = &self.page;

        page.go_to_start(&self.config.tenant_url).await?;
        page.open_assistant().await?;

        progress.phase = QuestionPhase::Asked;
        let elapsed = self
            .timer
            .measure(page.send(&question.question), move || async move {
                page.is_busy().await.map(|busy| !busy)
            })
            .await?;
        progress.elapsed_secs = Some(elapsed);
        progress.phase = QuestionPhase::TimedResponse;
        info!("Response time for {}: {}s", question.key, elapsed);

        let response = page.read_latest_response().await?;
        progress.response = Some(response.clone());
        progress.phase = QuestionPhase::Classified;

        if self.classifier.classify(&response, false) == Classification::Failure {
            info!(
                "Skipping validation for {} because the assistant could not answer",
                question.key
            );
            progress.phase = QuestionPhase::Skipped;
            return Ok((OutcomeKind::AssistantRefusal, Verdict::inaccurate(REFUSAL_REASON)));
        }

        let reference = match self.extract_reference().await {
            Ok(reference) => reference,
            Err(e) => {
                warn!("Reference extraction failed for {}: {}", question.key, e);
                return Ok(self.extraction_failed(progress, &response));
            }
        };

        progress.phase = QuestionPhase::Validated;
        debug!(
            "Validating {} against '{}' ({} rows)",
            question.key,
            reference.header,
            reference.rows.len()
        );
        match self.validator.validate(question, &response, &reference).await {
            Ok(verdict) => Ok((OutcomeKind::Validated, verdict)),
            Err(e) => {
                warn!("Validator failed for {}: {}", question.key, e);
                Ok((
                    OutcomeKind::ValidatorFailed,
                    Verdict::inaccurate(format!("validator unavailable: {}", e)),
                ))
            }
        }
    }

    async fn extract_reference(&self) -> BenchResult<ReferenceDataset> {
        self.page.follow_reference_link().await?;
        self.page.reveal_all_columns().await?;
        self.page.read_table().await
    }

    fn extraction_failed(&self, progress: &mut Progress, response: &str) -> (OutcomeKind, Verdict) {
        progress.phase = QuestionPhase::ExtractionFailed;
        match self.classifier.classify(response, true) {
            Classification::EmptyResult => {
                (OutcomeKind::NoDataReported, Verdict::accurate(NO_DATA_REASON))
            }
            _ => (
                OutcomeKind::ReferenceUnavailable,
                Verdict::inaccurate(REFERENCE_UNAVAILABLE_REASON),
            ),
        }
    }

    /// Decide a question that did not finish normally. Timeouts and
    /// collaborator errors are treated as an extraction failure against
    /// whatever reply was read.
    fn fallback(&self, progress: &mut Progress, err: &BenchError) -> (OutcomeKind, Verdict) {
        let response = progress.response.clone().unwrap_or_default();
        let (kind, verdict) = self.extraction_failed(progress, &response);

        match (kind, err) {
            (OutcomeKind::ReferenceUnavailable, BenchError::Timeout { .. }) => (
                OutcomeKind::TimedOut,
                Verdict::inaccurate(format!("{} ({})", REFERENCE_UNAVAILABLE_REASON, err)),
            ),
            _ => (kind, verdict),
        }
    }

    fn not_asked(question: &Question) -> QuestionOutcome {
        QuestionOutcome {
            query: QueryResult {
                question_key: question.key.clone(),
                question_text: question.question.clone(),
                raw_response: String::new(),
                elapsed_secs: 0.0,
            },
            kind: OutcomeKind::NotAsked,
            verdict: Verdict::inaccurate(RUN_BUDGET_REASON),
            phase: QuestionPhase::Init,
        }
    }
}
