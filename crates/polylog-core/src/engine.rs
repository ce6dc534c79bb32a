//! Practice session orchestration.
//!
//! Loads question content, scores each modality, fans AI reviews out to the
//! evaluator with bounded concurrency, persists response records, and reads
//! dashboards. Every call takes an explicit [`Session`]; stores and the
//! evaluator are injected handles.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::analytics::{aggregate, AnalyticsConfig, DashboardModel};
use crate::error::{EngineError, TransportError};
use crate::feedback::{parse_feedback, ParsedFeedback};
use crate::model::{
    ContentMode, Language, ModuleCode, ProgressRecord, QuestionItem, ResponseRecord, Session,
    TestMode,
};
use crate::progress::ProgressRecorder;
use crate::scoring::{normalize_credits, total, Outcome};
use crate::similarity::similarity;
use crate::time::Clock;
use crate::traits::{
    ContentQuery, ContentStore, Evaluator, ProgressStore, ResultFilter, ResultStore,
    ReviewRequest, SpeechRecognizer, SpeechSynthesizer, Utterance,
};

/// Configuration for the practice engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum concurrent evaluator requests.
    pub parallelism: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { parallelism: 4 }
    }
}

/// Progress reporting for batch reviews.
pub trait ProgressReporter: Send + Sync {
    fn on_review_start(&self, index: usize, question: &str);
    fn on_review_complete(&self, index: usize, score: f64);
    fn on_review_error(&self, index: usize, error: &str);
    fn on_batch_complete(&self, total: usize, succeeded: usize, failed: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_review_start(&self, _: usize, _: &str) {}
    fn on_review_complete(&self, _: usize, _: f64) {}
    fn on_review_error(&self, _: usize, _: &str) {}
    fn on_batch_complete(&self, _: usize, _: usize, _: usize, _: Duration) {}
}

/// One scored answer in a graded batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedItem {
    pub question_id: String,
    pub question_text: String,
    pub user_answer: String,
    pub correct_answer: String,
    /// Score persisted for the answer: the credit for choice items, the
    /// similarity percentage for spoken items.
    pub score: f64,
    /// Share of the batch's 100 points earned.
    pub credit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedBatch {
    pub items: Vec<GradedItem>,
    /// Sum of credits, 0–100.
    pub total: f64,
}

/// Result of reviewing one answer.
#[derive(Debug, Clone)]
pub enum ReviewOutcome {
    Reviewed {
        feedback: ParsedFeedback,
        raw: serde_json::Value,
    },
    Failed(EngineError),
}

#[derive(Debug, Clone)]
pub struct ReviewItem {
    pub index: usize,
    pub question_text: String,
    pub user_answer: String,
    pub outcome: ReviewOutcome,
}

/// Outcomes of a batch review, aligned with the submitted answers.
#[derive(Debug, Clone)]
pub struct ReviewBatch {
    pub items: Vec<ReviewItem>,
    pub succeeded: usize,
    pub failed: usize,
}

/// Orchestrates practice sessions over injected stores.
pub struct PracticeEngine {
    content: Arc<dyn ContentStore>,
    results: Arc<dyn ResultStore>,
    progress: Arc<dyn ProgressStore>,
    evaluator: Option<Arc<dyn Evaluator>>,
    clock: Clock,
    config: EngineConfig,
}

impl PracticeEngine {
    pub fn new(
        content: Arc<dyn ContentStore>,
        results: Arc<dyn ResultStore>,
        progress: Arc<dyn ProgressStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            content,
            results,
            progress,
            evaluator: None,
            clock: Clock::System,
            config,
        }
    }

    /// Build an engine over a single store serving all three roles.
    pub fn with_store<S>(store: Arc<S>, config: EngineConfig) -> Self
    where
        S: ContentStore + ResultStore + ProgressStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store, config)
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Questions for the query. A lookup failure or an empty set is fatal.
    pub async fn load_questions(
        &self,
        query: &ContentQuery,
    ) -> Result<Vec<QuestionItem>, EngineError> {
        let items = self.content.get(query).await.inspect_err(|e| {
            tracing::error!("failed to load questions for {}: {e}", query.module_code());
        })?;
        if items.is_empty() {
            return Err(EngineError::NotFound(format!(
                "no questions for {} ({}, {})",
                query.module_code(),
                query.language,
                query.mode
            )));
        }
        Ok(items)
    }

    /// Highest day available for a test; any failure counts as 0 days.
    pub async fn available_days(
        &self,
        language: Language,
        module_id: &str,
        test_id: &str,
        mode: ContentMode,
    ) -> u32 {
        match self
            .content
            .available_days(language, module_id, test_id, mode)
            .await
        {
            Ok(days) => days,
            Err(e) => {
                tracing::warn!("no days for {module_id}-{test_id} ({language}, {mode}): {e}");
                0
            }
        }
    }

    /// Grade option selections. `None` means the question was skipped.
    pub fn grade_choices(
        items: &[QuestionItem],
        selections: &[Option<usize>],
        mode: TestMode,
    ) -> Result<GradedBatch, EngineError> {
        check_lengths(items.len(), selections.len())?;

        let mut outcomes = Vec::with_capacity(items.len());
        for (item, selection) in items.iter().zip(selections) {
            let correct = item.correct_option.ok_or_else(|| {
                EngineError::Validation(format!("question {} has no correct option", item.id))
            })?;
            outcomes.push(Outcome::Discrete(*selection == Some(correct)));
        }
        let credits = normalize_credits(&outcomes);

        let graded = items
            .iter()
            .zip(selections)
            .zip(&credits)
            .map(|((item, selection), &credit)| GradedItem {
                question_id: item.id.clone(),
                question_text: item.question_text(mode),
                user_answer: selection
                    .and_then(|i| item.options.get(i))
                    .cloned()
                    .unwrap_or_default(),
                correct_answer: item.canonical_answer().unwrap_or_default().to_string(),
                score: credit,
                credit,
            })
            .collect();

        Ok(GradedBatch {
            items: graded,
            total: total(&credits),
        })
    }

    /// Grade spoken answers by similarity to each item's canonical answer.
    pub fn grade_speech(
        items: &[QuestionItem],
        transcripts: &[String],
    ) -> Result<GradedBatch, EngineError> {
        check_lengths(items.len(), transcripts.len())?;

        let mut scores = Vec::with_capacity(items.len());
        for (item, transcript) in items.iter().zip(transcripts) {
            let canonical = item.canonical_answer().ok_or_else(|| {
                EngineError::Validation(format!("question {} has no canonical answer", item.id))
            })?;
            scores.push((canonical, similarity(transcript, canonical)));
        }
        let outcomes: Vec<Outcome> = scores
            .iter()
            .map(|(_, s)| Outcome::from_percent(*s))
            .collect();
        let credits = normalize_credits(&outcomes);

        let graded = items
            .iter()
            .zip(transcripts)
            .zip(scores.iter().zip(&credits))
            .map(|((item, transcript), ((canonical, score), &credit))| GradedItem {
                question_id: item.id.clone(),
                question_text: item.question_text(TestMode::SpeechAccuracy),
                user_answer: transcript.clone(),
                correct_answer: canonical.to_string(),
                score: *score,
                credit,
            })
            .collect();

        Ok(GradedBatch {
            items: graded,
            total: total(&credits),
        })
    }

    /// Load, grade, and persist a multiple-choice or listening batch.
    pub async fn submit_choices(
        &self,
        session: &Session,
        query: &ContentQuery,
        selections: &[Option<usize>],
        mode: TestMode,
    ) -> Result<GradedBatch, EngineError> {
        let items = self.load_questions(query).await?;
        let batch = Self::grade_choices(&items, selections, mode)?;
        self.persist(session, &query.module_code(), &batch).await?;
        tracing::info!(
            user = %session.user_id,
            module = %query.module_code(),
            total = batch.total,
            "{mode} batch graded"
        );
        Ok(batch)
    }

    /// Load, grade, and persist a speech-accuracy batch.
    pub async fn submit_speech(
        &self,
        session: &Session,
        query: &ContentQuery,
        transcripts: &[String],
    ) -> Result<GradedBatch, EngineError> {
        let items = self.load_questions(query).await?;
        let batch = Self::grade_speech(&items, transcripts)?;
        self.persist(session, &query.module_code(), &batch).await?;
        tracing::info!(
            user = %session.user_id,
            module = %query.module_code(),
            total = batch.total,
            "speech batch graded"
        );
        Ok(batch)
    }

    async fn persist(
        &self,
        session: &Session,
        module_code: &ModuleCode,
        batch: &GradedBatch,
    ) -> Result<(), EngineError> {
        let now = self.clock.now();
        let records = batch
            .items
            .iter()
            .map(|item| {
                ResponseRecord::new(
                    session.user_id.clone(),
                    module_code.clone(),
                    session.language,
                    item.question_text.clone(),
                    item.user_answer.clone(),
                    item.score,
                    now,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.results.append(&records).await
    }

    /// Send every answer to the evaluator and persist the reviewed ones.
    ///
    /// Requests run concurrently, at most `parallelism` at a time. A failed
    /// item does not affect the others; it is reported in place as
    /// [`ReviewOutcome::Failed`].
    pub async fn review_batch(
        &self,
        session: &Session,
        query: &ContentQuery,
        answers: &[String],
        reporter: &dyn ProgressReporter,
    ) -> Result<ReviewBatch, EngineError> {
        let evaluator = self
            .evaluator
            .clone()
            .ok_or_else(|| EngineError::Validation("no evaluator configured".into()))?;
        let items = self.load_questions(query).await?;
        check_lengths(items.len(), answers.len())?;

        let start = Instant::now();
        let module_code = query.module_code();
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let mut futures = FuturesUnordered::new();

        for (index, (item, answer)) in items.iter().zip(answers).enumerate() {
            let evaluator = Arc::clone(&evaluator);
            let semaphore = Arc::clone(&semaphore);
            let request = ReviewRequest {
                user_id: session.user_id.clone(),
                module_code: module_code.clone(),
                sentence: item.prompt.clone(),
                user_input: answer.clone(),
                language: session.language,
            };

            futures.push(async move {
                let inner = async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|_| {
                        TransportError::Network("review semaphore closed".into())
                    })?;
                    reporter.on_review_start(index, &request.sentence);
                    let raw = evaluator.review(&request).await?;
                    let feedback = parse_feedback(&raw)?;
                    Ok::<_, EngineError>(ReviewOutcome::Reviewed { feedback, raw })
                };
                (index, inner.await)
            });
        }

        let mut slots: Vec<Option<ReviewOutcome>> = (0..items.len()).map(|_| None).collect();
        let mut succeeded = 0usize;
        let mut failed = 0usize;

        while let Some((index, result)) = futures.next().await {
            let outcome = match result {
                Ok(outcome) => {
                    if let ReviewOutcome::Reviewed { feedback, .. } = &outcome {
                        reporter.on_review_complete(index, feedback.overall_score);
                    }
                    succeeded += 1;
                    outcome
                }
                Err(e) => {
                    tracing::error!("review failed for question {}: {e}", items[index].id);
                    reporter.on_review_error(index, &e.to_string());
                    failed += 1;
                    ReviewOutcome::Failed(e)
                }
            };
            slots[index] = Some(outcome);
        }

        reporter.on_batch_complete(items.len(), succeeded, failed, start.elapsed());

        let now = self.clock.now();
        let mut records = Vec::new();
        let mut reviewed = Vec::with_capacity(items.len());
        for (index, ((item, answer), slot)) in items.iter().zip(answers).zip(slots).enumerate() {
            let outcome = slot.unwrap_or_else(|| {
                ReviewOutcome::Failed(EngineError::Validation("review did not complete".into()))
            });
            let question_text = item.question_text(TestMode::AiReview);
            if let ReviewOutcome::Reviewed { feedback, raw } = &outcome {
                records.push(
                    ResponseRecord::new(
                        session.user_id.clone(),
                        module_code.clone(),
                        session.language,
                        question_text.clone(),
                        answer.clone(),
                        feedback.overall_score,
                        now,
                    )?
                    .with_feedback(raw.to_string()),
                );
            }
            reviewed.push(ReviewItem {
                index,
                question_text,
                user_answer: answer.clone(),
                outcome,
            });
        }

        if !records.is_empty() {
            self.results.append(&records).await?;
        }

        Ok(ReviewBatch {
            items: reviewed,
            succeeded,
            failed,
        })
    }

    /// Mark a module complete for the session's learner.
    pub async fn record_completion(
        &self,
        session: &Session,
        module_code: &ModuleCode,
        day: Option<u32>,
    ) -> Result<ProgressRecord, EngineError> {
        ProgressRecorder::new(Arc::clone(&self.progress))
            .with_clock(self.clock)
            .upsert(&session.user_id, module_code, session.language, day)
            .await
    }

    /// Read both collections for the session and aggregate them.
    pub async fn dashboard(
        &self,
        session: &Session,
        filter: &ResultFilter,
        config: &AnalyticsConfig,
    ) -> Result<DashboardModel, EngineError> {
        let results = self
            .results
            .read(&session.user_id, session.language, filter)
            .await?;
        let progress: Vec<ProgressRecord> = self
            .progress
            .read(&session.user_id, session.language, true)
            .await?
            .into_iter()
            .filter(|p| filter.matches_progress(p))
            .collect();

        Ok(aggregate(&results, &progress, config))
    }

    /// Capture one transcript per item. A failed capture becomes an empty
    /// transcript, which scores 0.
    pub async fn capture_transcripts(
        &self,
        session: &Session,
        recognizer: &dyn SpeechRecognizer,
        items: &[QuestionItem],
    ) -> Vec<String> {
        let mut transcripts = Vec::with_capacity(items.len());
        for item in items {
            match recognizer.recognize(session.language, &item.prompt).await {
                Ok(text) => transcripts.push(text),
                Err(e) => {
                    tracing::warn!("speech capture failed for question {}: {e}", item.id);
                    transcripts.push(String::new());
                }
            }
        }
        transcripts
    }

    /// Speak an item's prompt in the session language.
    pub async fn speak_prompt(
        &self,
        session: &Session,
        synthesizer: &dyn SpeechSynthesizer,
        item: &QuestionItem,
    ) -> Result<(), TransportError> {
        let utterance = Utterance {
            text: item.spoken_text().to_string(),
            locale: session.language.speech_locale().to_string(),
        };
        synthesizer.speak(&utterance).await
    }
}

fn check_lengths(items: usize, answers: usize) -> Result<(), EngineError> {
    if items == answers {
        Ok(())
    } else {
        Err(EngineError::Validation(format!(
            "{answers} answers for {items} questions"
        )))
    }
}
