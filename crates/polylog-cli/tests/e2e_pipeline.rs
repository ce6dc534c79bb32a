//! End-to-end pipeline tests over the file store and the mock evaluator.
//!
//! These drive the engine the way the CLI does (grade, review, complete,
//! dashboard) against the bundled content, then reopen the store to check
//! that everything written survives a restart.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use polylog_core::analytics::{AnalyticsConfig, KpiStatus};
use polylog_core::engine::{EngineConfig, NoopReporter, PracticeEngine, ReviewOutcome};
use polylog_core::model::{ContentMode, Language, ModuleCode, Session, TestMode};
use polylog_core::store::FileStore;
use polylog_core::time::Clock;
use polylog_core::traits::{ContentQuery, ResultFilter, SpeechRecognizer};
use polylog_core::TransportError;
use polylog_providers::MockEvaluator;

fn content_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../content")
}

fn t0() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
}

fn open_engine(data_dir: &Path, evaluator: MockEvaluator, clock: Clock) -> PracticeEngine {
    let store = Arc::new(FileStore::open(data_dir, Some(&content_dir())).unwrap());
    PracticeEngine::with_store(store, EngineConfig { parallelism: 2 })
        .with_evaluator(Arc::new(evaluator))
        .with_clock(clock)
}

fn query(module_id: &str, test_id: &str, day: Option<u32>) -> ContentQuery {
    ContentQuery {
        language: Language::English,
        module_id: module_id.into(),
        test_id: test_id.into(),
        mode: ContentMode::Review,
        day,
    }
}

fn reviewer() -> MockEvaluator {
    let mut responses = HashMap::new();
    responses.insert(
        "학생".to_string(),
        serde_json::json!({
            "문법": {"스코어": 90, "피드백": "좋아요"},
            "총점": {"스코어": 88, "피드백": "훌륭합니다"}
        }),
    );
    MockEvaluator::new(responses).failing_on("비가")
}

/// Recognizer that answers from a script keyed by prompt substring.
struct ScriptedRecognizer(Vec<(&'static str, Option<&'static str>)>);

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn recognize(&self, _language: Language, prompt: &str) -> Result<String, TransportError> {
        match self.0.iter().find(|(needle, _)| prompt.contains(needle)) {
            Some((_, Some(transcript))) => Ok(transcript.to_string()),
            _ => Err(TransportError::Network("microphone unavailable".into())),
        }
    }
}

#[tokio::test]
async fn e2e_practice_day_then_dashboard() {
    let data = tempfile::tempdir().unwrap();
    let session = Session::new("ana@example.com", Language::English);
    let engine = open_engine(data.path(), reviewer(), Clock::fixed(t0()));

    // Vocabulary: four of five right.
    let selections = [Some(1), Some(0), Some(2), Some(0), None];
    let graded = engine
        .submit_choices(
            &session,
            &query("300", "301", Some(1)),
            &selections,
            TestMode::MultipleChoice,
        )
        .await
        .unwrap();
    assert!((graded.total - 80.0).abs() < 1e-9);
    assert_eq!(graded.items[0].user_answer, "사과");
    assert_eq!(graded.items[4].user_answer, "");

    // Translation review: one request times out, the others are kept.
    let answers = vec![
        "I am a student.".to_string(),
        "It rains today.".to_string(),
        "I met a friend yesterday.".to_string(),
    ];
    let review = engine
        .review_batch(&session, &query("200", "201", Some(1)), &answers, &NoopReporter)
        .await
        .unwrap();
    assert_eq!(review.succeeded, 2);
    assert_eq!(review.failed, 1);
    match &review.items[0].outcome {
        ReviewOutcome::Reviewed { feedback, .. } => {
            assert_eq!(feedback.overall_score, 88.0);
            assert_eq!(feedback.overall_text(), "훌륭합니다");
        }
        other => panic!("expected a review, got {other:?}"),
    }
    assert!(matches!(review.items[1].outcome, ReviewOutcome::Failed(_)));

    engine
        .record_completion(&session, &ModuleCode::new("300-301-1"), Some(1))
        .await
        .unwrap();
    engine
        .record_completion(&session, &ModuleCode::new("300-301-1"), Some(1))
        .await
        .unwrap();

    // Reopen: everything above must come back from disk.
    let reopened = open_engine(data.path(), MockEvaluator::default(), Clock::fixed(t0()));
    let dashboard = reopened
        .dashboard(&session, &ResultFilter::default(), &AnalyticsConfig::default())
        .await
        .unwrap();

    assert_eq!(dashboard.total_tests, 7);
    assert_eq!(dashboard.completed_tests, 1);
    assert_eq!(dashboard.study_days, 1);
    assert_eq!(dashboard.kpis.completed_tests.status, KpiStatus::Neutral);

    let categories: Vec<&str> = dashboard
        .score_by_module
        .iter()
        .map(|m| m.category.as_str())
        .collect();
    // Only the reviewed translations carry scores to average.
    assert_eq!(categories, vec!["200"]);
    assert_eq!(dashboard.score_by_module[0].count, 2);
    assert_eq!(dashboard.average_score, dashboard.score_by_module[0].average_score);
    assert!(dashboard.average_score >= 44.0);
    assert_eq!(dashboard.progress_over_time.len(), 2);
    assert_eq!(dashboard.module_distribution[0].percentage, 100.0);

    assert_eq!(
        dashboard.top_missed_questions[0].question,
        "What does 'weather' mean?"
    );
    assert_eq!(dashboard.top_missed_questions[0].miss_rate, 100.0);

    let recent = &dashboard.recent_results;
    assert_eq!(recent.len(), 7);
    assert_eq!(recent.iter().filter(|r| r.score.is_some()).count(), 2);
    assert_eq!(recent.iter().find_map(|r| r.score), Some(88.0));

    let translation_only = reopened
        .dashboard(
            &session,
            &ResultFilter {
                category: Some("200".into()),
                since: None,
            },
            &AnalyticsConfig::default(),
        )
        .await
        .unwrap();
    assert_eq!(translation_only.total_tests, 2);
    assert_eq!(translation_only.completed_tests, 0);
}

#[tokio::test]
async fn e2e_speech_capture_and_grading() {
    let data = tempfile::tempdir().unwrap();
    let session = Session::new("kenji@example.com", Language::English);
    let engine = open_engine(data.path(), MockEvaluator::default(), Clock::fixed(t0()));

    let q = query("100", "101", Some(1));
    let items = engine.load_questions(&q).await.unwrap();
    let recognizer = ScriptedRecognizer(vec![
        ("Good morning", Some("good morning")),
        ("Nice to meet", None),
        ("again", Some("could you say that again")),
    ]);

    let transcripts = engine
        .capture_transcripts(&session, &recognizer, &items)
        .await;
    assert_eq!(transcripts[1], "");

    let graded = engine.submit_speech(&session, &q, &transcripts).await.unwrap();
    assert_eq!(graded.items[0].score, 100.0);
    assert_eq!(graded.items[1].score, 0.0);
    assert!((graded.total - 200.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn e2e_period_filter_drops_old_results() {
    let data = tempfile::tempdir().unwrap();
    let session = Session::new("ana@example.com", Language::English);

    let old = open_engine(
        data.path(),
        MockEvaluator::default(),
        Clock::fixed(t0() - Duration::days(40)),
    );
    old.submit_choices(
        &session,
        &query("700", "701", Some(1)),
        &[Some(0), Some(1)],
        TestMode::ListeningComprehension,
    )
    .await
    .unwrap();

    let recent = open_engine(data.path(), MockEvaluator::default(), Clock::fixed(t0()));
    recent
        .submit_choices(
            &session,
            &query("300", "301", Some(2)),
            &[Some(0), Some(0)],
            TestMode::MultipleChoice,
        )
        .await
        .unwrap();

    let filter = ResultFilter {
        category: None,
        since: Some(t0() - Duration::days(30)),
    };
    let dashboard = recent
        .dashboard(&session, &filter, &AnalyticsConfig::default())
        .await
        .unwrap();
    assert_eq!(dashboard.total_tests, 2);
    assert!(dashboard
        .recent_results
        .iter()
        .all(|r| r.module_code.starts_with("300-")));

    let everything = recent
        .dashboard(&session, &ResultFilter::default(), &AnalyticsConfig::default())
        .await
        .unwrap();
    assert_eq!(everything.total_tests, 4);
    assert!(everything.recent_results[2].module_code.starts_with("700-"));
    assert_eq!(everything.recent_results[2].label, "Reading");
}
