//! Dashboard analytics.
//!
//! Rolls up one learner's response and progress records (for one language)
//! into a [`DashboardModel`]. Aggregation is pure and deterministic: groups
//! keep the order in which their key first appears in the input, and every
//! sort is stable.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::feedback::parse_feedback_str;
use crate::model::{ProgressRecord, ResponseRecord};

/// Maximum number of points kept in the score time series.
pub const MAX_TIME_SERIES_POINTS: usize = 30;
/// Maximum number of entries in the most-missed ranking.
pub const MAX_MISSED_QUESTIONS: usize = 10;
/// Characters of question text kept in a ranking label.
pub const QUESTION_LABEL_CHARS: usize = 30;
/// Label used for records with no question text.
pub const UNKNOWN_QUESTION: &str = "Unknown";
/// Number of latest responses listed as recent activity.
pub const MAX_RECENT_RESULTS: usize = 10;

/// KPI goals, status thresholds, and module labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub total_tests_goal: f64,
    pub total_tests_positive: f64,
    pub completed_tests_goal: f64,
    pub completed_tests_positive: f64,
    pub average_score_goal: f64,
    pub average_score_positive: f64,
    pub average_score_warning: f64,
    pub study_days_goal: f64,
    pub study_days_positive: f64,
    pub improvement_goal: f64,
    /// Display label per module category code.
    pub module_labels: BTreeMap<String, String>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        let module_labels = [
            ("100", "Pronunciation"),
            ("200", "Grammar"),
            ("300", "Vocabulary"),
            ("400", "Exam"),
            ("700", "Reading"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            total_tests_goal: 100.0,
            total_tests_positive: 50.0,
            completed_tests_goal: 80.0,
            completed_tests_positive: 40.0,
            average_score_goal: 85.0,
            average_score_positive: 85.0,
            average_score_warning: 70.0,
            study_days_goal: 30.0,
            study_days_positive: 20.0,
            improvement_goal: 10.0,
            module_labels,
        }
    }
}

impl AnalyticsConfig {
    /// Display label for a category code, `Module <code>` when unconfigured.
    pub fn label_for(&self, category: &str) -> String {
        self.module_labels
            .get(category)
            .cloned()
            .unwrap_or_else(|| format!("Module {category}"))
    }
}

/// Reporting window for dashboard reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
    Quarter,
    #[default]
    All,
}

impl Period {
    /// Start of the window ending at `now`, `None` for all time.
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = match self {
            Period::Week => 7,
            Period::Month => 30,
            Period::Quarter => 90,
            Period::All => return None,
        };
        Some(now - Duration::days(days))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Week => write!(f, "7d"),
            Period::Month => write!(f, "30d"),
            Period::Quarter => write!(f, "90d"),
            Period::All => write!(f, "all"),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "7d" | "week" => Ok(Period::Week),
            "30d" | "month" => Ok(Period::Month),
            "90d" | "quarter" => Ok(Period::Quarter),
            "all" => Ok(Period::All),
            other => Err(format!("unknown period: {other} (expected 7d, 30d, 90d, all)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KpiStatus {
    Positive,
    Warning,
    Negative,
    Neutral,
}

impl fmt::Display for KpiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KpiStatus::Positive => write!(f, "positive"),
            KpiStatus::Warning => write!(f, "warning"),
            KpiStatus::Negative => write!(f, "negative"),
            KpiStatus::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub value: f64,
    pub goal: f64,
    pub status: KpiStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSet {
    pub total_tests: Kpi,
    pub completed_tests: Kpi,
    pub average_score: Kpi,
    pub study_days: Kpi,
    pub improvement: Kpi,
}

/// Share of completed modules in one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleShare {
    pub category: String,
    pub label: String,
    pub count: usize,
    /// Percent of all completed modules.
    pub percentage: f64,
}

/// Mean resolved score of one category's responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleScore {
    pub category: String,
    pub label: String,
    pub average_score: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorePoint {
    pub timestamp: DateTime<Utc>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissedQuestion {
    pub question: String,
    /// `question` cut to [`QUESTION_LABEL_CHARS`] characters, with `...`
    /// appended when cut.
    pub label: String,
    pub miss_rate: f64,
    pub total: usize,
    pub correct: usize,
}

/// One entry of the recent-activity list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentResult {
    pub module_code: String,
    pub label: String,
    pub timestamp: DateTime<Utc>,
    /// Reviewed overall score; `None` for responses without usable feedback.
    pub score: Option<f64>,
}

/// Everything the dashboard renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardModel {
    pub total_tests: usize,
    pub completed_tests: usize,
    pub average_score: f64,
    pub study_days: usize,
    pub improvement: f64,
    pub kpis: KpiSet,
    pub module_distribution: Vec<ModuleShare>,
    pub score_by_module: Vec<ModuleScore>,
    pub progress_over_time: Vec<ScorePoint>,
    pub top_missed_questions: Vec<MissedQuestion>,
    /// Latest responses first.
    #[serde(default)]
    pub recent_results: Vec<RecentResult>,
}

/// The overall score in a response's feedback.
///
/// Only AI-reviewed responses carry feedback. Responses without feedback, or
/// whose feedback does not parse, resolve to `None` and stay out of the
/// score averages and the time series.
pub fn resolved_score(record: &ResponseRecord) -> Option<f64> {
    let raw = record.feedback.as_deref()?;
    match parse_feedback_str(raw) {
        Ok(parsed) => Some(parsed.overall_score),
        Err(e) => {
            tracing::debug!(
                "excluding response to '{}' from analytics: {e}",
                record.question_text
            );
            None
        }
    }
}

/// Aggregate one learner's records into a dashboard model.
pub fn aggregate(
    results: &[ResponseRecord],
    progress: &[ProgressRecord],
    config: &AnalyticsConfig,
) -> DashboardModel {
    let resolved: Vec<(&ResponseRecord, f64)> = results
        .iter()
        .filter_map(|r| resolved_score(r).map(|s| (r, s)))
        .collect();
    let completed: Vec<&ProgressRecord> = progress.iter().filter(|p| p.completed).collect();

    let total_tests = results.len();
    let completed_tests = completed.len();
    let average_score = mean(resolved.iter().map(|(_, s)| *s));

    let study_days = completed
        .iter()
        .map(|p| p.completed_at.date_naive())
        .collect::<HashSet<NaiveDate>>()
        .len();

    let module_distribution = group_in_order(completed.iter().map(|p| p.module_code.category()))
        .into_iter()
        .map(|(category, members)| ModuleShare {
            label: config.label_for(category),
            category: category.to_string(),
            count: members.len(),
            percentage: percent(members.len(), completed_tests),
        })
        .collect();

    let score_by_module = group_in_order(resolved.iter().map(|(r, _)| r.module_code.category()))
        .into_iter()
        .map(|(category, members)| ModuleScore {
            label: config.label_for(category),
            category: category.to_string(),
            average_score: mean(members.iter().map(|&i| resolved[i].1)),
            count: members.len(),
        })
        .collect();

    let progress_over_time = time_series(&resolved);
    let improvement = improvement(&progress_over_time);
    let top_missed_questions = top_missed(results);
    let recent_results = recent(results, config);

    let kpis = KpiSet {
        total_tests: Kpi {
            value: total_tests as f64,
            goal: config.total_tests_goal,
            status: at_least(total_tests as f64, config.total_tests_positive),
        },
        completed_tests: Kpi {
            value: completed_tests as f64,
            goal: config.completed_tests_goal,
            status: at_least(completed_tests as f64, config.completed_tests_positive),
        },
        average_score: Kpi {
            value: average_score,
            goal: config.average_score_goal,
            status: if average_score >= config.average_score_positive {
                KpiStatus::Positive
            } else if average_score >= config.average_score_warning {
                KpiStatus::Warning
            } else {
                KpiStatus::Negative
            },
        },
        study_days: Kpi {
            value: study_days as f64,
            goal: config.study_days_goal,
            status: at_least(study_days as f64, config.study_days_positive),
        },
        improvement: Kpi {
            value: improvement,
            goal: config.improvement_goal,
            status: KpiStatus::Neutral,
        },
    };

    DashboardModel {
        total_tests,
        completed_tests,
        average_score,
        study_days,
        improvement,
        kpis,
        module_distribution,
        score_by_module,
        progress_over_time,
        top_missed_questions,
        recent_results,
    }
}

fn at_least(value: f64, threshold: f64) -> KpiStatus {
    if value >= threshold {
        KpiStatus::Positive
    } else {
        KpiStatus::Neutral
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Group indices by key, groups ordered by first appearance.
fn group_in_order<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(&'a str, Vec<usize>)> {
    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, key) in keys.enumerate() {
        match index.get(key) {
            Some(&g) => groups[g].1.push(i),
            None => {
                index.insert(key, groups.len());
                groups.push((key, vec![i]));
            }
        }
    }
    groups
}

fn time_series(resolved: &[(&ResponseRecord, f64)]) -> Vec<ScorePoint> {
    let mut points: Vec<ScorePoint> = resolved
        .iter()
        .map(|(r, score)| ScorePoint {
            timestamp: r.timestamp,
            score: *score,
        })
        .collect();
    points.sort_by_key(|p| p.timestamp);
    let skip = points.len().saturating_sub(MAX_TIME_SERIES_POINTS);
    points.split_off(skip)
}

/// Percent change from the first to the last point.
fn improvement(points: &[ScorePoint]) -> f64 {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() >= 2 && first.score != 0.0 => {
            (last.score - first.score) / first.score * 100.0
        }
        _ => 0.0,
    }
}

/// Miss rates over every response; a stored score above 0 counts as correct.
fn top_missed(results: &[ResponseRecord]) -> Vec<MissedQuestion> {
    let questions = results.iter().map(|r| {
        if r.question_text.is_empty() {
            UNKNOWN_QUESTION
        } else {
            r.question_text.as_str()
        }
    });

    let mut ranking: Vec<MissedQuestion> = group_in_order(questions)
        .into_iter()
        .map(|(question, members)| {
            let total = members.len();
            let correct = members.iter().filter(|&&i| results[i].score > 0.0).count();
            MissedQuestion {
                question: question.to_string(),
                label: question_label(question),
                miss_rate: percent(total - correct, total),
                total,
                correct,
            }
        })
        .collect();

    ranking.sort_by(|a, b| b.miss_rate.total_cmp(&a.miss_rate));
    ranking.truncate(MAX_MISSED_QUESTIONS);
    ranking
}

fn recent(results: &[ResponseRecord], config: &AnalyticsConfig) -> Vec<RecentResult> {
    let mut latest: Vec<&ResponseRecord> = results.iter().collect();
    latest.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    latest
        .into_iter()
        .take(MAX_RECENT_RESULTS)
        .map(|r| RecentResult {
            module_code: r.module_code.to_string(),
            label: config.label_for(r.module_code.category()),
            timestamp: r.timestamp,
            score: resolved_score(r),
        })
        .collect()
}

fn question_label(question: &str) -> String {
    if question.chars().count() > QUESTION_LABEL_CHARS {
        let cut: String = question.chars().take(QUESTION_LABEL_CHARS).collect();
        format!("{cut}...")
    } else {
        question.to_string()
    }
}
