//! Dashboard snapshots with JSON persistence and markdown rendering.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analytics::{DashboardModel, Kpi, Period};
use crate::model::Language;

/// A dashboard computed for one learner at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub language: Language,
    /// Window the results were read for.
    pub period: Period,
    pub dashboard: DashboardModel,
}

impl DashboardReport {
    pub fn new(
        user_id: impl Into<String>,
        language: Language,
        period: Period,
        created_at: DateTime<Utc>,
        dashboard: DashboardModel,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at,
            user_id: user_id.into(),
            language,
            period,
            dashboard,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: DashboardReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let d = &self.dashboard;
        let mut md = String::new();

        md.push_str(&format!(
            "## Dashboard for {} ({}, {})\n\n",
            self.user_id, self.language, self.period
        ));

        md.push_str("| KPI | Value | Goal | Status |\n");
        md.push_str("|-----|-------|------|--------|\n");
        let row = |name: &str, kpi: &Kpi, unit: &str| {
            format!(
                "| {name} | {:.1}{unit} | {:.0}{unit} | {} |\n",
                kpi.value, kpi.goal, kpi.status
            )
        };
        md.push_str(&row("Total tests", &d.kpis.total_tests, ""));
        md.push_str(&row("Completed tests", &d.kpis.completed_tests, ""));
        md.push_str(&row("Average score", &d.kpis.average_score, "%"));
        md.push_str(&row("Study days", &d.kpis.study_days, ""));
        md.push_str(&row("Improvement", &d.kpis.improvement, "%"));
        md.push('\n');

        if !d.score_by_module.is_empty() {
            md.push_str("### Score by module\n\n");
            md.push_str("| Module | Average | Responses |\n");
            md.push_str("|--------|---------|-----------|\n");
            for m in &d.score_by_module {
                md.push_str(&format!(
                    "| {} | {:.1}% | {} |\n",
                    m.label, m.average_score, m.count
                ));
            }
            md.push('\n');
        }

        if !d.top_missed_questions.is_empty() {
            md.push_str("### Most missed questions\n\n");
            md.push_str("| Question | Miss rate | Attempts |\n");
            md.push_str("|----------|-----------|----------|\n");
            for q in &d.top_missed_questions {
                md.push_str(&format!(
                    "| {} | {:.1}% | {} |\n",
                    q.label, q.miss_rate, q.total
                ));
            }
            md.push('\n');
        }

        if !d.recent_results.is_empty() {
            md.push_str("### Recent results\n\n");
            md.push_str("| Module | Date | Score |\n");
            md.push_str("|--------|------|-------|\n");
            for r in &d.recent_results {
                md.push_str(&format!(
                    "| {} | {} | {} |\n",
                    r.label,
                    r.timestamp.format("%Y-%m-%d"),
                    score_cell(r.score)
                ));
            }
        }

        md
    }
}

/// A reviewed score as a percentage, `N/A` when there is none.
pub fn score_cell(score: Option<f64>) -> String {
    match score {
        Some(s) => format!("{s:.1}%"),
        None => "N/A".to_string(),
    }
}
