//! The `polylog dashboard` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use polylog_core::analytics::{DashboardModel, Kpi, Period};
use polylog_core::report::{score_cell, DashboardReport};
use polylog_core::traits::ResultFilter;

use crate::SessionArgs;

pub async fn execute(
    config_path: Option<PathBuf>,
    session_args: SessionArgs,
    period: Period,
    category: Option<String>,
    format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(
        matches!(format.as_str(), "table" | "json" | "markdown"),
        "unknown format '{format}', expected table, json, or markdown"
    );

    let (engine, config) = super::open_engine(config_path)?;
    let session = super::session(&session_args);
    let now = chrono::Utc::now();
    let filter = ResultFilter {
        category,
        since: period.since(now),
    };

    let dashboard = engine.dashboard(&session, &filter, &config.analytics).await?;
    let report = DashboardReport::new(
        session.user_id.clone(),
        session.language,
        period,
        now,
        dashboard,
    );

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "markdown" => print!("{}", report.to_markdown()),
        _ => print_tables(&report.dashboard),
    }

    if let Some(path) = output {
        report.save_json(&path)?;
        eprintln!("Dashboard saved to: {}", path.display());
    }

    Ok(())
}

fn print_tables(d: &DashboardModel) {
    let mut kpis = Table::new();
    kpis.set_header(vec!["KPI", "Value", "Goal", "Status"]);
    let mut kpi_row = |name: &str, kpi: &Kpi, unit: &str| {
        kpis.add_row(vec![
            Cell::new(name),
            Cell::new(format!("{:.1}{unit}", kpi.value)),
            Cell::new(format!("{:.0}{unit}", kpi.goal)),
            Cell::new(kpi.status),
        ]);
    };
    kpi_row("Total tests", &d.kpis.total_tests, "");
    kpi_row("Completed tests", &d.kpis.completed_tests, "");
    kpi_row("Average score", &d.kpis.average_score, "%");
    kpi_row("Study days", &d.kpis.study_days, "");
    kpi_row("Improvement", &d.kpis.improvement, "%");
    println!("{kpis}");

    if !d.module_distribution.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Module", "Completed", "Share"]);
        for m in &d.module_distribution {
            table.add_row(vec![
                Cell::new(&m.label),
                Cell::new(m.count),
                Cell::new(format!("{:.1}%", m.percentage)),
            ]);
        }
        println!("\n{table}");
    }

    if !d.score_by_module.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Module", "Average", "Responses"]);
        for m in &d.score_by_module {
            table.add_row(vec![
                Cell::new(&m.label),
                Cell::new(format!("{:.1}%", m.average_score)),
                Cell::new(m.count),
            ]);
        }
        println!("\n{table}");
    }

    if !d.top_missed_questions.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Question", "Miss rate", "Attempts"]);
        for q in &d.top_missed_questions {
            table.add_row(vec![
                Cell::new(&q.label),
                Cell::new(format!("{:.1}%", q.miss_rate)),
                Cell::new(q.total),
            ]);
        }
        println!("\n{table}");
    }

    if !d.recent_results.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Recent", "Date", "Score"]);
        for r in &d.recent_results {
            table.add_row(vec![
                Cell::new(&r.label),
                Cell::new(r.timestamp.format("%Y-%m-%d")),
                Cell::new(score_cell(r.score)),
            ]);
        }
        println!("\n{table}");
    }
}
