use anyhow::Result;
use chrono::Local;
use tracing::info;

use crate::github::GithubClient;
use crate::llm::LlmClient;
use crate::pipeline::{analyze, capture, enrich, normalize};
use crate::state::AppState;

pub async fn capture(state: &AppState) -> Result<()> {
    let search = GithubClient::from_env()?;
    let report = capture::run(
        &state.store,
        &search,
        &state.settings.github.targets,
        &state.settings.parameters,
        Local::now().naive_local(),
    )
    .await?;

    info!(
        written = report.written.len(),
        failed = report.failed.len(),
        empty = report.empty.len(),
        "Capture finished"
    );
    Ok(())
}

pub fn normalize(state: &AppState, reprocess: bool) -> Result<()> {
    let report = normalize::run(&state.store, reprocess, Local::now().naive_local())?;
    info!(
        written = report.written.len(),
        skipped = report.skipped_digested,
        empty = report.empty.len(),
        failed = report.failed.len(),
        "Normalization finished"
    );
    Ok(())
}

pub async fn enrich(state: &AppState, all: bool) -> Result<()> {
    let classifier = LlmClient::from_env()?;
    let report = enrich::run(&state.store, &classifier, &state.enrich_options(all)).await?;
    info!(
        written = report.written.len(),
        failed = report.failed.len(),
        rows = report.rows,
        row_failures = report.row_failures,
        "Enrichment finished"
    );
    Ok(())
}

pub fn analyze(state: &AppState) -> Result<()> {
    match analyze::run(&state.store, &state.analyze_options())? {
        Some(report) => info!(
            rows = report.issues,
            labels = report.top_labels.len(),
            cells = report.matrix.cells.len(),
            sources = report.ranking.len(),
            plots = report.plots.len(),
            "Analysis finished, see {}",
            state.store.plots_dir().display()
        ),
        None => info!("Nothing to analyze"),
    }
    Ok(())
}
