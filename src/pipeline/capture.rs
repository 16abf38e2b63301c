use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use std::path::PathBuf;
use tracing::{error, info};

use crate::artifacts::naming;
use crate::artifacts::ArtifactStore;
use crate::config::Parameters;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub sort: String,
    pub order: String,
    pub per_page: u32,
}

/// Issue search backend. Only the top-level shape of the reply matters here.
#[async_trait]
pub trait IssueSearch: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<serde_json::Value>;
}

#[derive(Debug, Default)]
pub struct CaptureReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<String>,
    pub empty: Vec<String>,
}

/// Lower bound on issue creation, `%Y-%m-%d`.
pub fn date_filter(now: NaiveDateTime, days_back: i64) -> String {
    (now - Duration::days(days_back)).format("%Y-%m-%d").to_string()
}

pub fn final_query(target: &str, date: &str) -> String {
    format!("{} created:>{}", target, date)
}

/// `null`, `[]` and `{}` count as nothing to save.
fn is_empty_payload(payload: &serde_json::Value) -> bool {
    match payload {
        serde_json::Value::Null => true,
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn item_count(payload: &serde_json::Value) -> usize {
    match payload {
        serde_json::Value::Array(items) => items.len(),
        other => other
            .get("items")
            .and_then(|i| i.as_array())
            .map_or(0, |i| i.len()),
    }
}

/// Query every target once and persist each non-empty reply.
pub async fn run(
    store: &ArtifactStore,
    search: &dyn IssueSearch,
    targets: &[String],
    params: &Parameters,
    now: NaiveDateTime,
) -> Result<CaptureReport> {
    let date = date_filter(now, params.days_back);
    info!(
        targets = targets.len(),
        days_back = params.days_back,
        "Starting capture"
    );

    let mut report = CaptureReport::default();
    for target in targets {
        let request = SearchRequest {
            query: final_query(target, &date),
            sort: "created".to_string(),
            order: "desc".to_string(),
            per_page: params.max_results,
        };
        let source = naming::source_name(target);
        info!(query = %request.query, source = %source, "Searching");

        let payload = match search.search(&request).await {
            Ok(payload) => payload,
            Err(e) => {
                error!(search_target = %target, "Search failed: {:#}", e);
                report.failed.push(target.clone());
                continue;
            }
        };

        if is_empty_payload(&payload) {
            info!(source = %source, "Search returned nothing, no artifact written");
            report.empty.push(target.clone());
            continue;
        }

        let (path, bytes) = match store.write_raw(&source, &payload, now) {
            Ok(written) => written,
            Err(e) => {
                error!(source = %source, "Failed to save raw capture: {:#}", e);
                report.failed.push(target.clone());
                continue;
            }
        };
        info!(
            path = %path.display(),
            items = item_count(&payload),
            digest = %blake3::hash(&bytes).to_hex(),
            "Raw capture saved"
        );
        report.written.push(path);
    }

    Ok(report)
}
