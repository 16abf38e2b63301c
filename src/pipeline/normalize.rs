use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDateTime;
use tracing::{error, info, warn};

use crate::artifacts::manifest::Manifest;
use crate::artifacts::naming;
use crate::artifacts::types::{IssueRecord, NormalizedRecord};
use crate::artifacts::ArtifactStore;

#[derive(Debug, Default)]
pub struct NormalizeReport {
    /// (raw capture, normalized CSV)
    pub written: Vec<(PathBuf, PathBuf)>,
    pub skipped_digested: usize,
    pub empty: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// Map raw issue values into the fixed schema. Values that are not JSON
/// objects are dropped with a warning.
pub fn normalize_items(items: Vec<serde_json::Value>) -> Vec<NormalizedRecord> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<IssueRecord>(item) {
            Ok(issue) => Some(NormalizedRecord::from(issue)),
            Err(e) => {
                warn!(index, "Skipping unreadable issue record: {}", e);
                None
            }
        })
        .collect()
}

fn process_file(store: &ArtifactStore, raw: &Path, now: NaiveDateTime) -> Result<Option<PathBuf>> {
    let stem = raw
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("unreadable file name: {}", raw.display()))?;
    let core = naming::core_name_from_raw(stem);

    let items = match store.load_raw_items(raw) {
        Ok(items) => items,
        Err(e) => {
            error!("{}", e);
            Vec::new()
        }
    };

    let records = normalize_items(items);
    if records.is_empty() {
        warn!(core = %core, "No records to save, skipping");
        return Ok(None);
    }

    let csv = store.write_normalized(&core, &records, now)?;
    info!(rows = records.len(), path = %csv.display(), "Normalized table saved");
    Ok(Some(csv))
}

/// Normalize raw captures into `processed_<core>_<stamp>` tables stamped with
/// `now`. Unless `reprocess` is set, captures already digested according to
/// the manifest are left alone.
pub fn run(store: &ArtifactStore, reprocess: bool, now: NaiveDateTime) -> Result<NormalizeReport> {
    let mut report = NormalizeReport::default();

    let mut raw_files = store.discover_raw()?;
    if raw_files.is_empty() {
        warn!(dir = %store.raw_dir().display(), "No raw captures found");
        return Ok(report);
    }

    if !reprocess {
        let manifest = Manifest::scan(store)?;
        let before = raw_files.len();
        raw_files.retain(|raw| !manifest.is_digested(raw));
        report.skipped_digested = before - raw_files.len();
        if raw_files.is_empty() {
            info!(skipped = report.skipped_digested, "All raw captures already normalized");
            return Ok(report);
        }
    }

    info!(files = raw_files.len(), "Starting normalization batch");

    for raw in raw_files {
        let name = raw
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(file = %name, "Processing");

        match process_file(store, &raw, now) {
            Ok(Some(csv)) => report.written.push((raw, csv)),
            Ok(None) => report.empty.push(raw),
            Err(e) => {
                error!(file = %name, "Normalization failed: {:#}", e);
                report.failed.push(raw);
            }
        }
    }

    Ok(report)
}
