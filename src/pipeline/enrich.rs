use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use crate::artifacts::manifest::Manifest;
use crate::artifacts::naming;
use crate::artifacts::types::{EnrichedRecord, NormalizedRecord};
use crate::artifacts::ArtifactStore;
use crate::categories::Classification;

const TRUNCATION_MARKER: &str = "...";
const PROGRESS_EVERY: usize = 10;

/// Text classification backend.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification>;
}

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Enrich every normalized CSV instead of the latest one per core.
    pub all: bool,
    pub concurrency: usize,
    pub text_limit: usize,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            all: false,
            concurrency: 1,
            text_limit: 2000,
        }
    }
}

#[derive(Debug, Default)]
pub struct EnrichReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    pub rows: usize,
    pub row_failures: usize,
}

/// `Title: ..\nBody: ..`, cut to `limit` characters plus a marker.
pub fn classification_text(title: &str, body: &str, limit: usize) -> String {
    let text = format!("Title: {}\nBody: {}", title, body);
    if text.chars().count() <= limit {
        return text;
    }
    let mut cut: String = text.chars().take(limit).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

/// Classify every record. Output order matches input order; a failed row gets
/// the sentinel verdict and never affects its neighbours.
pub async fn classify_records(
    classifier: &dyn Classifier,
    records: &[NormalizedRecord],
    opts: &EnrichOptions,
) -> (Vec<Classification>, usize) {
    let total = records.len();
    let mut verdicts = Vec::with_capacity(total);
    let mut failures = 0;

    let mut results = stream::iter(records.iter().enumerate())
        .map(|(index, record)| async move {
            let text = classification_text(
                record.title.as_deref().unwrap_or_default(),
                &record.body,
                opts.text_limit,
            );
            (index, classifier.classify(&text).await)
        })
        .buffered(opts.concurrency.max(1));

    while let Some((index, result)) = results.next().await {
        let verdict = match result {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(row = index + 1, "Classification failed: {:#}", e);
                failures += 1;
                Classification::sentinel()
            }
        };
        verdicts.push(verdict);

        if (index + 1) % PROGRESS_EVERY == 0 {
            info!("Progress: {}/{} rows classified", index + 1, total);
        }
    }

    (verdicts, failures)
}

async fn enrich_file(
    store: &ArtifactStore,
    classifier: &dyn Classifier,
    csv: &Path,
    opts: &EnrichOptions,
) -> Result<(PathBuf, usize, usize)> {
    let stem = csv
        .file_stem()
        .and_then(|s| s.to_str())
        .context("unreadable file name")?;
    let core = naming::core_name_from_processed(stem);

    let records = store.read_normalized(csv)?;
    let (verdicts, failures) = classify_records(classifier, &records, opts).await;
    let rows = records.len();

    let enriched: Vec<EnrichedRecord> = records
        .into_iter()
        .zip(verdicts)
        .map(|(record, verdict)| EnrichedRecord::new(record, verdict))
        .collect();

    let path = store.write_enriched(&core, &enriched)?;
    Ok((path, rows, failures))
}

/// Classify normalized tables into `enriched_<core>.csv`.
pub async fn run(
    store: &ArtifactStore,
    classifier: &dyn Classifier,
    opts: &EnrichOptions,
) -> Result<EnrichReport> {
    let mut report = EnrichReport::default();

    let files = if opts.all {
        store.discover_processed_csv()?
    } else {
        Manifest::scan(store)?.latest_normalized()
    };

    if files.is_empty() {
        warn!(dir = %store.processed_dir().display(), "No normalized tables found");
        return Ok(report);
    }

    info!(
        files = files.len(),
        concurrency = opts.concurrency,
        "Starting enrichment batch"
    );

    for csv in files {
        let name = csv
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(file = %name, "Enriching");

        match enrich_file(store, classifier, &csv, opts).await {
            Ok((path, rows, failures)) => {
                info!(
                    path = %path.display(),
                    rows,
                    failures,
                    "Enriched table saved"
                );
                report.rows += rows;
                report.row_failures += failures;
                report.written.push(path);
            }
            Err(e) => {
                error!(file = %name, "Enrichment failed: {:#}", e);
                report.failed.push(csv);
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::types::IssueRecord;
    use crate::categories::{Category, Sentiment, Urgency};
    use chrono::{NaiveDate, NaiveDateTime};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Fails on any title containing "boom", otherwise negative/bug/high.
    struct FakeClassifier {
        calls: AtomicUsize,
    }

    impl FakeClassifier {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Classifier for FakeClassifier {
        async fn classify(&self, text: &str) -> Result<Classification> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains("boom") {
                anyhow::bail!("service unavailable");
            }
            Ok(Classification {
                sentiment: Sentiment::Negative,
                category: Category::Bug,
                urgency: Urgency::High,
            })
        }
    }

    /// Answers later rows sooner, to shake out ordering bugs.
    struct SlowFirstClassifier;

    #[async_trait]
    impl Classifier for SlowFirstClassifier {
        async fn classify(&self, text: &str) -> Result<Classification> {
            let n: u64 = text
                .trim_start_matches("Title: row ")
                .split('\n')
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(40 - n * 10)).await;
            let sentiment = if n % 2 == 0 {
                Sentiment::Positive
            } else {
                Sentiment::Negative
            };
            Ok(Classification {
                sentiment,
                category: Category::Question,
                urgency: Urgency::Low,
            })
        }
    }

    fn record(title: &str) -> NormalizedRecord {
        let mut r = NormalizedRecord::from(IssueRecord::default());
        r.title = Some(title.to_string());
        r.body = format!("body of {}", title);
        r
    }

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_classification_text_truncates() {
        let short = classification_text("t", "b", 2000);
        assert_eq!(short, "Title: t\nBody: b");

        let body = "é".repeat(5000);
        let long = classification_text("t", &body, 2000);
        assert_eq!(long.chars().count(), 2000 + TRUNCATION_MARKER.len());
        assert!(long.ends_with("..."));
        assert!(long.starts_with("Title: t\nBody: é"));
    }

    #[test]
    fn test_classification_text_at_exact_limit_is_untouched() {
        let text = classification_text("abc", "", 17);
        assert_eq!(text, "Title: abc\nBody: ");
        assert_eq!(text.chars().count(), 17);
    }

    #[test]
    fn test_classification_text_one_over_limit_is_cut() {
        let text = classification_text("abc", "", 16);
        assert_eq!(text, "Title: abc\nBody:...");
        assert_eq!(text.chars().count(), 16 + TRUNCATION_MARKER.len());
    }

    #[tokio::test]
    async fn test_failed_row_gets_sentinel_and_others_survive() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::open(tmp.path()).unwrap();
        let records = vec![record("first"), record("boom"), record("third")];
        store.write_normalized("acme_widgets", &records, at(12)).unwrap();

        let classifier = FakeClassifier::new();
        let report = run(&store, &classifier, &EnrichOptions::default())
            .await
            .unwrap();

        assert_eq!(report.written.len(), 1);
        assert_eq!(report.rows, 3);
        assert_eq!(report.row_failures, 1);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 3);

        let path = store.enriched_dir().join("enriched_acme_widgets.csv");
        assert_eq!(report.written[0], path);
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<EnrichedRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);

        assert_eq!(
            (rows[0].sentiment.as_str(), rows[0].category.as_str(), rows[0].urgency.as_str()),
            ("negative", "bug", "high")
        );
        assert_eq!(
            (rows[1].sentiment.as_str(), rows[1].category.as_str(), rows[1].urgency.as_str()),
            ("error", "unknown", "unknown")
        );
        assert_eq!(
            (rows[2].sentiment.as_str(), rows[2].category.as_str(), rows[2].urgency.as_str()),
            ("negative", "bug", "high")
        );
        assert_eq!(rows[1].title.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_concurrent_classification_keeps_row_order() {
        let records: Vec<_> = (0..4).map(|i| record(&format!("row {}", i))).collect();
        let opts = EnrichOptions {
            concurrency: 4,
            ..EnrichOptions::default()
        };
        let (verdicts, failures) = classify_records(&SlowFirstClassifier, &records, &opts).await;
        assert_eq!(failures, 0);
        let sentiments: Vec<_> = verdicts.iter().map(|v| v.sentiment).collect();
        assert_eq!(
            sentiments,
            vec![
                Sentiment::Positive,
                Sentiment::Negative,
                Sentiment::Positive,
                Sentiment::Negative
            ]
        );
    }

    #[tokio::test]
    async fn test_latest_only_by_default_and_all_on_request() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::open(tmp.path()).unwrap();
        store.write_normalized("foo", &[record("old")], at(9)).unwrap();
        store
            .write_normalized("foo", &[record("new"), record("newer")], at(10))
            .unwrap();

        let classifier = FakeClassifier::new();
        run(&store, &classifier, &EnrichOptions::default())
            .await
            .unwrap();
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);

        let everything = EnrichOptions {
            all: true,
            ..EnrichOptions::default()
        };
        let classifier = FakeClassifier::new();
        let report = run(&store, &classifier, &everything).await.unwrap();
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.written.len(), 2);

        // Sorted order means the newest table is written last.
        let enriched = store.read_scored(&report.written[1]).unwrap();
        assert_eq!(enriched.len(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_table_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::open(tmp.path()).unwrap();
        fs::write(
            store.processed_dir().join("processed_bad_20240101_090000.csv"),
            "id,number\nnot-a-number,1\n",
        )
        .unwrap();
        store.write_normalized("good", &[record("fine")], at(9)).unwrap();

        let classifier = FakeClassifier::new();
        let report = run(&store, &classifier, &EnrichOptions::default())
            .await
            .unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.written.len(), 1);
        assert!(!store.enriched_dir().join("enriched_bad.csv").exists());
    }
}
