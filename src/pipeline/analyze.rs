use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::artifacts::naming;
use crate::artifacts::types::ScoredRow;
use crate::artifacts::ArtifactStore;
use crate::categories::{pain_index, Sentiment, Urgency};
use crate::render;

pub const HEATMAP_FILE: &str = "heatmap_sentiment_labels.svg";
pub const BARPLOT_FILE: &str = "barplot_pain_index_comparison.svg";

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub top_labels: usize,
    pub exclude_patterns: Vec<String>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            top_labels: 5,
            exclude_patterns: vec!["_poc".to_string()],
        }
    }
}

/// One enriched row with its derived scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredIssue {
    pub source_repo: String,
    pub labels: String,
    pub sentiment_score: i32,
    pub urgency_score: i32,
    pub pain_index: i32,
}

impl ScoredIssue {
    pub fn from_row(source_repo: &str, row: ScoredRow) -> Self {
        let sentiment = Sentiment::from_label(row.sentiment.as_deref().unwrap_or_default());
        let urgency = Urgency::from_label(row.urgency.as_deref().unwrap_or_default());
        Self {
            source_repo: source_repo.to_string(),
            labels: row.labels.unwrap_or_default(),
            sentiment_score: sentiment.score(),
            urgency_score: urgency.score(),
            pain_index: pain_index(sentiment, urgency),
        }
    }
}

/// Mean sentiment per (source, label). Combinations with no matching rows are
/// absent, not zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SentimentMatrix {
    pub labels: Vec<String>,
    pub sources: Vec<String>,
    pub cells: BTreeMap<(String, String), f64>,
}

impl SentimentMatrix {
    pub fn get(&self, source: &str, label: &str) -> Option<f64> {
        self.cells
            .get(&(source.to_string(), label.to_string()))
            .copied()
    }
}

#[derive(Debug, Default)]
pub struct AnalysisReport {
    pub issues: usize,
    pub top_labels: Vec<(String, usize)>,
    pub matrix: SentimentMatrix,
    pub ranking: Vec<(String, f64)>,
    pub plots: Vec<PathBuf>,
}

/// Load every enriched table not excluded by name, tagging rows with their
/// core-name. Unreadable tables are logged and skipped.
pub fn load_scored(store: &ArtifactStore, exclude: &[String]) -> Result<Vec<ScoredIssue>> {
    let files = store.discover_enriched()?;
    if files.is_empty() {
        warn!(dir = %store.enriched_dir().display(), "No enriched tables found");
        return Ok(Vec::new());
    }
    info!(files = files.len(), "Loading enriched tables");

    let mut issues = Vec::new();
    for path in files {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let source = naming::core_name_from_enriched(stem);
        if exclude.iter().any(|p| source.contains(p.as_str())) {
            info!(source = %source, "Excluded from analysis");
            continue;
        }

        match store.read_scored(&path) {
            Ok(rows) => issues.extend(rows.into_iter().map(|r| ScoredIssue::from_row(&source, r))),
            Err(e) => error!(path = %path.display(), "Failed to read enriched table: {:#}", e),
        }
    }

    info!(rows = issues.len(), "Enriched rows loaded");
    debug!(
        high_urgency = issues.iter().filter(|i| i.urgency_score == 3).count(),
        negative = issues.iter().filter(|i| i.sentiment_score < 0).count(),
        "Score distribution"
    );
    Ok(issues)
}

/// Split each joined label string, trim, drop empties and count. Highest
/// count first; equal counts order by label.
pub fn top_labels(issues: &[ScoredIssue], n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for issue in issues {
        for label in issue.labels.split(',').map(str::trim).filter(|l| !l.is_empty()) {
            *counts.entry(label).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

/// For each label, average `sentiment_score` per source over rows whose joined
/// label string contains the label. This is substring containment: `bug`
/// also matches `ui-bug`.
pub fn sentiment_matrix(issues: &[ScoredIssue], labels: &[String]) -> SentimentMatrix {
    let mut sums: BTreeMap<(String, String), (i64, usize)> = BTreeMap::new();
    for label in labels {
        for issue in issues.iter().filter(|i| i.labels.contains(label.as_str())) {
            let entry = sums
                .entry((issue.source_repo.clone(), label.clone()))
                .or_default();
            entry.0 += issue.sentiment_score as i64;
            entry.1 += 1;
        }
    }

    let sources: BTreeSet<String> = sums.keys().map(|(s, _)| s.clone()).collect();
    let cells = sums
        .into_iter()
        .map(|(key, (sum, n))| (key, sum as f64 / n as f64))
        .collect();

    SentimentMatrix {
        labels: labels.to_vec(),
        sources: sources.into_iter().collect(),
        cells,
    }
}

/// Mean pain index per source, most painful first.
pub fn pain_ranking(issues: &[ScoredIssue]) -> Vec<(String, f64)> {
    let mut sums: BTreeMap<&str, (i64, usize)> = BTreeMap::new();
    for issue in issues {
        let entry = sums.entry(issue.source_repo.as_str()).or_default();
        entry.0 += issue.pain_index as i64;
        entry.1 += 1;
    }

    let mut ranking: Vec<(String, f64)> = sums
        .into_iter()
        .map(|(source, (sum, n))| (source.to_string(), sum as f64 / n as f64))
        .collect();
    ranking.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranking
}

pub fn format_ranking(ranking: &[(String, f64)]) -> String {
    let width = ranking
        .iter()
        .map(|(s, _)| s.len())
        .chain(std::iter::once("source_repo".len()))
        .max()
        .unwrap_or_default();

    let mut out = format!("{:<width$}  {:>10}\n", "source_repo", "pain_index");
    for (source, pain) in ranking {
        out.push_str(&format!("{:<width$}  {:>10.4}\n", source, pain));
    }
    out
}

fn save_plot(store: &ArtifactStore, file_name: &str, svg: Result<String>) -> Option<PathBuf> {
    match svg.and_then(|svg| store.write_plot(file_name, &svg)) {
        Ok(path) => {
            info!(path = %path.display(), "Plot saved");
            Some(path)
        }
        Err(e) => {
            error!(plot = file_name, "Failed to save plot: {:#}", e);
            None
        }
    }
}

/// Score, rank and plot everything in the enriched directory. Returns `None`
/// when there is nothing to analyze.
pub fn run(store: &ArtifactStore, opts: &AnalyzeOptions) -> Result<Option<AnalysisReport>> {
    let issues = load_scored(store, &opts.exclude_patterns)?;
    if issues.is_empty() {
        return Ok(None);
    }

    let mut report = AnalysisReport {
        issues: issues.len(),
        top_labels: top_labels(&issues, opts.top_labels),
        ..AnalysisReport::default()
    };
    let labels: Vec<String> = report.top_labels.iter().map(|(l, _)| l.clone()).collect();
    info!(labels = ?labels, "Top labels");

    if labels.is_empty() {
        warn!("No labels present, skipping heatmap");
    } else {
        report.matrix = sentiment_matrix(&issues, &labels);
    }
    report.ranking = pain_ranking(&issues);

    let table = format_ranking(&report.ranking);
    info!(sources = report.ranking.len(), "Pain index ranking computed");
    println!("\n--- PAIN INDEX RANKING (mean per source) ---\n{}", table);

    // A failed plot leaves the printed ranking and the other plot intact.
    if !labels.is_empty() {
        let heatmap = render::sentiment_heatmap(&report.matrix).map_err(anyhow::Error::from);
        if let Some(path) = save_plot(store, HEATMAP_FILE, heatmap) {
            report.plots.push(path);
        }
    }
    let barplot = render::pain_barplot(&report.ranking).map_err(anyhow::Error::from);
    if let Some(path) = save_plot(store, BARPLOT_FILE, barplot) {
        report.plots.push(path);
    }

    Ok(Some(report))
}
