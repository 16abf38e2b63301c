pub mod manifest;
pub mod naming;
pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use types::{EnrichedRecord, NormalizedRecord, ScoredRow};

// Directory names under the data root (one per stage, plus plot output)
const RAW_DIR: &str = "raw";
const PROCESSED_DIR: &str = "processed";
const ENRICHED_DIR: &str = "enriched";
const PLOTS_DIR: &str = "analysis/plots";

/// Raw artifact that could not be read as a list of records.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unexpected JSON shape in {path}: expected a list or an object with `items`")]
    UnexpectedShape { path: PathBuf },
}

/// File-system home of every pipeline artifact. Each stage owns one directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { root: root.into() };
        for dir in [
            store.raw_dir(),
            store.processed_dir(),
            store.enriched_dir(),
            store.plots_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join(RAW_DIR)
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join(PROCESSED_DIR)
    }

    pub fn enriched_dir(&self) -> PathBuf {
        self.root.join(ENRICHED_DIR)
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.root.join(PLOTS_DIR)
    }

    /// Sorted list of files in `dir` whose names start with `prefix` and end
    /// with `.{extension}`. An empty prefix matches everything.
    fn list(&self, dir: &Path, prefix: &str, extension: &str) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in
            fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?
        {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let matches_ext = path.extension().and_then(|e| e.to_str()) == Some(extension);
            if matches_ext && name.starts_with(prefix) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Every `*.json` in the raw directory.
    pub fn discover_raw(&self) -> Result<Vec<PathBuf>> {
        self.list(&self.raw_dir(), "", "json")
    }

    pub fn discover_processed_csv(&self) -> Result<Vec<PathBuf>> {
        self.list(
            &self.processed_dir(),
            &format!("{}_", naming::PROCESSED_PREFIX),
            "csv",
        )
    }

    pub fn discover_enriched(&self) -> Result<Vec<PathBuf>> {
        self.list(
            &self.enriched_dir(),
            &format!("{}_", naming::ENRICHED_PREFIX),
            "csv",
        )
    }

    /// Persist a raw search payload verbatim. Returns the path and the bytes
    /// written.
    pub fn write_raw(
        &self,
        source: &str,
        payload: &serde_json::Value,
        at: NaiveDateTime,
    ) -> Result<(PathBuf, Vec<u8>)> {
        let path = self.raw_dir().join(naming::raw_file_name(source, at));
        let bytes = serde_json::to_vec_pretty(payload).context("serialize raw payload")?;
        write_atomic(&path, &bytes)?;
        Ok((path, bytes))
    }

    /// Load the records of a raw capture: either a top-level list or an
    /// object with an `items` list.
    pub fn load_raw_items(&self, path: &Path) -> Result<Vec<serde_json::Value>, ArtifactError> {
        let bytes = fs::read(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let data: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        match data {
            serde_json::Value::Array(items) => Ok(items),
            serde_json::Value::Object(mut map) => match map.remove("items") {
                Some(serde_json::Value::Array(items)) => Ok(items),
                _ => Err(ArtifactError::UnexpectedShape {
                    path: path.to_path_buf(),
                }),
            },
            _ => Err(ArtifactError::UnexpectedShape {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Write the CSV and JSON halves of a normalized artifact. Returns the CSV
    /// path.
    pub fn write_normalized(
        &self,
        core: &str,
        records: &[NormalizedRecord],
        at: NaiveDateTime,
    ) -> Result<PathBuf> {
        let stem = naming::processed_stem(core, at);
        let csv_path = self.processed_dir().join(format!("{}.csv", stem));
        let json_path = self.processed_dir().join(format!("{}.json", stem));

        write_atomic(&csv_path, &to_csv(records)?)?;
        let json = serde_json::to_vec_pretty(records).context("serialize normalized records")?;
        write_atomic(&json_path, &json)?;

        Ok(csv_path)
    }

    pub fn read_normalized(&self, path: &Path) -> Result<Vec<NormalizedRecord>> {
        read_csv(path)
    }

    /// Create or overwrite `enriched_<core>.csv`.
    pub fn write_enriched(&self, core: &str, records: &[EnrichedRecord]) -> Result<PathBuf> {
        let path = self.enriched_dir().join(naming::enriched_file_name(core));
        write_atomic(&path, &to_csv(records)?)?;
        Ok(path)
    }

    pub fn read_scored(&self, path: &Path) -> Result<Vec<ScoredRow>> {
        read_csv(path)
    }

    pub fn write_plot(&self, file_name: &str, svg: &str) -> Result<PathBuf> {
        let path = self.plots_dir().join(file_name);
        write_atomic(&path, svg.as_bytes())?;
        Ok(path)
    }
}

fn to_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).context("serialize CSV row")?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flush CSV: {}", e))
}

fn read_csv<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    for (index, row) in reader.deserialize().enumerate() {
        let row: T =
            row.with_context(|| format!("Bad CSV row {} in {}", index + 1, path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Write to a `.tmp` sibling, then rename into place. Discovery filters on
/// the final extension, so a half-written file is never picked up.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to move {}", path.display()))?;
    debug!(path = %path.display(), size = bytes.len(), "artifact written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::types::IssueRecord;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn record(id: u64, labels: &str) -> NormalizedRecord {
        let mut r = NormalizedRecord::from(IssueRecord::default());
        r.id = Some(id);
        r.title = Some(format!("issue {}", id));
        r.labels = labels.to_string();
        r
    }

    #[test]
    fn test_open_creates_stage_dirs() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::open(tmp.path().join("data")).unwrap();
        assert!(store.raw_dir().is_dir());
        assert!(store.processed_dir().is_dir());
        assert!(store.enriched_dir().is_dir());
        assert!(store.plots_dir().is_dir());
    }

    #[test]
    fn test_normalized_csv_roundtrip_keeps_labels() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::open(tmp.path()).unwrap();
        let records = vec![
            record(1, "ui-bug, performance"),
            record(2, ""),
            record(3, "docs, good first issue"),
        ];

        let path = store.write_normalized("foo_bar", &records, at()).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "processed_foo_bar_20240101_120000.csv"
        );
        assert!(store
            .processed_dir()
            .join("processed_foo_bar_20240101_120000.json")
            .is_file());

        let loaded = store.read_normalized(&path).unwrap();
        assert_eq!(loaded.len(), records.len());
        for (a, b) in loaded.iter().zip(&records) {
            assert_eq!(a.labels, b.labels);
        }
        assert_eq!(loaded[1].body, "");
        assert_eq!(loaded[1].author, "Unknown");
    }

    #[test]
    fn test_csv_header_order() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::open(tmp.path()).unwrap();
        let path = store.write_normalized("x_y", &[record(1, "")], at()).unwrap();
        let text = fs::read_to_string(path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, types::NORMALIZED_COLUMNS.join(","));
    }

    #[test]
    fn test_load_raw_items_shapes() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::open(tmp.path()).unwrap();

        let list = store.raw_dir().join("list.json");
        fs::write(&list, r#"[{"id": 1}, {"id": 2}]"#).unwrap();
        assert_eq!(store.load_raw_items(&list).unwrap().len(), 2);

        let wrapped = store.raw_dir().join("wrapped.json");
        fs::write(&wrapped, r#"{"total_count": 1, "items": [{"id": 1}]}"#).unwrap();
        assert_eq!(store.load_raw_items(&wrapped).unwrap().len(), 1);

        let odd = store.raw_dir().join("odd.json");
        fs::write(&odd, r#"{"message": "rate limited"}"#).unwrap();
        assert!(matches!(
            store.load_raw_items(&odd),
            Err(ArtifactError::UnexpectedShape { .. })
        ));

        let broken = store.raw_dir().join("broken.json");
        fs::write(&broken, "{not json").unwrap();
        assert!(matches!(
            store.load_raw_items(&broken),
            Err(ArtifactError::Json { .. })
        ));
    }

    #[test]
    fn test_discovery_ignores_tmp_and_foreign_files() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::open(tmp.path()).unwrap();
        fs::write(store.enriched_dir().join("enriched_b.csv"), "").unwrap();
        fs::write(store.enriched_dir().join("enriched_a.csv"), "").unwrap();
        fs::write(store.enriched_dir().join("enriched_c.csv.tmp"), "").unwrap();
        fs::write(store.enriched_dir().join("notes.csv"), "").unwrap();

        let found = store.discover_enriched().unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["enriched_a.csv", "enriched_b.csv"]);
    }
}
