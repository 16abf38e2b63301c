use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::Serialize;

use super::naming::{ArtifactName, Stage};
use super::ArtifactStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRef {
    pub path: PathBuf,
    pub stamp: Option<NaiveDateTime>,
}

/// What exists on disk for one core-name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceLineage {
    pub raw: Option<ArtifactRef>,
    pub normalized: Option<ArtifactRef>,
    pub enriched: Option<PathBuf>,
    pub raw_count: usize,
    pub normalized_count: usize,
}

/// Index of pipeline state rebuilt from the stage directories. The file names
/// stay the source of truth; this only gives them a queryable shape.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Manifest {
    pub sources: BTreeMap<String, SourceLineage>,
}

/// Newer stamp wins; a stamped artifact beats an unstamped one; equal stamps
/// fall back to path order so the scan stays deterministic.
fn is_newer(candidate: &ArtifactRef, current: &ArtifactRef) -> bool {
    (candidate.stamp, &candidate.path) > (current.stamp, &current.path)
}

impl Manifest {
    pub fn scan(store: &ArtifactStore) -> Result<Self> {
        let mut manifest = Manifest::default();
        for path in store.discover_raw()? {
            manifest.record(Stage::Raw, &path);
        }
        for path in store.discover_processed_csv()? {
            manifest.record(Stage::Processed, &path);
        }
        for path in store.discover_enriched()? {
            manifest.record(Stage::Enriched, &path);
        }
        Ok(manifest)
    }

    pub fn record(&mut self, stage: Stage, path: &Path) {
        let Some(name) = ArtifactName::parse(stage, path) else {
            return;
        };
        let entry = self.sources.entry(name.core).or_default();
        let artifact = ArtifactRef {
            path: path.to_path_buf(),
            stamp: name.stamp,
        };

        match stage {
            Stage::Raw => {
                entry.raw_count += 1;
                if entry.raw.as_ref().map_or(true, |cur| is_newer(&artifact, cur)) {
                    entry.raw = Some(artifact);
                }
            }
            Stage::Processed => {
                entry.normalized_count += 1;
                if entry
                    .normalized
                    .as_ref()
                    .map_or(true, |cur| is_newer(&artifact, cur))
                {
                    entry.normalized = Some(artifact);
                }
            }
            Stage::Enriched => entry.enriched = Some(artifact.path),
        }
    }

    /// A raw capture is digested once a normalized artifact for the same core
    /// was stamped at or after the capture time. Unstamped captures are never
    /// considered digested.
    pub fn is_digested(&self, raw: &Path) -> bool {
        let Some(name) = ArtifactName::parse(Stage::Raw, raw) else {
            return false;
        };
        let (Some(captured), Some(lineage)) = (name.stamp, self.sources.get(&name.core)) else {
            return false;
        };
        lineage
            .normalized
            .as_ref()
            .and_then(|n| n.stamp)
            .is_some_and(|processed| processed >= captured)
    }

    /// Latest normalized CSV per core, in core-name order.
    pub fn latest_normalized(&self) -> Vec<PathBuf> {
        self.sources
            .values()
            .filter_map(|l| l.normalized.as_ref().map(|n| n.path.clone()))
            .collect()
    }
}
