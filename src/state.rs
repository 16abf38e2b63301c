use std::path::Path;

use anyhow::Result;

use crate::artifacts::ArtifactStore;
use crate::config::Settings;
use crate::pipeline::analyze::AnalyzeOptions;
use crate::pipeline::enrich::EnrichOptions;

/// Everything a command needs, loaded once before any stage runs.
pub struct AppState {
    pub settings: Settings,
    pub store: ArtifactStore,
}

impl AppState {
    /// Settings failures are fatal; they surface here before any stage starts.
    pub fn load(config_path: &Path) -> Result<Self> {
        let settings = Settings::load(config_path)?;
        let store = ArtifactStore::open(&settings.pipeline.data_dir)?;
        Ok(Self { settings, store })
    }

    pub fn enrich_options(&self, all: bool) -> EnrichOptions {
        EnrichOptions {
            all,
            concurrency: self.settings.pipeline.enrichment_concurrency,
            text_limit: self.settings.pipeline.text_limit,
        }
    }

    pub fn analyze_options(&self) -> AnalyzeOptions {
        AnalyzeOptions {
            top_labels: self.settings.pipeline.top_labels,
            exclude_patterns: self.settings.pipeline.exclude_patterns.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_builds_store_under_data_dir() {
        let tmp = TempDir::new().unwrap();
        let data_dir = tmp.path().join("data");
        let config = tmp.path().join("settings.yaml");
        std::fs::write(
            &config,
            format!(
                "github:\n  targets: [\"repo:a/b is:issue\"]\npipeline:\n  data_dir: {}\n  enrichment_concurrency: 3\n",
                data_dir.display()
            ),
        )
        .unwrap();

        let state = AppState::load(&config).unwrap();
        assert!(state.store.raw_dir().starts_with(&data_dir));
        assert!(state.store.raw_dir().is_dir());
        assert_eq!(state.enrich_options(true).concurrency, 3);
        assert!(state.enrich_options(true).all);
        assert_eq!(state.analyze_options().top_labels, 5);
    }

    #[test]
    fn test_missing_settings_is_fatal() {
        let tmp = TempDir::new().unwrap();
        assert!(AppState::load(&tmp.path().join("missing.yaml")).is_err());
    }
}
