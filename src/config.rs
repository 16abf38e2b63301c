use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings file not found at {0}")]
    NotFound(PathBuf),
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Contents of `settings.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub github: GithubSettings,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GithubSettings {
    #[serde(default)]
    pub targets: Vec<String>,
}

/// Capture window.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub days_back: i64,
    pub max_results: u32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            days_back: 30,
            max_results: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub data_dir: PathBuf,
    /// Classification calls in flight at once; 1 keeps enrichment sequential.
    pub enrichment_concurrency: usize,
    /// Character bound on the text sent for classification.
    pub text_limit: usize,
    pub top_labels: usize,
    /// Enriched core-names containing any of these are left out of analysis.
    pub exclude_patterns: Vec<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            enrichment_concurrency: 1,
            text_limit: 2000,
            top_labels: 5,
            exclude_patterns: vec!["_poc".to_string()],
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings =
            serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
                path: PathBuf::from("<inline>"),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.parameters.days_back < 0 {
            return Err(ConfigError::Invalid("parameters.days_back must be >= 0".into()));
        }
        if self.parameters.max_results == 0 {
            return Err(ConfigError::Invalid("parameters.max_results must be > 0".into()));
        }
        if self.pipeline.enrichment_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.enrichment_concurrency must be > 0".into(),
            ));
        }
        Ok(())
    }
}
