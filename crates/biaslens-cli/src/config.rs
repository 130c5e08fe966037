//! CLI configuration file

use biaslens_engine::EngineConfig;
use biaslens_nli_candle::{ModelSource, NliArchitecture, NliModelConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of the YAML config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub model: NliModelConfig,

    /// Optional phrase dictionary replacing the built-in one
    #[serde(default)]
    pub dictionary: Option<PathBuf>,
}

/// Command-line overrides applied after the file is read
#[derive(Debug, Default)]
pub struct Overrides {
    pub model_repo: Option<String>,
    pub model_path: Option<PathBuf>,
    /// Applies to the model from the file as well as a CLI-given one
    pub architecture: Option<NliArchitecture>,
    pub timeout_ms: Option<u64>,
    pub dictionary: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from file and CLI overrides. A missing file
    /// yields defaults.
    pub fn load(config_path: &Path, overrides: Overrides) -> anyhow::Result<Self> {
        let mut config: AppConfig = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content).map_err(|e| {
                anyhow::anyhow!("Failed to parse {}: {}", config_path.display(), e)
            })?
        } else {
            tracing::debug!("No config at {}, using defaults", config_path.display());
            Self::default()
        };

        if let Some(repo) = overrides.model_repo {
            config.model.source = ModelSource::HuggingFace {
                repo,
                revision: "main".to_string(),
            };
        }

        if let Some(path) = overrides.model_path {
            config.model.source = ModelSource::Local { path };
        }

        if let Some(architecture) = overrides.architecture {
            config.model.architecture = architecture;
        }

        if let Some(timeout_ms) = overrides.timeout_ms {
            config.engine.runtime.inference_timeout_ms = timeout_ms;
        }

        if overrides.dictionary.is_some() {
            config.dictionary = overrides.dictionary;
        }

        config.engine.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load(Path::new("./does-not-exist.yaml"), Overrides::default())
            .unwrap();
        assert_eq!(config.engine.scoring.category_cap, 30);
        assert_eq!(config.model, NliModelConfig::default());
        assert!(config.dictionary.is_none());
    }

    #[test]
    fn test_file_and_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
engine:
  runtime:
    inference_timeout_ms: 5000
model:
  device: cuda
"#
        )
        .unwrap();

        let config = AppConfig::load(
            file.path(),
            Overrides {
                model_repo: Some("joeddav/xlm-roberta-large-xnli".to_string()),
                architecture: Some(NliArchitecture::XlmRoberta),
                timeout_ms: Some(750),
                ..Overrides::default()
            },
        )
        .unwrap();

        assert_eq!(config.engine.runtime.inference_timeout_ms, 750);
        assert_eq!(config.model.device, "cuda");
        assert_eq!(config.model.architecture, NliArchitecture::XlmRoberta);
        assert_eq!(
            config.model.source.to_string(),
            "hf:joeddav/xlm-roberta-large-xnli@main"
        );
    }

    #[test]
    fn test_repo_override_keeps_file_architecture() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "model:\n  architecture: xlm-roberta\n").unwrap();

        let config = AppConfig::load(
            file.path(),
            Overrides {
                model_repo: Some("joeddav/xlm-roberta-large-xnli".to_string()),
                ..Overrides::default()
            },
        )
        .unwrap();
        assert_eq!(config.model.architecture, NliArchitecture::XlmRoberta);
    }

    #[test]
    fn test_invalid_engine_config_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "engine:\n  scoring:\n    classifier_threshold: 2.0\n").unwrap();
        assert!(AppConfig::load(file.path(), Overrides::default()).is_err());
    }
}
