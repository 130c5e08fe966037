//! NLI model configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the model files come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSource {
    /// Directory holding config.json, tokenizer.json and model.safetensors
    Local { path: PathBuf },

    /// Download from HuggingFace Hub
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
    },
}

impl Default for ModelSource {
    fn default() -> Self {
        Self::HuggingFace {
            repo: default_repo(),
            revision: default_revision(),
        }
    }
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local { path } => write!(f, "local:{}", path.display()),
            Self::HuggingFace { repo, revision } => write!(f, "hf:{}@{}", repo, revision),
        }
    }
}

/// Sequence-classification architectures that can serve as NLI
/// cross-encoders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NliArchitecture {
    #[default]
    DebertaV2,
    XlmRoberta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NliModelConfig {
    #[serde(default)]
    pub source: ModelSource,

    #[serde(default)]
    pub architecture: NliArchitecture,

    /// Device to run on (cpu, cuda, metal)
    #[serde(default = "default_device")]
    pub device: String,

    /// Maximum tokens per premise/hypothesis pair
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Pairs per forward pass
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Hub cache directory; defaults to the user cache dir
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl NliModelConfig {
    /// Config for a HuggingFace repository with default settings
    pub fn huggingface(repo: impl Into<String>) -> Self {
        Self {
            source: ModelSource::HuggingFace {
                repo: repo.into(),
                revision: default_revision(),
            },
            ..Self::default()
        }
    }

    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("biaslens/models")
        })
    }
}

impl Default for NliModelConfig {
    fn default() -> Self {
        Self {
            source: ModelSource::default(),
            architecture: NliArchitecture::default(),
            device: default_device(),
            max_length: default_max_length(),
            batch_size: default_batch_size(),
            cache_dir: None,
        }
    }
}

fn default_repo() -> String {
    "MoritzLaurer/DeBERTa-v3-base-mnli".to_string()
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_max_length() -> usize {
    512
}

fn default_batch_size() -> usize {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NliModelConfig::default();
        assert_eq!(config.architecture, NliArchitecture::DebertaV2);
        assert_eq!(config.device, "cpu");
        assert_eq!(config.max_length, 512);
        assert_eq!(
            config.source.to_string(),
            "hf:MoritzLaurer/DeBERTa-v3-base-mnli@main"
        );
    }

    #[test]
    fn test_parse_local_xlm_roberta() {
        let yaml = r#"
source:
  type: local
  path: "./models/xnli"
architecture: xlm-roberta
device: cuda
batch_size: 16
"#;
        let config: NliModelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.source,
            ModelSource::Local {
                path: PathBuf::from("./models/xnli")
            }
        );
        assert_eq!(config.architecture, NliArchitecture::XlmRoberta);
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.max_length, 512);
    }

    #[test]
    fn test_parse_huggingface_default_revision() {
        let yaml = r#"
source:
  type: huggingface
  repo: "joeddav/xlm-roberta-large-xnli"
"#;
        let config: NliModelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.source.to_string(),
            "hf:joeddav/xlm-roberta-large-xnli@main"
        );
    }
}
