//! Candle-backed NLI cross-encoder
//!
//! Scores (premise, hypothesis) pairs with a sequence-classification model
//! fine-tuned on MNLI/XNLI and returns the softmax probability of the
//! entailment class.

use crate::config::{ModelSource, NliArchitecture, NliModelConfig};
use biaslens_core::{Error, Result};
use biaslens_engine::{resolve_entailment_index, EntailmentLoader, EntailmentProvider};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::debertav2::{
    Config as DebertaV2Config, DebertaV2SeqClassificationModel, Id2Label as DebertaId2Label,
};
use candle_transformers::models::xlm_roberta::{
    Config as XlmRobertaConfig, XLMRobertaForSequenceClassification,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams, TruncationStrategy};

enum NliModel {
    DebertaV2(DebertaV2SeqClassificationModel),
    XlmRoberta(XLMRobertaForSequenceClassification),
}

impl NliModel {
    fn forward(
        &self,
        input_ids: &Tensor,
        type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> candle_core::Result<Tensor> {
        match self {
            Self::DebertaV2(model) => model.forward(
                input_ids,
                Some(type_ids.clone()),
                Some(attention_mask.clone()),
            ),
            Self::XlmRoberta(model) => model.forward(input_ids, attention_mask, type_ids),
        }
    }
}

/// Entailment provider running an NLI model with Candle
pub struct CandleNliProvider {
    name: String,
    tokenizer: Tokenizer,
    model: NliModel,
    device: Device,
    /// Resolved once from the model's label map
    entailment_idx: usize,
    batch_size: usize,
}

impl CandleNliProvider {
    /// Resolve, download if needed, and load the model
    pub fn load(config: &NliModelConfig) -> Result<Self> {
        let start = Instant::now();
        let model_path = resolve_model_path(config)?;

        let tokenizer = load_tokenizer(&model_path, config.max_length)?;
        let id2label = read_id2label(&model_path.join("config.json"))?;
        let entailment_idx =
            resolve_entailment_index(id2label.iter().map(|(idx, label)| (*idx, label.as_str())))?;

        let device = get_device(&config.device)?;
        let vb = load_var_builder(&model_path, &device)?;

        let model = match config.architecture {
            NliArchitecture::DebertaV2 => {
                let model_config: DebertaV2Config =
                    parse_json_config(&model_path.join("config.json"))?;
                let labels: DebertaId2Label = id2label
                    .iter()
                    .map(|(idx, label)| (*idx as u32, label.clone()))
                    .collect();
                NliModel::DebertaV2(load_deberta(&vb, &model_config, labels)?)
            }
            NliArchitecture::XlmRoberta => {
                let model_config: XlmRobertaConfig =
                    parse_json_config(&model_path.join("config.json"))?;
                NliModel::XlmRoberta(load_xlm_roberta(&vb, id2label.len(), &model_config)?)
            }
        };

        tracing::info!(
            "Loaded NLI model {} ({:?}) with {} labels, entailment index {} in {:?}",
            config.source,
            config.architecture,
            id2label.len(),
            entailment_idx,
            start.elapsed()
        );

        Ok(Self {
            name: config.source.to_string(),
            tokenizer,
            model,
            device,
            entailment_idx,
            batch_size: config.batch_size.max(1),
        })
    }

    fn score_batch(&self, premise: &str, hypotheses: &[String]) -> Result<Vec<f32>> {
        let pairs: Vec<(&str, &str)> = hypotheses.iter().map(|h| (premise, h.as_str())).collect();
        let encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| Error::inference(format!("Tokenization failed: {}", e)))?;

        let batch = encodings.len();
        let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);
        if encodings.iter().any(|e| e.get_ids().len() != seq_len) {
            return Err(Error::inference("Tokenizer returned unpadded batch"));
        }

        let mut ids = Vec::with_capacity(batch * seq_len);
        let mut type_ids = Vec::with_capacity(batch * seq_len);
        let mut mask = Vec::with_capacity(batch * seq_len);
        for encoding in &encodings {
            ids.extend_from_slice(encoding.get_ids());
            type_ids.extend_from_slice(encoding.get_type_ids());
            mask.extend_from_slice(encoding.get_attention_mask());
        }

        let to_tensor = |data: Vec<u32>, what: &str| {
            Tensor::from_vec(data, (batch, seq_len), &self.device).map_err(|e| {
                Error::inference(format!("Failed to create {} tensor: {}", what, e))
            })
        };
        let input_ids = to_tensor(ids, "input ids")?;
        let type_ids = to_tensor(type_ids, "token type")?;
        let attention_mask = to_tensor(mask, "attention mask")?;

        let logits = self
            .model
            .forward(&input_ids, &type_ids, &attention_mask)
            .map_err(|e| Error::inference(format!("Model forward pass failed: {}", e)))?;
        entailment_column(&logits, self.entailment_idx)
    }
}

/// Softmax over the class dimension of `(batch, classes)` logits, keeping
/// the entailment column
fn entailment_column(logits: &Tensor, entailment_idx: usize) -> Result<Vec<f32>> {
    let classes = logits
        .dims2()
        .map(|(_, classes)| classes)
        .map_err(|e| Error::inference(format!("Unexpected logits shape: {}", e)))?;
    if entailment_idx >= classes {
        return Err(Error::inference(format!(
            "Model returned {} classes, entailment index is {}",
            classes, entailment_idx
        )));
    }

    logits
        .to_dtype(DType::F32)
        .and_then(|t| candle_nn::ops::softmax_last_dim(&t))
        .and_then(|probs| probs.narrow(1, entailment_idx, 1))
        .and_then(|column| column.squeeze(1))
        .and_then(|column| column.to_vec1::<f32>())
        .map_err(|e| Error::inference(format!("Failed to normalize logits: {}", e)))
}

impl EntailmentProvider for CandleNliProvider {
    fn entailment_probs(&self, premise: &str, hypotheses: &[String]) -> Result<Vec<f32>> {
        let start = Instant::now();
        let mut probs = Vec::with_capacity(hypotheses.len());
        for chunk in hypotheses.chunks(self.batch_size) {
            probs.extend(self.score_batch(premise, chunk)?);
        }
        tracing::debug!(
            "Scored {} hypotheses in {:?}",
            hypotheses.len(),
            start.elapsed()
        );
        Ok(probs)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// [`EntailmentLoader`] for [`CandleNliProvider`]
#[derive(Debug, Clone)]
pub struct CandleNliLoader {
    config: NliModelConfig,
}

impl CandleNliLoader {
    pub fn new(config: NliModelConfig) -> Self {
        Self { config }
    }
}

impl EntailmentLoader for CandleNliLoader {
    fn load(&self) -> Result<Arc<dyn EntailmentProvider>> {
        Ok(Arc::new(CandleNliProvider::load(&self.config)?))
    }

    fn describe(&self) -> String {
        self.config.source.to_string()
    }
}

fn resolve_model_path(config: &NliModelConfig) -> Result<PathBuf> {
    match &config.source {
        ModelSource::Local { path } => {
            if !path.exists() {
                return Err(Error::model_unavailable(format!(
                    "Model path does not exist: {}",
                    path.display()
                )));
            }
            Ok(path.clone())
        }
        ModelSource::HuggingFace { repo, revision } => {
            download_from_huggingface(repo, revision, config.resolved_cache_dir())
        }
    }
}

fn download_from_huggingface(repo: &str, revision: &str, cache_dir: PathBuf) -> Result<PathBuf> {
    tracing::info!("Fetching NLI model from HuggingFace: {}@{}", repo, revision);

    let api = hf_hub::api::sync::ApiBuilder::new()
        .with_cache_dir(cache_dir)
        .build()
        .map_err(|e| {
            Error::model_unavailable(format!("Failed to initialize HuggingFace API: {}", e))
        })?;
    let repo_api = api.repo(hf_hub::Repo::with_revision(
        repo.to_string(),
        hf_hub::RepoType::Model,
        revision.to_string(),
    ));

    let mut model_dir = None;
    for file in ["config.json", "tokenizer.json", "model.safetensors"] {
        let path = repo_api.get(file).map_err(|e| {
            Error::model_unavailable(format!("Failed to download {} from {}: {}", file, repo, e))
        })?;
        tracing::debug!("Fetched {}", path.display());
        model_dir = path.parent().map(Path::to_path_buf);
    }

    let model_dir = model_dir.ok_or_else(|| Error::model_unavailable("Invalid cache path"))?;
    tracing::info!("Model available at: {}", model_dir.display());
    Ok(model_dir)
}

fn get_device(device_str: &str) -> Result<Device> {
    match device_str.to_lowercase().as_str() {
        "cuda" | "cuda:0" => Device::new_cuda(0).map_err(|e| {
            Error::model_unavailable(format!("Failed to initialize CUDA: {}", e))
        }),
        "mps" | "metal" => Device::new_metal(0).map_err(|e| {
            Error::model_unavailable(format!("Failed to initialize Metal: {}", e))
        }),
        _ => Ok(Device::Cpu),
    }
}

fn parse_json_config<T: DeserializeOwned>(config_path: &Path) -> Result<T> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        Error::model_unavailable(format!(
            "Failed to read config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    serde_json::from_str(&config_str).map_err(|e| {
        Error::model_unavailable(format!(
            "Failed to parse config {}: {}",
            config_path.display(),
            e
        ))
    })
}

/// `id2label` of a HuggingFace config.json, sorted by index
pub(crate) fn read_id2label(config_path: &Path) -> Result<Vec<(usize, String)>> {
    #[derive(serde::Deserialize)]
    struct LabelConfig {
        #[serde(default)]
        id2label: HashMap<String, String>,
    }

    let config: LabelConfig = parse_json_config(config_path)?;
    parse_id2label(config.id2label)
}

fn parse_id2label(raw: HashMap<String, String>) -> Result<Vec<(usize, String)>> {
    if raw.is_empty() {
        return Err(Error::model_unavailable("model config has no id2label map"));
    }
    let mut labels = raw
        .into_iter()
        .map(|(idx, label)| {
            idx.parse::<usize>()
                .map(|idx| (idx, label))
                .map_err(|_| Error::model_unavailable(format!("invalid id2label key '{}'", idx)))
        })
        .collect::<Result<Vec<_>>>()?;
    labels.sort_by_key(|(idx, _)| *idx);
    Ok(labels)
}

fn load_tokenizer(model_path: &Path, max_length: usize) -> Result<Tokenizer> {
    let path = model_path.join("tokenizer.json");
    let mut tokenizer = Tokenizer::from_file(&path).map_err(|e| {
        Error::model_unavailable(format!("Failed to load {}: {}", path.display(), e))
    })?;

    // Long premises lose their tail, hypotheses are kept whole
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            strategy: TruncationStrategy::OnlyFirst,
            ..Default::default()
        }))
        .map_err(|e| Error::model_unavailable(format!("Failed to configure truncation: {}", e)))?;

    let mut padding = tokenizer.get_padding().cloned().unwrap_or_else(|| {
        let (pad_token, pad_id) = ["[PAD]", "<pad>"]
            .iter()
            .find_map(|t| tokenizer.token_to_id(t).map(|id| (t.to_string(), id)))
            .unwrap_or_else(|| ("[PAD]".to_string(), 0));
        PaddingParams {
            pad_id,
            pad_token,
            ..Default::default()
        }
    });
    padding.strategy = PaddingStrategy::BatchLongest;
    tokenizer.with_padding(Some(padding));

    Ok(tokenizer)
}

fn load_var_builder(model_path: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let weights_path = model_path.join("model.safetensors");
    if !weights_path.exists() {
        return Err(Error::model_unavailable(format!(
            "model.safetensors not found in {}",
            model_path.display()
        )));
    }

    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device).map_err(|e| {
            Error::model_unavailable(format!("Failed to load weights: {}", e))
        })?
    };

    Ok(vb)
}

fn load_deberta(
    vb: &VarBuilder,
    config: &DebertaV2Config,
    id2label: DebertaId2Label,
) -> Result<DebertaV2SeqClassificationModel> {
    let mut errors = Vec::new();

    for prefix in ["deberta", ""] {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(prefix)
        };

        match DebertaV2SeqClassificationModel::load(vb_prefix, config, Some(id2label.clone())) {
            Ok(model) => return Ok(model),
            Err(e) => errors.push(format!(
                "{}: {}",
                if prefix.is_empty() { "<root>" } else { prefix },
                e
            )),
        }
    }

    Err(Error::model_unavailable(format!(
        "Failed to load DeBERTa-v2 NLI model with tried prefixes [{}]",
        errors.join(" | ")
    )))
}

fn load_xlm_roberta(
    vb: &VarBuilder,
    num_labels: usize,
    config: &XlmRobertaConfig,
) -> Result<XLMRobertaForSequenceClassification> {
    let mut errors = Vec::new();

    for prefix in ["", "model"] {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(prefix)
        };

        match XLMRobertaForSequenceClassification::new(num_labels, config, vb_prefix) {
            Ok(model) => return Ok(model),
            Err(e) => errors.push(format!(
                "{}: {}",
                if prefix.is_empty() { "<root>" } else { prefix },
                e
            )),
        }
    }

    Err(Error::model_unavailable(format!(
        "Failed to load XLM-RoBERTa NLI model with tried prefixes [{}]",
        errors.join(" | ")
    )))
}
