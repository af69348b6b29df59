//! Local embedding model running on Candle.
//!
//! Loads a BERT or RoBERTa checkpoint from disk, mean-pools the last hidden
//! state over the attention mask and L2-normalises the result, so cosine
//! similarity between two outputs is a plain dot product.

use std::path::Path;
use std::sync::Mutex;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::config::{
    DevicePreference, EmbeddingConfig, HuggingFaceModelConfig, ModelArchitecture, ModelInfo,
};
use crate::error::{ModelError, ModelResult};
use crate::EmbeddingModel;

enum Encoder {
    Bert(BertModel),
    Roberta(XLMRobertaModel),
}

impl Encoder {
    fn forward(&self, ids: &Tensor, type_ids: &Tensor, mask: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            Encoder::Bert(model) => model.forward(ids, type_ids, Some(mask)),
            Encoder::Roberta(model) => model.forward(ids, mask, type_ids, None, None, None),
        }
    }
}

/// Candle-based embedding model.
pub struct CandleEmbeddingModel {
    model_info: ModelInfo,
    encoder: Mutex<Encoder>,
    tokenizer: Mutex<Tokenizer>,
    device: Device,
}

// SAFETY: the encoder and tokenizer are only touched behind their mutexes;
// the device handle is immutable after construction.
unsafe impl Send for CandleEmbeddingModel {}
unsafe impl Sync for CandleEmbeddingModel {}

impl std::fmt::Debug for CandleEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleEmbeddingModel")
            .field("model_id", &self.model_info.model_id)
            .field("dimension", &self.model_info.dimension)
            .finish()
    }
}

impl CandleEmbeddingModel {
    /// Load the model described by `config` from disk.
    ///
    /// Fails with [`ModelError::DimensionMismatch`] when the checkpoint's
    /// hidden size disagrees with `config.dimension`: vectors from the two
    /// would silently become incomparable.
    pub fn new(config: &EmbeddingConfig) -> ModelResult<Self> {
        let model_path = config.effective_model_path();
        if !model_path.exists() {
            return Err(ModelError::ModelNotFound {
                model_id: config.model_id.clone(),
                path: model_path,
            });
        }

        let hf_config: HuggingFaceModelConfig =
            serde_json::from_str(&read_required(&model_path, "config.json")?)?;
        let architecture = hf_config.infer_architecture();

        if hf_config.hidden_size != config.dimension {
            return Err(ModelError::DimensionMismatch {
                model_id: config.model_id.clone(),
                expected: config.dimension,
                actual: hf_config.hidden_size,
            });
        }

        let max_seq_len = config
            .max_sequence_length
            .min(hf_config.max_position_embeddings);

        info!(
            "Loading embedding model '{}' from {:?} (arch={}, dim={})",
            config.model_id, model_path, architecture, hf_config.hidden_size
        );

        let tokenizer = load_tokenizer(&model_path, max_seq_len, architecture)?;
        let device = select_device(config.device)?;
        let encoder = load_encoder(&model_path, architecture, &device)?;

        Ok(Self {
            model_info: ModelInfo::new(&config.model_id, hf_config.hidden_size, max_seq_len)
                .with_architecture(architecture),
            encoder: Mutex::new(encoder),
            tokenizer: Mutex::new(tokenizer),
            device,
        })
    }

    fn failed(&self, e: impl std::fmt::Display) -> ModelError {
        ModelError::embedding_failed(&self.model_info.model_id, e.to_string())
    }

    /// Mean pooling over non-padding tokens followed by L2 normalisation.
    fn pool(&self, hidden: &Tensor, mask: &Tensor) -> candle_core::Result<Tensor> {
        let mask = mask
            .unsqueeze(2)?
            .to_dtype(DType::F32)?
            .broadcast_as(hidden.shape())?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        let mean = summed.broadcast_div(&counts)?;

        let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
        mean.broadcast_div(&norm)
    }
}

fn read_required(model_path: &Path, file: &str) -> ModelResult<String> {
    let path = model_path.join(file);
    if !path.exists() {
        return Err(ModelError::model_load(
            model_path.display().to_string(),
            format!("{} not found", file),
        ));
    }
    Ok(std::fs::read_to_string(path)?)
}

fn load_tokenizer(
    model_path: &Path,
    max_length: usize,
    architecture: ModelArchitecture,
) -> ModelResult<Tokenizer> {
    let tokenizer_path = model_path.join("tokenizer.json");
    let load_err = |e: String| ModelError::model_load(model_path.display().to_string(), e);

    if !tokenizer_path.exists() {
        return Err(load_err("tokenizer.json not found".to_string()));
    }

    let (pad_id, pad_token) = match architecture {
        ModelArchitecture::Roberta => (1, "<pad>"),
        _ => (0, "[PAD]"),
    };

    let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| load_err(e.to_string()))?;
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        pad_id,
        pad_token: pad_token.to_string(),
        ..Default::default()
    }));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| load_err(e.to_string()))?;

    Ok(tokenizer)
}

fn select_device(pref: DevicePreference) -> ModelResult<Device> {
    match pref {
        DevicePreference::Cpu => Ok(Device::Cpu),
        DevicePreference::Auto => Ok(try_gpu().unwrap_or_else(|| {
            info!("Using CPU");
            Device::Cpu
        })),
        DevicePreference::Gpu => try_gpu().ok_or_else(|| ModelError::DeviceNotAvailable {
            reason: if cfg!(any(feature = "metal", feature = "cuda")) {
                "no usable GPU was found on this system".to_string()
            } else {
                "kindred was built without GPU support. Rebuild with --features metal or --features cuda"
                    .to_string()
            },
        }),
    }
}

#[allow(unreachable_code)]
fn try_gpu() -> Option<Device> {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Using Metal GPU");
                return Some(device);
            }
            Err(e) => debug!("Metal not available: {}", e),
        }
    }

    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => {
                info!("Using CUDA GPU");
                return Some(device);
            }
            Err(e) => debug!("CUDA not available: {}", e),
        }
    }

    None
}

fn load_encoder(
    model_path: &Path,
    architecture: ModelArchitecture,
    device: &Device,
) -> ModelResult<Encoder> {
    let load_err = |e: candle_core::Error| {
        ModelError::model_load(model_path.display().to_string(), e.to_string())
    };

    let weights_path = model_path.join("model.safetensors");
    if !weights_path.exists() {
        return Err(ModelError::model_load(
            model_path.display().to_string(),
            "model.safetensors not found",
        ));
    }

    // SAFETY: the weights file is opened read-only and not modified while mapped.
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, device).map_err(load_err)?
    };
    let raw_config = read_required(model_path, "config.json")?;

    match architecture {
        ModelArchitecture::Roberta => {
            let config: XLMRobertaConfig = serde_json::from_str(&raw_config)?;
            Ok(Encoder::Roberta(
                XLMRobertaModel::new(&config, vb).map_err(load_err)?,
            ))
        }
        _ => {
            let config: BertConfig = serde_json::from_str(&raw_config)?;
            Ok(Encoder::Bert(BertModel::load(vb, &config).map_err(load_err)?))
        }
    }
}

impl EmbeddingModel for CandleEmbeddingModel {
    fn embed(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = {
            let tokenizer = self.tokenizer.lock().map_err(|e| self.failed(e))?;
            tokenizer
                .encode_batch(texts.to_vec(), true)
                .map_err(|e| ModelError::tokenization(e.to_string()))?
        };

        let batch = encodings.len();
        let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);
        let ids: Vec<u32> = encodings.iter().flat_map(|e| e.get_ids().to_vec()).collect();
        let mask: Vec<u32> = encodings
            .iter()
            .flat_map(|e| e.get_attention_mask().to_vec())
            .collect();

        let ids = Tensor::from_vec(ids, (batch, seq_len), &self.device).map_err(|e| self.failed(e))?;
        let mask =
            Tensor::from_vec(mask, (batch, seq_len), &self.device).map_err(|e| self.failed(e))?;
        let type_ids = ids.zeros_like().map_err(|e| self.failed(e))?;

        let hidden = {
            let encoder = self.encoder.lock().map_err(|e| self.failed(e))?;
            encoder
                .forward(&ids, &type_ids, &mask)
                .map_err(|e| self.failed(e))?
        };

        let rows = self
            .pool(&hidden, &mask)
            .and_then(|t| t.to_vec2::<f32>())
            .map_err(|e| self.failed(e))?;

        Ok(rows)
    }

    fn dimension(&self) -> usize {
        self.model_info.dimension
    }

    fn model_info(&self) -> &ModelInfo {
        &self.model_info
    }
}
