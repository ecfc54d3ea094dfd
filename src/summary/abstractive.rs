//! Abstractive summarization with a quantized Flan-T5 model via candle.
//!
//! Downloads the model artifacts from HuggingFace on first use, then runs
//! greedy decoding over the `summarize:` task prefix.
//!
//! # Feature Gate
//!
//! Requires the `abstractive` feature:
//!
//! ```bash
//! cargo build --features abstractive
//! ```

use crate::defaults;
use crate::error::{Result, StenogramError};
use crate::summary::Summarizer;
use std::sync::Mutex;

use candle_core::{Device, Tensor};
use candle_transformers::models::quantized_t5::{Config as T5Config, T5ForConditionalGeneration};
use candle_transformers::quantized_var_builder::VarBuilder;
use hf_hub::api::sync::Api;
use tokenizers::Tokenizer;

/// HuggingFace repository holding the quantized model.
const HF_REPO: &str = "lmz/candle-quantized-t5";
/// Quantized weights file within the repository.
const HF_WEIGHTS: &str = "model-flan-t5-small.gguf";
/// Model config file within the repository.
const HF_CONFIG: &str = "config-flan-t5-small.json";
/// Tokenizer file within the repository.
const HF_TOKENIZER: &str = "tokenizer.json";

/// Maximum number of tokens to generate per summary.
const MAX_DECODE_TOKENS: usize = 192;
/// T5 end-of-sequence token id.
const EOS_TOKEN: u32 = 1;

/// Abstractive summarizer running quantized T5 inference on the CPU.
///
/// The model holds a mutable KV cache, so inference is serialized behind a
/// mutex; the scheduler only ever summarizes one snapshot at a time anyway.
pub struct AbstractiveSummarizer {
    inner: Mutex<T5Inner>,
}

struct T5Inner {
    model: T5ForConditionalGeneration,
    tokenizer: Tokenizer,
    device: Device,
}

impl AbstractiveSummarizer {
    /// Loads the quantized model, downloading artifacts on first use.
    pub fn load() -> Result<Self> {
        let device = Device::Cpu;
        let api =
            Api::new().map_err(|e| StenogramError::Summarization {
                message: format!("HF Hub API init: {e}"),
            })?;
        let repo = api.model(HF_REPO.to_string());

        let weights_path = repo.get(HF_WEIGHTS).map_err(|e| {
            StenogramError::Summarization {
                message: format!("download weights {HF_WEIGHTS}: {e}"),
            }
        })?;
        let config_path = repo.get(HF_CONFIG).map_err(|e| StenogramError::Summarization {
            message: format!("download config {HF_CONFIG}: {e}"),
        })?;
        let tokenizer_path = repo
            .get(HF_TOKENIZER)
            .map_err(|e| StenogramError::Summarization {
                message: format!("download tokenizer: {e}"),
            })?;

        let config_bytes =
            std::fs::read(&config_path).map_err(|e| StenogramError::Summarization {
                message: format!("read config {}: {e}", config_path.display()),
            })?;
        let config: T5Config =
            serde_json::from_slice(&config_bytes).map_err(|e| StenogramError::Summarization {
                message: format!("parse T5 config: {e}"),
            })?;

        let vb = VarBuilder::from_gguf(&weights_path, &device).map_err(|e| {
            StenogramError::Summarization {
                message: format!("load GGUF weights {}: {e}", weights_path.display()),
            }
        })?;
        let model = T5ForConditionalGeneration::load(vb, &config).map_err(|e| {
            StenogramError::Summarization {
                message: format!("init T5 model: {e}"),
            }
        })?;

        let tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(|e| StenogramError::Summarization {
                message: format!("load tokenizer {}: {e}", tokenizer_path.display()),
            })?;

        Ok(Self {
            inner: Mutex::new(T5Inner {
                model,
                tokenizer,
                device,
            }),
        })
    }
}

impl T5Inner {
    /// Encodes the prompt and greedily decodes a summary.
    fn generate(&mut self, prompt: &str) -> Result<String> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| StenogramError::Summarization {
                message: format!("tokenize: {e}"),
            })?;

        let input_ids: Vec<u32> = encoding.get_ids().to_vec();
        let input_tensor = Tensor::new(input_ids.as_slice(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| StenogramError::Summarization {
                message: format!("build input tensor: {e}"),
            })?;

        let encoder_output =
            self.model
                .encode(&input_tensor)
                .map_err(|e| StenogramError::Summarization {
                    message: format!("encoder forward: {e}"),
                })?;

        // Greedy decode with incremental KV cache: first step feeds the pad
        // token, each later step feeds only the newly decoded token.
        let mut decoded_ids: Vec<u32> = vec![0];
        let mut next_input = vec![0u32];

        for _ in 0..MAX_DECODE_TOKENS {
            let decoder_input = Tensor::new(next_input.as_slice(), &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(|e| StenogramError::Summarization {
                    message: format!("build decoder input: {e}"),
                })?;

            let logits = self
                .model
                .decode(&decoder_input, &encoder_output)
                .map_err(|e| StenogramError::Summarization {
                    message: format!("decoder forward: {e}"),
                })?;

            let seq_len = logits.dim(1).map_err(|e| StenogramError::Summarization {
                message: format!("logits dim: {e}"),
            })?;
            let next_token = logits
                .get_on_dim(1, seq_len - 1)
                .and_then(|t| t.argmax(candle_core::D::Minus1))
                .and_then(|t| t.reshape(()))
                .and_then(|t| t.to_scalar::<u32>())
                .map_err(|e| StenogramError::Summarization {
                    message: format!("select next token: {e}"),
                })?;

            if next_token == EOS_TOKEN {
                break;
            }

            decoded_ids.push(next_token);
            next_input = vec![next_token];
        }

        // Skip the leading pad token when detokenizing.
        self.tokenizer
            .decode(&decoded_ids[1..], true)
            .map_err(|e| StenogramError::Summarization {
                message: format!("detokenize: {e}"),
            })
    }
}

impl Summarizer for AbstractiveSummarizer {
    fn summarize(&self, text: &str) -> Result<String> {
        let text = text.trim();
        if text.len() < defaults::MIN_SUMMARY_INPUT_CHARS {
            return Err(StenogramError::InsufficientInput {
                message: format!(
                    "transcript has {} characters, need at least {}",
                    text.len(),
                    defaults::MIN_SUMMARY_INPUT_CHARS
                ),
            });
        }

        let prompt = format!("summarize: {text}");
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StenogramError::Summarization {
                message: "summarizer lock poisoned".to_string(),
            })?;
        inner.model.clear_kv_cache();
        inner.generate(&prompt)
    }

    fn mode(&self) -> &'static str {
        "abstractive"
    }
}
