use std::path::{Path, PathBuf};

use burn::tensor::backend::Backend;
use burn_store::{ModuleSnapshot, PyTorchToBurnAdapter, SafetensorsStore, SafetensorsStoreError};
use serde::Deserialize;

use crate::pipelines::sequence_classification::labels::LabelSchema;

use super::{Config, Model};

/// Tensor names in Hugging Face BERT checkpoints, rewritten to this encoder's module paths.
/// Patterns apply in order, each to the result of the previous one.
static KEY_REMAPPING: [(&str, &str); 13] = [
    (r"^(bert\.)?embeddings\.word_embeddings\.", "word_embeddings."),
    (r"^(bert\.)?embeddings\.position_embeddings\.", "position_embeddings."),
    (r"^(bert\.)?embeddings\.token_type_embeddings\.", "token_type_embeddings."),
    (r"^(bert\.)?embeddings\.LayerNorm\.", "layer_norm."),
    (
        r"^(bert\.)?encoder\.layer\.([0-9]+)\.attention\.self\.query\.",
        "encoder.layers.$2.mha.query.",
    ),
    (
        r"^(bert\.)?encoder\.layer\.([0-9]+)\.attention\.self\.key\.",
        "encoder.layers.$2.mha.key.",
    ),
    (
        r"^(bert\.)?encoder\.layer\.([0-9]+)\.attention\.self\.value\.",
        "encoder.layers.$2.mha.value.",
    ),
    (
        r"^(bert\.)?encoder\.layer\.([0-9]+)\.attention\.output\.dense\.",
        "encoder.layers.$2.mha.output.",
    ),
    (
        r"^(bert\.)?encoder\.layer\.([0-9]+)\.attention\.output\.LayerNorm\.",
        "encoder.layers.$2.norm_1.",
    ),
    (
        r"^(bert\.)?encoder\.layer\.([0-9]+)\.intermediate\.dense\.",
        "encoder.layers.$2.pwff.linear_inner.",
    ),
    (
        r"^(bert\.)?encoder\.layer\.([0-9]+)\.output\.dense\.",
        "encoder.layers.$2.pwff.linear_outer.",
    ),
    (
        r"^(bert\.)?encoder\.layer\.([0-9]+)\.output\.LayerNorm\.",
        "encoder.layers.$2.norm_2.",
    ),
    (r"^(bert\.)?pooler\.dense\.", "pooler."),
];

/// The classifier head is trained from scratch, so a checkpoint never holds it
static HEAD_PREFIX: &str = "output.";

/// The subset of a Hugging Face `config.json` that sizes the encoder
#[derive(Debug, Deserialize)]
struct PretrainedConfig {
    vocab_size: usize,
    hidden_size: usize,
    num_hidden_layers: usize,
    num_attention_heads: usize,
    intermediate_size: usize,
    max_position_embeddings: usize,
    #[serde(default = "default_type_vocab_size")]
    type_vocab_size: usize,
    #[serde(default = "default_dropout")]
    hidden_dropout_prob: f64,
    #[serde(default = "default_layer_norm_eps")]
    layer_norm_eps: f64,
}

fn default_type_vocab_size() -> usize {
    2
}

fn default_dropout() -> f64 {
    0.1
}

fn default_layer_norm_eps() -> f64 {
    1e-12
}

impl Config {
    /// Size the encoder from a pretrained model's `config.json`, with a head matching the schema
    pub fn load_pretrained<P: AsRef<Path>>(
        config_file: P,
        schema: &LabelSchema,
    ) -> Result<Self, LoadError> {
        let path = config_file.as_ref();

        let contents = std::fs::read_to_string(path).map_err(|source| LoadError::ConfigAccess {
            path: path.to_path_buf(),
            source,
        })?;

        let pretrained: PretrainedConfig =
            serde_json::from_str(&contents).map_err(|source| LoadError::ConfigFormat {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Config::for_schema(pretrained.vocab_size, schema)
            .with_hidden_size(pretrained.hidden_size)
            .with_num_hidden_layers(pretrained.num_hidden_layers)
            .with_num_attention_heads(pretrained.num_attention_heads)
            .with_intermediate_size(pretrained.intermediate_size)
            .with_max_position_embeddings(pretrained.max_position_embeddings)
            .with_type_vocab_size(pretrained.type_vocab_size)
            .with_hidden_dropout_prob(pretrained.hidden_dropout_prob)
            .with_layer_norm_eps(pretrained.layer_norm_eps))
    }
}

/// A safetensors store that reads Hugging Face BERT weights into this encoder
pub fn pretrained_store(store: SafetensorsStore) -> SafetensorsStore {
    KEY_REMAPPING
        .iter()
        .fold(store, |store, (from, to)| store.with_key_remapping(from, *to))
        .with_from_adapter(PyTorchToBurnAdapter)
        .allow_partial(true)
}

impl<B: Backend> Model<B> {
    /// Load pretrained encoder weights from a `model.safetensors` file
    pub fn load_pretrained_file<P: AsRef<Path>>(self, weights_file: P) -> Result<Self, LoadError> {
        info!(
            "Loading pretrained weights from {}",
            weights_file.as_ref().display()
        );

        self.load_pretrained(SafetensorsStore::from_file(weights_file.as_ref()))
    }

    /// Load pretrained encoder weights, leaving the freshly initialized classifier head in place.
    /// Every other parameter must be present in the checkpoint.
    pub fn load_pretrained(mut self, store: SafetensorsStore) -> Result<Self, LoadError> {
        let mut store = pretrained_store(store);

        let result = self.load_from(&mut store)?;

        let missing: Vec<String> = result
            .missing
            .iter()
            .map(|(path, _)| path.clone())
            .filter(|path| !path.starts_with(HEAD_PREFIX))
            .collect();

        if !missing.is_empty() {
            return Err(LoadError::MissingTensors(missing));
        }

        debug!("Unused checkpoint tensors: {:?}", result.unused);
        info!("Loaded {} pretrained tensors", result.applied.len());

        Ok(self)
    }
}

/// Pretrained Loading Error
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    /// The model config file is missing or unreadable
    #[error("unable to read model config {path}: {source}")]
    ConfigAccess {
        /// The config file
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// The model config file is not a BERT config
    #[error("unable to parse model config {path}: {source}")]
    ConfigFormat {
        /// The config file
        path: PathBuf,
        /// The underlying JSON error
        source: serde_json::Error,
    },

    /// The weights file could not be read or did not fit the encoder
    #[error("unable to load pretrained weights: {0}")]
    Weights(#[from] SafetensorsStoreError),

    /// Encoder parameters the checkpoint does not provide
    #[error("pretrained weights are missing {0:?}")]
    MissingTensors(Vec<String>),
}
