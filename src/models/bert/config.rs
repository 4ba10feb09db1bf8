use burn::{
    module::Ignored,
    nn::{
        transformer::TransformerEncoderConfig, DropoutConfig, EmbeddingConfig, LayerNormConfig,
        LinearConfig,
    },
    tensor::backend::Backend,
};

use crate::pipelines::sequence_classification::labels::LabelSchema;

use super::Model;

/// The Model Configuration
#[derive(burn::config::Config, Debug)]
pub struct Config {
    /// Size of the vocabulary
    pub vocab_size: usize,

    /// Number of labels the classifier scores
    pub num_labels: usize,

    /// Score every token (tagging) rather than the `[CLS]` position only
    #[config(default = false)]
    pub tagging: bool,

    /// The label id excluded from the loss, if any
    pub pad_label_id: Option<usize>,

    /// Size of the hidden state
    #[config(default = 768)]
    pub hidden_size: usize,

    /// Number of attention heads in the multi-head attention
    #[config(default = 12)]
    pub num_attention_heads: usize,

    /// Number of transformer encoder layers/blocks
    #[config(default = 12)]
    pub num_hidden_layers: usize,

    /// Size of the intermediate position wise feedforward layer
    #[config(default = 3072)]
    pub intermediate_size: usize,

    /// Max position embeddings, the longest sequence the model accepts
    #[config(default = 512)]
    pub max_position_embeddings: usize,

    /// Number of segment types (e.g., 2 for sentence pairs)
    #[config(default = 2)]
    pub type_vocab_size: usize,

    /// Dropout value across layers, typically 0.1
    #[config(default = 0.1)]
    pub hidden_dropout_prob: f64,

    /// Layer normalization epsilon
    #[config(default = 1e-12)]
    pub layer_norm_eps: f64,
}

impl Config {
    /// A configuration whose head matches a label schema
    pub fn for_schema(vocab_size: usize, schema: &LabelSchema) -> Self {
        Config::new(vocab_size, schema.len())
            .with_tagging(schema.is_tagging())
            .with_pad_label_id(schema.pad_id().map(|id| id as usize))
    }

    /// Initialize the model
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        let encoder = TransformerEncoderConfig::new(
            self.hidden_size,
            self.intermediate_size,
            self.num_attention_heads,
            self.num_hidden_layers,
        )
        .with_dropout(self.hidden_dropout_prob)
        .init(device);

        Model {
            word_embeddings: EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device),
            position_embeddings: EmbeddingConfig::new(
                self.max_position_embeddings,
                self.hidden_size,
            )
            .init(device),
            token_type_embeddings: EmbeddingConfig::new(self.type_vocab_size, self.hidden_size)
                .init(device),
            layer_norm: LayerNormConfig::new(self.hidden_size)
                .with_epsilon(self.layer_norm_eps)
                .init(device),
            dropout: DropoutConfig::new(self.hidden_dropout_prob).init(),
            encoder,
            pooler: LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
            output: LinearConfig::new(self.hidden_size, self.num_labels).init(device),
            num_labels: self.num_labels,
            tagging: self.tagging,
            pad_label_id: Ignored(self.pad_label_id),
        }
    }
}
