use burn::{
    module::{Ignored, Module},
    nn::{
        loss::CrossEntropyLossConfig,
        transformer::{TransformerEncoder, TransformerEncoderInput},
        Dropout, Embedding, LayerNorm, Linear,
    },
    tensor::{activation::tanh, backend::Backend, Int, Tensor},
};

use crate::pipelines::sequence_classification::{batcher::Batch, model, Output};

/// A BERT-style encoder with a classification head
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    /// Token embeddings
    pub word_embeddings: Embedding<B>,

    /// Learned absolute position embeddings
    pub position_embeddings: Embedding<B>,

    /// Segment embeddings
    pub token_type_embeddings: Embedding<B>,

    /// Normalization applied to the summed embeddings
    pub layer_norm: LayerNorm<B>,

    /// Dropout applied to the summed embeddings
    pub dropout: Dropout,

    /// The transformer encoder stack
    pub encoder: TransformerEncoder<B>,

    /// Dense layer applied to the `[CLS]` state for sequence classification
    pub pooler: Linear<B>,

    /// Linear layer producing label scores
    pub output: Linear<B>,

    /// Total number of labels
    pub num_labels: usize,

    /// Whether every token is scored
    pub tagging: bool,

    /// Label id ignored by the loss
    pub pad_label_id: Ignored<Option<usize>>,
}

/// Define model behavior
impl<B: Backend> Model<B> {
    /// Encode a batch into per-position label scores: [batch_size, positions, num_labels]
    pub fn logits(&self, batch: &Batch<B>) -> Tensor<B, 3> {
        let [batch_size, seq_length] = batch.input_ids.dims();
        let device = batch.input_ids.device();

        let positions = Tensor::<B, 1, Int>::arange(0..seq_length as i64, &device)
            .reshape([1, seq_length])
            .repeat_dim(0, batch_size);

        let embeddings = self.word_embeddings.forward(batch.input_ids.clone())
            + self.position_embeddings.forward(positions)
            + self.token_type_embeddings.forward(batch.segment_ids.clone());
        let embeddings = self.dropout.forward(self.layer_norm.forward(embeddings));

        let hidden_states = self
            .encoder
            .forward(TransformerEncoderInput::new(embeddings).mask_pad(batch.mask_pad()));

        if self.tagging {
            self.output.forward(hidden_states)
        } else {
            let pooled = tanh(self.pooler.forward(hidden_states.narrow(1, 0, 1)));

            self.output.forward(self.dropout.forward(pooled))
        }
    }
}

impl<B: Backend> model::Model<B> for Model<B> {
    fn forward(&self, batch: Batch<B>) -> Output<B> {
        let logits = self.logits(&batch);
        let [batch_size, positions, num_labels] = logits.dims();

        let targets = batch.targets;

        let loss = CrossEntropyLossConfig::new()
            .with_pad_tokens(self.pad_label_id.0.map(|id| vec![id]))
            .init(&logits.device())
            .forward(
                logits.clone().reshape([batch_size * positions, num_labels]),
                targets.clone().reshape([batch_size * positions]),
            );

        Output {
            loss,
            logits,
            targets,
        }
    }

    fn num_labels(&self) -> usize {
        self.num_labels
    }
}
