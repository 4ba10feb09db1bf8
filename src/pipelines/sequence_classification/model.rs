use burn::tensor::{backend::Backend, Int, Tensor};
use derive_new::new;

use super::batcher::Batch;

/// The result of a forward pass over a batch
#[derive(Debug, Clone, new)]
pub struct Output<B: Backend> {
    /// The mean cross-entropy loss over every non-padding position
    pub loss: Tensor<B, 1>,

    /// Per-position label scores: [batch_size, positions, num_labels]
    pub logits: Tensor<B, 3>,

    /// Label ids: [batch_size, positions]
    pub targets: Tensor<B, 2, Int>,
}

/// A classifier that scores every label at every target position.
///
/// Class tasks have a single position per example and tagging tasks have one position per token.
pub trait Model<B: Backend> {
    /// Perform a forward pass and compute the loss against the batch targets
    fn forward(&self, batch: Batch<B>) -> Output<B>;

    /// The number of labels the classifier scores
    fn num_labels(&self) -> usize;
}
