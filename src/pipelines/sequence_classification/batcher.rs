use burn::{
    data::dataloader,
    tensor::{backend::Backend, Bool, Int, Tensor},
};
use derive_new::new;

use crate::utils::tensors;

use super::features::EncodedFeature;

/// A training batch of encoded features
#[derive(Clone, Debug, new)]
pub struct Batch<B: Backend> {
    /// Vocabulary ids as 2D tensor: [batch_size, max_seq_length]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 for real positions and 0 for padding: [batch_size, max_seq_length]
    pub attention_mask: Tensor<B, 2, Int>,

    /// Segment ids: [batch_size, max_seq_length]
    pub segment_ids: Tensor<B, 2, Int>,

    /// Label ids: [batch_size, 1] for class labels, [batch_size, max_seq_length] for tags
    pub targets: Tensor<B, 2, Int>,
}

impl<B: Backend> Batch<B> {
    /// Move every tensor of the batch to a device
    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            input_ids: self.input_ids.to_device(device),
            attention_mask: self.attention_mask.to_device(device),
            segment_ids: self.segment_ids.to_device(device),
            targets: self.targets.to_device(device),
        }
    }

    /// A mask holding `true` at padding positions, as the encoder's attention expects
    pub fn mask_pad(&self) -> Tensor<B, 2, Bool> {
        self.attention_mask.clone().equal_elem(0)
    }
}

/// Stacks encoded features into a training batch
#[derive(Clone, Debug, Default, new)]
pub struct Batcher;

impl<B: Backend> dataloader::batcher::Batcher<B, EncodedFeature, Batch<B>> for Batcher {
    fn batch(&self, items: Vec<EncodedFeature>, device: &B::Device) -> Batch<B> {
        let batch_size = items.len();

        let mut input_ids = Vec::with_capacity(batch_size);
        let mut attention_mask = Vec::with_capacity(batch_size);
        let mut segment_ids = Vec::with_capacity(batch_size);
        let mut targets = Vec::with_capacity(batch_size);

        for item in items {
            targets.push(item.label_ids.to_row());
            input_ids.push(item.input_ids);
            attention_mask.push(item.attention_mask);
            segment_ids.push(item.segment_ids);
        }

        Batch {
            input_ids: tensors::stack_rows(input_ids, device),
            attention_mask: tensors::stack_rows(attention_mask, device),
            segment_ids: tensors::stack_rows(segment_ids, device),
            targets: tensors::stack_rows(targets, device),
        }
    }
}

#[cfg(test)]
mod tests {
    use burn::{backend::NdArray, data::dataloader::batcher::Batcher as _};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::pipelines::sequence_classification::features::LabelIds;

    fn feature(input_ids: Vec<u32>, label_ids: LabelIds) -> EncodedFeature {
        let attention_mask = input_ids.iter().map(|id| u32::from(*id != 0)).collect();
        let segment_ids = vec![0; input_ids.len()];

        EncodedFeature {
            input_ids,
            attention_mask,
            segment_ids,
            label_ids,
        }
    }

    #[test]
    fn test_batch_class_targets() {
        let device = Default::default();
        let items = vec![
            feature(vec![101, 7, 102, 0], LabelIds::Class(1)),
            feature(vec![101, 8, 9, 102], LabelIds::Class(0)),
        ];

        let batch: Batch<NdArray> = Batcher.batch(items, &device);

        assert_eq!(batch.input_ids.dims(), [2, 4]);
        assert_eq!(tensors::to_rows(batch.targets), vec![vec![1], vec![0]]);
        assert_eq!(
            tensors::to_rows(batch.attention_mask.clone()),
            vec![vec![1, 1, 1, 0], vec![1, 1, 1, 1]]
        );
    }

    #[test]
    fn test_batch_tag_targets_and_pad_mask() {
        let device = Default::default();
        let items = vec![feature(
            vec![101, 7, 102, 0],
            LabelIds::Tags(vec![1, 3, 2, 0]),
        )];

        let batch: Batch<NdArray> = Batcher.batch(items, &device);
        let mask: Vec<bool> = batch.mask_pad().into_data().iter::<bool>().collect();

        assert_eq!(tensors::to_rows(batch.targets), vec![vec![1, 3, 2, 0]]);
        assert_eq!(mask, vec![false, false, false, true]);
    }
}
