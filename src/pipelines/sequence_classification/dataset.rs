use burn::data::dataset::Dataset;

use crate::{datasets::Example, utils::Tokenize};

use super::{
    features::{convert_examples_to_features, EncodeError, EncodedFeature, LabelIds},
    labels::LabelSchema,
};

/// Encoded features stored as four parallel columns, with random access by example index
#[derive(Clone, Debug, Default)]
pub struct FeatureSet {
    input_ids: Vec<Vec<u32>>,
    attention_mask: Vec<Vec<u32>>,
    segment_ids: Vec<Vec<u32>>,
    label_ids: Vec<LabelIds>,
}

impl FeatureSet {
    /// Encode every example and store the results column by column
    pub fn build<T: Tokenize + ?Sized>(
        examples: &[Example],
        schema: &LabelSchema,
        max_length: usize,
        tokenizer: &T,
    ) -> Result<Self, EncodeError> {
        let features = convert_examples_to_features(examples, schema, max_length, tokenizer)?;

        Ok(Self::from_features(features))
    }

    /// Split already encoded features into columns
    pub fn from_features(features: Vec<EncodedFeature>) -> Self {
        let mut set = Self {
            input_ids: Vec::with_capacity(features.len()),
            attention_mask: Vec::with_capacity(features.len()),
            segment_ids: Vec::with_capacity(features.len()),
            label_ids: Vec::with_capacity(features.len()),
        };

        for feature in features {
            set.input_ids.push(feature.input_ids);
            set.attention_mask.push(feature.attention_mask);
            set.segment_ids.push(feature.segment_ids);
            set.label_ids.push(feature.label_ids);
        }

        set
    }
}

impl Dataset<EncodedFeature> for FeatureSet {
    fn get(&self, index: usize) -> Option<EncodedFeature> {
        Some(EncodedFeature {
            input_ids: self.input_ids.get(index)?.clone(),
            attention_mask: self.attention_mask.get(index)?.clone(),
            segment_ids: self.segment_ids.get(index)?.clone(),
            label_ids: self.label_ids.get(index)?.clone(),
        })
    }

    fn len(&self) -> usize {
        self.input_ids.len()
    }
}
