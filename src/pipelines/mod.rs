/// Sequence and token classification: feature preparation and training
pub mod sequence_classification;
