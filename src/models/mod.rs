/// BERT-style encoder classifiers
pub mod bert;
