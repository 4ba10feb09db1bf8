/// Label lists, their numeric ids and wordpiece continuations
pub mod labels;

/// Propagation of word tags to wordpiece tags
pub mod wordpiece;

/// Encoding of examples into fixed-width features
pub mod features;

/// Column storage of encoded features
pub mod dataset;

/// Batching of encoded features into tensors
pub mod batcher;

/// The classifier capability
pub mod model;

/// Learning rate schedule
pub mod schedule;

/// Accuracy and F1 scores
pub mod metrics;

/// Destinations for training metrics
pub mod sink;

/// The training loop
pub mod training;

pub use batcher::{Batch, Batcher};
pub use dataset::FeatureSet;
pub use features::{EncodeError, EncodedFeature, LabelIds};
pub use labels::{LabelError, LabelSchema};
pub use model::{Model, Output};
pub use sink::{History, JsonLinesSink, LogSink, Sink};
pub use training::{train, Config, EpochSummary, TrainError, Trainer};
