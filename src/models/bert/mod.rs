/// The encoder configuration
pub mod config;

/// Pretrained checkpoint loading
pub mod loader;

/// The encoder classifier
pub mod model;

pub use config::Config;
pub use loader::LoadError;
pub use model::Model;

/// Pretrained checkpoints the command line accepts
pub static MODELS: [&str; 3] = ["bert-base-uncased", "bert-base-cased", "bert-base-multilingual-cased"];
