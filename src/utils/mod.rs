/// Hugging Face utilities
pub mod hugging_face;

/// Tensor Utilities
pub mod tensors;

/// Utilities for classification tasks
pub mod classes;

/// The tokenizer capability consumed by the feature pipeline
pub mod tokenizer;

pub use tokenizer::{Tokenize, TokenizerError};
