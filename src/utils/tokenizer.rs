use std::path::Path;

use tokenizers::Tokenizer;

/// The token that opens every encoded sequence
pub static CLS_TOKEN: &str = "[CLS]";

/// The token that closes each encoded segment
pub static SEP_TOKEN: &str = "[SEP]";

/// The vocabulary fallback for out-of-vocabulary pieces
pub static UNK_TOKEN: &str = "[UNK]";

/// Splits text into wordpieces and maps pieces to vocabulary ids.
///
/// Lower-casing is the caller's concern: implementations tokenize the text they are given.
pub trait Tokenize {
    /// Split text into wordpieces
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizerError>;

    /// Map wordpieces to vocabulary ids
    fn convert_to_ids(&self, tokens: &[String]) -> Result<Vec<u32>, TokenizerError>;
}

impl Tokenize for Tokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizerError> {
        // Special tokens are placed by the feature encoder, not the tokenizer's post-processor
        let encoding = self
            .encode(text, false)
            .map_err(|e| TokenizerError::Encode {
                text: text.to_string(),
                reason: e.to_string(),
            })?;

        Ok(encoding.get_tokens().to_vec())
    }

    fn convert_to_ids(&self, tokens: &[String]) -> Result<Vec<u32>, TokenizerError> {
        let unk_token_id = self.token_to_id(UNK_TOKEN);

        tokens
            .iter()
            .map(|token| {
                self.token_to_id(token)
                    .or(unk_token_id)
                    .ok_or_else(|| TokenizerError::UnknownToken(token.clone()))
            })
            .collect()
    }
}

/// Load a serialized `tokenizer.json`
pub fn load_tokenizer<P: AsRef<Path>>(path: P) -> anyhow::Result<Tokenizer> {
    Tokenizer::from_file(path.as_ref()).map_err(|e| {
        anyhow!(
            "Unable to load tokenizer from {}: {}",
            path.as_ref().display(),
            e
        )
    })
}

/// Tokenizer Error
#[derive(thiserror::Error, Debug)]
pub enum TokenizerError {
    /// The underlying tokenizer rejected the input
    #[error("unable to tokenize {text:?}: {reason}")]
    Encode {
        /// The text that failed to tokenize
        text: String,
        /// The tokenizer's own error message
        reason: String,
    },

    /// A piece has no id and the vocabulary has no unknown token to fall back on
    #[error("token {0:?} is not in the vocabulary")]
    UnknownToken(String),
}
