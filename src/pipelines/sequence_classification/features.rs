use serde::{Deserialize, Serialize};

use crate::{
    datasets::{Example, Label},
    utils::{
        tokenizer::{CLS_TOKEN, SEP_TOKEN},
        Tokenize, TokenizerError,
    },
};

use super::labels::{LabelError, LabelSchema};

/// The number of leading examples logged in full while encoding
const LOGGED_EXAMPLES: usize = 5;

/// The numeric labels for an encoded example
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelIds {
    /// A single class id
    Class(u32),

    /// One label id per position, padded to the sequence length
    Tags(Vec<u32>),
}

impl LabelIds {
    /// The label ids as a row of targets
    pub fn to_row(&self) -> Vec<u32> {
        match self {
            LabelIds::Class(id) => vec![*id],
            LabelIds::Tags(ids) => ids.clone(),
        }
    }
}

/// A fixed-width encoding of one example
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedFeature {
    /// Vocabulary ids, right-padded with 0
    pub input_ids: Vec<u32>,

    /// 1 for every real position, 0 for padding
    pub attention_mask: Vec<u32>,

    /// 0 for the first segment (and padding), 1 for the second
    pub segment_ids: Vec<u32>,

    /// The example's label ids
    pub label_ids: LabelIds,
}

/// Shorten a pair of sequences in place until their combined length fits, one element at a time,
/// always from the longer one. Ties shorten the second sequence.
pub fn truncate_seq_pair<T>(tokens_a: &mut Vec<T>, tokens_b: &mut Vec<T>, max_length: usize) {
    while tokens_a.len() + tokens_b.len() > max_length {
        if tokens_a.len() > tokens_b.len() {
            tokens_a.pop();
        } else {
            tokens_b.pop();
        }
    }
}

/// Encode an example into `[CLS] a [SEP] (b [SEP])` with every sequence padded to `max_length`
pub fn encode<T: Tokenize + ?Sized>(
    example: &Example,
    schema: &LabelSchema,
    max_length: usize,
    tokenizer: &T,
) -> Result<EncodedFeature, EncodeError> {
    let tokenizer_error = |source: TokenizerError| EncodeError::Tokenizer {
        id: example.id.clone(),
        source,
    };

    let mut tokens_a = tokenizer
        .tokenize(&example.text_a)
        .map_err(tokenizer_error)?;
    let untruncated_a = tokens_a.len();

    let mut tokens_b = match example.text_b.as_deref() {
        Some(text) if !text.is_empty() => tokenizer.tokenize(text).map_err(tokenizer_error)?,
        _ => Vec::new(),
    };

    let is_pair = !tokens_b.is_empty();
    let reserved = if is_pair { 3 } else { 2 };

    if max_length < reserved {
        return Err(EncodeError::InvalidMaxLength {
            max_length,
            reserved,
        });
    }

    if is_pair {
        truncate_seq_pair(&mut tokens_a, &mut tokens_b, max_length - reserved);
    } else {
        tokens_a.truncate(max_length - reserved);
    }

    let mut tokens = Vec::with_capacity(max_length);
    tokens.push(CLS_TOKEN.to_string());
    tokens.extend(tokens_a.iter().cloned());
    tokens.push(SEP_TOKEN.to_string());
    let mut segment_ids = vec![0; tokens.len()];

    if is_pair {
        tokens.extend(tokens_b.iter().cloned());
        tokens.push(SEP_TOKEN.to_string());
        segment_ids.resize(tokens.len(), 1);
    }

    let mut input_ids = tokenizer
        .convert_to_ids(&tokens)
        .map_err(tokenizer_error)?;
    let mut attention_mask = vec![1; input_ids.len()];

    input_ids.resize(max_length, 0);
    attention_mask.resize(max_length, 0);
    segment_ids.resize(max_length, 0);

    let label_error = |source: LabelError| EncodeError::Label {
        id: example.id.clone(),
        source,
    };

    let label_ids = match &example.label {
        Label::Class(label) => LabelIds::Class(schema.id(label).map_err(label_error)?),
        Label::Tags(_) => {
            return Err(EncodeError::UnexpandedTags {
                id: example.id.clone(),
            })
        }
        Label::PieceTags(tags) => {
            if tags.len() != untruncated_a + 1 {
                return Err(EncodeError::LabelAlignment {
                    id: example.id.clone(),
                    labels: tags.len(),
                    tokens: untruncated_a,
                });
            }

            let special = schema.require_special().map_err(label_error)?;
            let end_id = schema.id(&special.end).map_err(label_error)?;
            let pad_id = schema.id(&special.pad).map_err(label_error)?;

            let mut ids = tags[..tokens_a.len() + 1]
                .iter()
                .map(|tag| schema.id(tag))
                .collect::<Result<Vec<_>, _>>()
                .map_err(label_error)?;
            ids.push(end_id);
            ids.resize(max_length, pad_id);

            LabelIds::Tags(ids)
        }
    };

    Ok(EncodedFeature {
        input_ids,
        attention_mask,
        segment_ids,
        label_ids,
    })
}

/// Encode every example, logging the first few in full
pub fn convert_examples_to_features<T: Tokenize + ?Sized>(
    examples: &[Example],
    schema: &LabelSchema,
    max_length: usize,
    tokenizer: &T,
) -> Result<Vec<EncodedFeature>, EncodeError> {
    examples
        .iter()
        .enumerate()
        .map(|(index, example)| {
            let feature = encode(example, schema, max_length, tokenizer)?;

            if index < LOGGED_EXAMPLES {
                debug!("*** Example ***");
                debug!("id: {}", example.id);
                debug!("text: {} | {:?}", example.text_a, example.text_b);
                debug!("input_ids: {:?}", feature.input_ids);
                debug!("attention_mask: {:?}", feature.attention_mask);
                debug!("segment_ids: {:?}", feature.segment_ids);
                debug!("label_ids: {:?}", feature.label_ids);
            }

            Ok(feature)
        })
        .collect()
}

/// Feature Encoding Error
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    /// The example's label is not part of the schema
    #[error("example {id}: {source}")]
    Label {
        /// The example id
        id: String,
        /// The label lookup failure
        source: LabelError,
    },

    /// The tokenizer failed on the example's text
    #[error("example {id}: {source}")]
    Tokenizer {
        /// The example id
        id: String,
        /// The tokenizer failure
        source: TokenizerError,
    },

    /// The wordpiece tags do not cover the primary text's pieces
    #[error("example {id} has {labels} labels for {tokens} tokens, expected one label per token plus the start label")]
    LabelAlignment {
        /// The example id
        id: String,
        /// The number of wordpiece labels, including the start label
        labels: usize,
        /// The number of primary-text tokens before truncation
        tokens: usize,
    },

    /// The example still has word-level tags
    #[error("example {id} has word tags; expand them to wordpiece tags before encoding")]
    UnexpandedTags {
        /// The example id
        id: String,
    },

    /// The maximum length cannot hold the special tokens
    #[error("max length {max_length} leaves no room for {reserved} special tokens")]
    InvalidMaxLength {
        /// The requested sequence length
        max_length: usize,
        /// The number of special tokens the example needs
        reserved: usize,
    },
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::pipelines::sequence_classification::wordpiece::{
        expand_example, tests::FakeTokenizer,
    };

    fn class_example(text_a: &str, text_b: Option<&str>, label: &str) -> Example {
        Example::new(
            "train-1".to_string(),
            text_a.to_string(),
            text_b.map(String::from),
            Label::Class(label.to_string()),
        )
    }

    fn tagged_example(text: &str, tags: &[&str]) -> Example {
        Example::new(
            "train-1".to_string(),
            text.to_string(),
            None,
            Label::Tags(tags.iter().map(|t| t.to_string()).collect()),
        )
    }

    #[test]
    fn test_truncate_seq_pair_shortens_longer_first() {
        let mut a: Vec<usize> = (0..10).collect();
        let mut b: Vec<usize> = (0..3).collect();

        truncate_seq_pair(&mut a, &mut b, 7);

        assert_eq!(a, vec![0, 1, 2, 3]);
        assert_eq!(b, vec![0, 1, 2]);
    }

    #[test]
    fn test_truncate_seq_pair_ties_shorten_second() {
        let mut a = vec!["a1", "a2"];
        let mut b = vec!["b1", "b2"];

        truncate_seq_pair(&mut a, &mut b, 3);

        assert_eq!(a, vec!["a1", "a2"]);
        assert_eq!(b, vec!["b1"]);
    }

    #[test]
    fn test_encode_single_sentence() {
        let tokenizer = FakeTokenizer::new(&[]);
        let example = class_example("good fun", None, "1");

        let feature = encode(&example, &LabelSchema::binary(), 6, &tokenizer).unwrap();

        assert_eq!(feature.input_ids, vec![101, 1004, 1003, 102, 0, 0]);
        assert_eq!(feature.attention_mask, vec![1, 1, 1, 1, 0, 0]);
        assert_eq!(feature.segment_ids, vec![0; 6]);
        assert_eq!(feature.label_ids, LabelIds::Class(1));
    }

    #[test]
    fn test_encode_pair_truncates_and_segments() {
        let tokenizer = FakeTokenizer::new(&[]);
        let example = class_example("a b c d e f g h i j", Some("x y z"), "0");

        let feature = encode(&example, &LabelSchema::binary(), 10, &tokenizer).unwrap();

        // [CLS] a b c d [SEP] x y z [SEP]
        assert_eq!(feature.attention_mask.iter().sum::<u32>(), 10);
        assert_eq!(feature.segment_ids, vec![0, 0, 0, 0, 0, 0, 1, 1, 1, 1]);
        assert_eq!(feature.input_ids[5], 102);
        assert_eq!(feature.input_ids[9], 102);
    }

    #[test]
    fn test_encode_empty_second_text_is_single() {
        let tokenizer = FakeTokenizer::new(&[]);
        let example = class_example("ok", Some(""), "1");

        let feature = encode(&example, &LabelSchema::binary(), 4, &tokenizer).unwrap();

        assert_eq!(feature.input_ids, vec![101, 1002, 102, 0]);
        assert_eq!(feature.segment_ids, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_masks_match_real_tokens() {
        let tokenizer = FakeTokenizer::new(&[]);

        for (text, max_length) in [("one", 8), ("one two three four five six", 5)] {
            let example = class_example(text, None, "0");
            let feature = encode(&example, &LabelSchema::binary(), max_length, &tokenizer).unwrap();
            let real = text.split_whitespace().count() + 2;

            assert_eq!(feature.input_ids.len(), max_length);
            assert_eq!(feature.segment_ids.len(), max_length);
            assert_eq!(
                feature.attention_mask.iter().sum::<u32>() as usize,
                real.min(max_length)
            );
            for (id, mask) in feature.input_ids.iter().zip(&feature.attention_mask) {
                if *mask == 0 {
                    assert_eq!(*id, 0);
                }
            }
        }
    }

    #[test]
    fn test_encode_tags_adds_end_label_and_padding() {
        let tokenizer = FakeTokenizer::new(&[("acme", &["ac", "##me"])]);
        let schema = LabelSchema::comp();
        let example = expand_example(
            tagged_example("acme rises", &["B_COMP", "O"]),
            &schema,
            &tokenizer,
        )
        .unwrap();

        let feature = encode(&example, &schema, 7, &tokenizer).unwrap();

        // [CLS]=1 B_COMP=4 I_COMP=5 O=3 [SEP]=2 <pad>=0
        assert_eq!(feature.label_ids, LabelIds::Tags(vec![1, 4, 5, 3, 2, 0, 0]));
        assert_eq!(feature.attention_mask, vec![1, 1, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_encode_tags_truncate_with_tokens() {
        let tokenizer = FakeTokenizer::new(&[("acme", &["ac", "##me"])]);
        let schema = LabelSchema::comp();
        let example = expand_example(
            tagged_example("acme rises", &["B_COMP", "O"]),
            &schema,
            &tokenizer,
        )
        .unwrap();

        let feature = encode(&example, &schema, 4, &tokenizer).unwrap();

        assert_eq!(feature.input_ids, vec![101, 1002, 1004, 102]);
        assert_eq!(feature.label_ids, LabelIds::Tags(vec![1, 4, 5, 2]));
    }

    #[test]
    fn test_encode_misaligned_tags() {
        let tokenizer = FakeTokenizer::new(&[]);
        let example = Example::new(
            "train-7".to_string(),
            "acme rises".to_string(),
            None,
            Label::PieceTags(vec!["[CLS]".to_string(), "B_COMP".to_string()]),
        );

        let result = encode(&example, &LabelSchema::comp(), 8, &tokenizer);

        assert!(matches!(
            result,
            Err(EncodeError::LabelAlignment { labels: 2, tokens: 2, .. })
        ));
    }

    #[test]
    fn test_encode_unexpanded_tags() {
        let tokenizer = FakeTokenizer::new(&[]);
        let example = tagged_example("acme", &["B_COMP"]);

        let result = encode(&example, &LabelSchema::comp(), 8, &tokenizer);

        assert!(matches!(result, Err(EncodeError::UnexpandedTags { .. })));
    }

    #[test]
    fn test_encode_unknown_class_names_example() {
        let tokenizer = FakeTokenizer::new(&[]);
        let example = class_example("fine", None, "maybe");

        let result = encode(&example, &LabelSchema::binary(), 8, &tokenizer);

        match result {
            Err(EncodeError::Label { id, source }) => {
                assert_eq!(id, "train-1");
                assert_eq!(source, LabelError::Unknown("maybe".to_string()));
            }
            other => panic!("expected a label error, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_rejects_tiny_max_length() {
        let tokenizer = FakeTokenizer::new(&[]);
        let example = class_example("a", Some("b"), "0");

        let result = encode(&example, &LabelSchema::binary(), 2, &tokenizer);

        assert!(matches!(
            result,
            Err(EncodeError::InvalidMaxLength {
                max_length: 2,
                reserved: 3
            })
        ));
    }

    #[test]
    fn test_convert_examples_to_features() {
        let tokenizer = FakeTokenizer::new(&[]);
        let examples = vec![
            class_example("one", None, "0"),
            class_example("two words", None, "1"),
        ];

        let features =
            convert_examples_to_features(&examples, &LabelSchema::binary(), 5, &tokenizer)
                .unwrap();

        assert_eq!(features.len(), 2);
        assert_eq!(features[1].label_ids, LabelIds::Class(1));
    }
}
