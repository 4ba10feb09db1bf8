use crate::{
    datasets::{Example, Label},
    utils::{Tokenize, TokenizerError},
};

use super::labels::{LabelError, LabelSchema};

/// Expand per-word tags into per-wordpiece tags.
///
/// The result starts with the schema's start label. Each word's first piece keeps the word's
/// tag and every further piece gets the tag's continuation, so the output holds one label more
/// than the primary text has pieces. Words that tokenize to nothing contribute no labels.
pub fn expand_labels<T: Tokenize + ?Sized>(
    words: &[String],
    tags: &[String],
    schema: &LabelSchema,
    tokenizer: &T,
) -> Result<Vec<String>, ExpandError> {
    let special = schema.require_special()?;

    if words.len() != tags.len() {
        return Err(ExpandError::Length {
            words: words.len(),
            tags: tags.len(),
        });
    }

    let mut expanded = Vec::with_capacity(words.len() + 1);
    expanded.push(special.start.clone());

    for (word, tag) in words.iter().zip(tags) {
        let continuation = schema.continuation(tag)?;
        let pieces = tokenizer.tokenize(word)?;

        if pieces.is_empty() {
            continue;
        }

        expanded.push(tag.clone());
        expanded.extend((1..pieces.len()).map(|_| continuation.to_string()));
    }

    Ok(expanded)
}

/// Replace an example's word tags with wordpiece tags. Other labels pass through unchanged.
pub fn expand_example<T: Tokenize + ?Sized>(
    example: Example,
    schema: &LabelSchema,
    tokenizer: &T,
) -> Result<Example, ExpandError> {
    let tags = match &example.label {
        Label::Tags(tags) => tags,
        _ => return Ok(example),
    };

    let expanded = expand_labels(&example.words(), tags, schema, tokenizer).map_err(|e| {
        ExpandError::Example {
            id: example.id.clone(),
            source: Box::new(e),
        }
    })?;

    Ok(Example {
        label: Label::PieceTags(expanded),
        ..example
    })
}

/// Expand every example in a split, logging the number of words processed
pub fn expand_examples<T: Tokenize + ?Sized>(
    examples: Vec<Example>,
    schema: &LabelSchema,
    tokenizer: &T,
) -> Result<Vec<Example>, ExpandError> {
    let word_count: usize = examples
        .iter()
        .filter(|example| matches!(example.label, Label::Tags(_)))
        .map(|example| example.text_a.split_whitespace().count())
        .sum();

    let expanded = examples
        .into_iter()
        .map(|example| expand_example(example, schema, tokenizer))
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        "Expanded tags for {} words across {} examples",
        word_count,
        expanded.len()
    );

    Ok(expanded)
}

/// Wordpiece Expansion Error
#[derive(thiserror::Error, Debug)]
pub enum ExpandError {
    /// A tag is not part of the schema, or the schema is not a tagging schema
    #[error(transparent)]
    Label(#[from] LabelError),

    /// The tokenizer failed on a word
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    /// The words and tags are not parallel
    #[error("{words} words but {tags} tags")]
    Length {
        /// The number of words
        words: usize,
        /// The number of tags
        tags: usize,
    },

    /// Expansion failed for a specific example
    #[error("unable to expand tags for example {id}: {source}")]
    Example {
        /// The example id
        id: String,
        /// The underlying failure
        source: Box<ExpandError>,
    },
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::pipelines::sequence_classification::labels::SpecialLabels;

    /// Splits on whitespace, then splits any word from a fixed table into known pieces
    pub(crate) struct FakeTokenizer {
        pieces: BTreeMap<String, Vec<String>>,
    }

    impl FakeTokenizer {
        pub(crate) fn new(splits: &[(&str, &[&str])]) -> Self {
            let pieces = splits
                .iter()
                .map(|(word, pieces)| {
                    (
                        word.to_string(),
                        pieces.iter().map(|p| p.to_string()).collect(),
                    )
                })
                .collect();

            Self { pieces }
        }
    }

    impl Tokenize for FakeTokenizer {
        fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizerError> {
            Ok(text
                .split_whitespace()
                .flat_map(|word| {
                    self.pieces
                        .get(word)
                        .cloned()
                        .unwrap_or_else(|| vec![word.to_string()])
                })
                .collect())
        }

        fn convert_to_ids(&self, tokens: &[String]) -> Result<Vec<u32>, TokenizerError> {
            Ok(tokens
                .iter()
                .map(|token| match token.as_str() {
                    "[CLS]" => 101,
                    "[SEP]" => 102,
                    other => 1000 + other.len() as u32,
                })
                .collect())
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn schema_x() -> LabelSchema {
        let mut continuation = BTreeMap::new();
        continuation.insert("O".to_string(), "O".to_string());
        continuation.insert("B_X".to_string(), "I_X".to_string());
        continuation.insert("I_X".to_string(), "I_X".to_string());

        LabelSchema::tagging(
            strings(&["<pad>", "[START]", "[END]", "O", "B_X", "I_X"]),
            continuation,
            SpecialLabels::new(
                "[START]".to_string(),
                "[END]".to_string(),
                "<pad>".to_string(),
            ),
        )
        .unwrap()
    }

    #[test]
    fn test_expand_labels_continues_trailing_pieces() {
        let tokenizer = FakeTokenizer::new(&[("running", &["run", "##ning"])]);

        let expanded = expand_labels(
            &strings(&["running", "fast"]),
            &strings(&["B_X", "O"]),
            &schema_x(),
            &tokenizer,
        )
        .unwrap();

        assert_eq!(expanded, strings(&["[START]", "B_X", "I_X", "O"]));
    }

    #[test]
    fn test_expand_labels_skips_empty_words() {
        let tokenizer = FakeTokenizer::new(&[("\u{200b}", &[])]);

        let expanded = expand_labels(
            &strings(&["\u{200b}", "fast"]),
            &strings(&["B_X", "O"]),
            &schema_x(),
            &tokenizer,
        )
        .unwrap();

        assert_eq!(expanded, strings(&["[START]", "O"]));
    }

    #[test]
    fn test_unknown_tag() {
        let tokenizer = FakeTokenizer::new(&[]);

        let result = expand_labels(
            &strings(&["fast"]),
            &strings(&["B_Y"]),
            &schema_x(),
            &tokenizer,
        );

        assert!(matches!(
            result,
            Err(ExpandError::Label(LabelError::Unknown(tag))) if tag == "B_Y"
        ));
    }

    #[test]
    fn test_class_schema_cannot_expand() {
        let tokenizer = FakeTokenizer::new(&[]);

        let result = expand_labels(
            &strings(&["fast"]),
            &strings(&["1"]),
            &LabelSchema::binary(),
            &tokenizer,
        );

        assert!(matches!(
            result,
            Err(ExpandError::Label(LabelError::NotTagging))
        ));
    }

    #[test]
    fn test_expand_examples_replaces_word_tags() {
        let tokenizer = FakeTokenizer::new(&[("acme", &["ac", "##me"])]);
        let examples = vec![
            Example::new(
                "train-1".to_string(),
                "acme rises".to_string(),
                None,
                Label::Tags(strings(&["B_COMP", "O"])),
            ),
            Example::new(
                "train-2".to_string(),
                "flat".to_string(),
                None,
                Label::Class("1".to_string()),
            ),
        ];

        let expanded = expand_examples(examples, &LabelSchema::comp(), &tokenizer).unwrap();

        assert_eq!(
            expanded[0].label,
            Label::PieceTags(strings(&["[CLS]", "B_COMP", "I_COMP", "O"]))
        );
        assert_eq!(expanded[1].label, Label::Class("1".to_string()));
    }

    #[test]
    fn test_expand_example_names_the_example() {
        let tokenizer = FakeTokenizer::new(&[]);
        let example = Example::new(
            "val-3".to_string(),
            "one two".to_string(),
            None,
            Label::Tags(strings(&["O"])),
        );

        let result = expand_example(example, &LabelSchema::comp(), &tokenizer);

        assert!(matches!(result, Err(ExpandError::Example { id, .. }) if id == "val-3"));
    }
}
