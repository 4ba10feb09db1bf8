use std::collections::{BTreeMap, BTreeSet};

use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::utils::classes::index_map;

/// The label every tag sequence starts with
pub static START_LABEL: &str = "[CLS]";

/// The label placed at the closing separator of a tag sequence
pub static END_LABEL: &str = "[SEP]";

/// The label used to pad tag sequences, ignored by the loss
pub static PAD_LABEL: &str = "<pad>";

/// The label for tokens outside of any entity
pub static OUTSIDE_LABEL: &str = "O";

/// The labels reserved for sequence markers in a tagging schema
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct SpecialLabels {
    /// The label for the leading `[CLS]` position
    pub start: String,

    /// The label for the closing `[SEP]` position
    pub end: String,

    /// The label for padding positions
    pub pad: String,
}

impl Default for SpecialLabels {
    fn default() -> Self {
        Self::new(
            START_LABEL.to_string(),
            END_LABEL.to_string(),
            PAD_LABEL.to_string(),
        )
    }
}

/// An ordered label list, where a label's position is its numeric id.
///
/// Tagging schemas also carry the continuation map used to label trailing wordpieces, and the
/// special labels for the sequence markers. Class schemas carry neither.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelSchema {
    labels: Vec<String>,
    label2id: BTreeMap<String, usize>,
    continuation: BTreeMap<String, String>,
    special: Option<SpecialLabels>,
}

impl LabelSchema {
    /// A schema of plain class labels
    pub fn classes(labels: Vec<String>) -> Result<Self, LabelError> {
        check_unique(&labels)?;

        Ok(Self {
            label2id: index_map(&labels),
            labels,
            continuation: BTreeMap::new(),
            special: None,
        })
    }

    /// A tagging schema, validated so that every non-special label has a continuation within
    /// the label list and every special label is a member of it
    pub fn tagging(
        labels: Vec<String>,
        continuation: BTreeMap<String, String>,
        special: SpecialLabels,
    ) -> Result<Self, LabelError> {
        check_unique(&labels)?;

        let label2id = index_map(&labels);

        for label in [&special.start, &special.end, &special.pad] {
            if !label2id.contains_key(label) {
                return Err(LabelError::InvalidSpecial(label.clone()));
            }
        }

        for (from, to) in &continuation {
            if !label2id.contains_key(from) || !label2id.contains_key(to) {
                return Err(LabelError::InvalidContinuation {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }

        let is_special = |label: &String| {
            *label == special.start || *label == special.end || *label == special.pad
        };

        if let Some(label) = labels
            .iter()
            .find(|label| !is_special(label) && !continuation.contains_key(*label))
        {
            return Err(LabelError::MissingContinuation(label.clone()));
        }

        Ok(Self {
            labels,
            label2id,
            continuation,
            special: Some(special),
        })
    }

    /// A tagging schema in the `B_X`/`I_X` scheme for the given entity types.
    ///
    /// Labels are ordered as the special labels, the outside label, every `B_` label, then every
    /// `I_` label.
    pub fn iob(entity_types: &[&str]) -> Self {
        let special = SpecialLabels::default();

        let mut labels = vec![
            special.pad.clone(),
            special.start.clone(),
            special.end.clone(),
            OUTSIDE_LABEL.to_string(),
        ];
        let mut continuation = BTreeMap::new();
        continuation.insert(OUTSIDE_LABEL.to_string(), OUTSIDE_LABEL.to_string());

        for entity in entity_types {
            labels.push(format!("B_{}", entity));
            continuation.insert(format!("B_{}", entity), format!("I_{}", entity));
        }

        for entity in entity_types {
            labels.push(format!("I_{}", entity));
            continuation.insert(format!("I_{}", entity), format!("I_{}", entity));
        }

        Self {
            label2id: index_map(&labels),
            labels,
            continuation,
            special: Some(special),
        }
    }

    /// The two-class schema for binary sentence classification
    pub fn binary() -> Self {
        let labels = vec!["0".to_string(), "1".to_string()];

        Self {
            label2id: index_map(&labels),
            labels,
            continuation: BTreeMap::new(),
            special: None,
        }
    }

    /// The tagging schema for company mentions
    pub fn comp() -> Self {
        Self::iob(&["COMP"])
    }

    /// The CoNLL-2003 named-entity schema
    pub fn conll() -> Self {
        Self::iob(&["PER", "ORG", "LOC", "MISC"])
    }

    /// Look up the numeric id for a label
    pub fn id(&self, label: &str) -> Result<u32, LabelError> {
        self.label2id
            .get(label)
            .map(|id| *id as u32)
            .ok_or_else(|| LabelError::Unknown(label.to_string()))
    }

    /// Look up the label for a numeric id
    pub fn label(&self, id: usize) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// The label that trailing wordpieces of a word tagged `label` receive
    pub fn continuation(&self, label: &str) -> Result<&str, LabelError> {
        if !self.label2id.contains_key(label) {
            return Err(LabelError::Unknown(label.to_string()));
        }

        self.continuation
            .get(label)
            .map(String::as_str)
            .ok_or_else(|| LabelError::MissingContinuation(label.to_string()))
    }

    /// The ordered label list
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The special labels, present only on tagging schemas
    pub fn special(&self) -> Option<&SpecialLabels> {
        self.special.as_ref()
    }

    /// The special labels, or an error for class schemas
    pub fn require_special(&self) -> Result<&SpecialLabels, LabelError> {
        self.special.as_ref().ok_or(LabelError::NotTagging)
    }

    /// Whether this schema labels every token rather than whole examples
    pub fn is_tagging(&self) -> bool {
        self.special.is_some()
    }

    /// The id of the padding label, present only on tagging schemas
    pub fn pad_id(&self) -> Option<u32> {
        self.special
            .as_ref()
            .and_then(|special| self.id(&special.pad).ok())
    }

    /// The number of labels
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the schema has no labels
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn check_unique(labels: &[String]) -> Result<(), LabelError> {
    if labels.is_empty() {
        return Err(LabelError::Empty);
    }

    let mut seen = BTreeSet::new();
    for label in labels {
        if !seen.insert(label) {
            return Err(LabelError::Duplicate(label.clone()));
        }
    }

    Ok(())
}

/// Label Error
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
    /// The label is not part of the schema
    #[error("unknown label {0:?}")]
    Unknown(String),

    /// The label list contains the same label twice
    #[error("duplicate label {0:?}")]
    Duplicate(String),

    /// The label list is empty
    #[error("a label schema needs at least one label")]
    Empty,

    /// A continuation entry refers to a label outside of the schema
    #[error("continuation {from:?} -> {to:?} refers to a label outside of the schema")]
    InvalidContinuation {
        /// The label of the first wordpiece
        from: String,
        /// The label of the trailing wordpieces
        to: String,
    },

    /// A non-special label has no continuation entry
    #[error("label {0:?} has no continuation")]
    MissingContinuation(String),

    /// A special label is not part of the schema
    #[error("special label {0:?} is not part of the schema")]
    InvalidSpecial(String),

    /// The operation needs a tagging schema, but was given class labels
    #[error("the schema has no special labels, so it cannot label token sequences")]
    NotTagging,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_conll_label_order() {
        let schema = LabelSchema::conll();

        assert_eq!(
            schema.labels(),
            strings(&[
                "<pad>", "[CLS]", "[SEP]", "O", "B_PER", "B_ORG", "B_LOC", "B_MISC", "I_PER",
                "I_ORG", "I_LOC", "I_MISC"
            ])
            .as_slice()
        );
        assert_eq!(schema.pad_id(), Some(0));
    }

    #[test]
    fn test_comp_continuations() {
        let schema = LabelSchema::comp();

        assert_eq!(
            schema.labels(),
            strings(&["<pad>", "[CLS]", "[SEP]", "O", "B_COMP", "I_COMP"]).as_slice()
        );
        assert_eq!(schema.continuation("O").unwrap(), "O");
        assert_eq!(schema.continuation("B_COMP").unwrap(), "I_COMP");
        assert_eq!(schema.continuation("I_COMP").unwrap(), "I_COMP");
    }

    #[test]
    fn test_ids_round_trip_to_labels() {
        for schema in [
            LabelSchema::binary(),
            LabelSchema::comp(),
            LabelSchema::conll(),
        ] {
            for label in schema.labels() {
                let id = schema.id(label).unwrap();

                assert_eq!(schema.label(id as usize), Some(label.as_str()));
            }
        }
    }

    #[test]
    fn test_builtin_schemas_pass_validation() {
        let schema = LabelSchema::conll();

        let rebuilt = LabelSchema::tagging(
            schema.labels().to_vec(),
            schema.continuation.clone(),
            SpecialLabels::default(),
        )
        .unwrap();

        assert_eq!(rebuilt, schema);
    }

    #[test]
    fn test_unknown_label() {
        let schema = LabelSchema::binary();

        assert_eq!(schema.id("2"), Err(LabelError::Unknown("2".to_string())));
        assert!(!schema.is_tagging());
        assert_eq!(schema.pad_id(), None);
    }

    #[test]
    fn test_duplicate_labels_are_rejected() {
        let result = LabelSchema::classes(strings(&["yes", "no", "yes"]));

        assert_eq!(result, Err(LabelError::Duplicate("yes".to_string())));
    }

    #[test]
    fn test_continuation_outside_schema_is_rejected() {
        let mut continuation = BTreeMap::new();
        continuation.insert("O".to_string(), "O".to_string());
        continuation.insert("B_X".to_string(), "I_X".to_string());

        let result = LabelSchema::tagging(
            strings(&["<pad>", "[CLS]", "[SEP]", "O", "B_X"]),
            continuation,
            SpecialLabels::default(),
        );

        assert_eq!(
            result,
            Err(LabelError::InvalidContinuation {
                from: "B_X".to_string(),
                to: "I_X".to_string()
            })
        );
    }

    #[test]
    fn test_missing_continuation_is_rejected() {
        let mut continuation = BTreeMap::new();
        continuation.insert("B_X".to_string(), "B_X".to_string());

        let result = LabelSchema::tagging(
            strings(&["<pad>", "[CLS]", "[SEP]", "O", "B_X"]),
            continuation,
            SpecialLabels::default(),
        );

        assert_eq!(result, Err(LabelError::MissingContinuation("O".to_string())));
    }

    #[test]
    fn test_special_label_outside_schema_is_rejected() {
        let result = LabelSchema::tagging(
            strings(&["[CLS]", "[SEP]", "O"]),
            BTreeMap::new(),
            SpecialLabels::default(),
        );

        assert_eq!(result, Err(LabelError::InvalidSpecial("<pad>".to_string())));
    }
}
