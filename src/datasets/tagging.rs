use std::path::Path;

use crate::pipelines::sequence_classification::labels::LabelSchema;

use super::{check_label, column, read_rows, DatasetError, Example, Label, Reader, Split};

/// The name of the company-mention tagging dataset
pub static COMP_DATASET: &str = "comp";

/// The name of the CoNLL-2003 tagging dataset
pub static CONLL_DATASET: &str = "conll";

/// Reads `labels,text` rows, where both cells hold parallel whitespace-separated sequences
#[derive(Clone, Debug)]
pub struct TaggingReader {
    schema: LabelSchema,

    /// Lower-case the text before splitting it into words
    lowercase: bool,

    /// The column delimiter
    delimiter: u8,
}

impl TaggingReader {
    /// Create a comma-separated reader over the given tagging schema
    pub fn new(schema: LabelSchema, lowercase: bool) -> Self {
        Self {
            schema,
            lowercase,
            delimiter: b',',
        }
    }

    /// Use a different column delimiter, such as a tab
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

impl Reader for TaggingReader {
    fn labels(&self) -> &LabelSchema {
        &self.schema
    }

    fn file_name(&self, split: Split) -> &str {
        match split {
            Split::Train => "train.csv",
            Split::Valid => "valid.csv",
            Split::Test => "test.csv",
        }
    }

    fn read_split(&self, path: &Path, split: &str) -> Result<Vec<Example>, DatasetError> {
        info!("Reading {} tagged sentences from {}", split, path.display());

        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true);

        let examples = read_rows(path, &builder)?
            .into_iter()
            .map(|(row, record)| {
                let labels = column(path, row, &record, 0)?;
                let text = column(path, row, &record, 1)?;

                let text = if self.lowercase {
                    text.to_lowercase()
                } else {
                    text.to_string()
                };

                let tags: Vec<String> = labels.split_whitespace().map(String::from).collect();
                let word_count = text.split_whitespace().count();

                if word_count != tags.len() {
                    return Err(DatasetError::MalformedRow {
                        path: path.to_path_buf(),
                        row,
                        reason: format!("{} words but {} tags", word_count, tags.len()),
                    });
                }

                for tag in &tags {
                    check_label(&self.schema, path, row, tag)?;
                }

                Ok(Example::new(
                    format!("{}-{}", split, row),
                    text,
                    None,
                    Label::Tags(tags),
                ))
            })
            .collect::<Result<Vec<_>, DatasetError>>()?;

        info!("Read {} {} tagged sentences", examples.len(), split);

        Ok(examples)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::datasets::tests::write_fixture;

    fn tags(values: &[&str]) -> Label {
        Label::Tags(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_read_split_lowercases_text() {
        let (_dir, path) = write_fixture(
            "train.csv",
            "labels,text\nB_ORG I_ORG O,Acme Corp rises\nO B_PER,\"Thanks, Ann\"\n",
        );

        let reader = TaggingReader::new(LabelSchema::conll(), true);
        let examples = reader.read_split(&path, "train").unwrap();

        assert_eq!(
            examples,
            vec![
                Example::new(
                    "train-1".to_string(),
                    "acme corp rises".to_string(),
                    None,
                    tags(&["B_ORG", "I_ORG", "O"]),
                ),
                Example::new(
                    "train-2".to_string(),
                    "thanks, ann".to_string(),
                    None,
                    tags(&["O", "B_PER"]),
                ),
            ]
        );
    }

    #[test]
    fn test_tab_delimiter_keeps_case() {
        let (_dir, path) = write_fixture("valid.csv", "labels\ttext\nB_COMP O\tAcme rises\n");

        let reader = TaggingReader::new(LabelSchema::comp(), false).with_delimiter(b'\t');
        let examples = reader.read(path.parent().unwrap(), Split::Valid).unwrap();

        assert_eq!(examples[0].id, "dev-1");
        assert_eq!(examples[0].text_a, "Acme rises");
    }

    #[test]
    fn test_ragged_tags_are_malformed() {
        let (_dir, path) = write_fixture("train.csv", "labels,text\nO O,one two\nO,three four\n");

        let reader = TaggingReader::new(LabelSchema::conll(), true);

        match reader.read_split(&path, "train") {
            Err(DatasetError::MalformedRow { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected a malformed row, got {:?}", other),
        }
    }

    #[test]
    fn test_tag_outside_schema() {
        let (_dir, path) = write_fixture("train.csv", "labels,text\nB_PER,ann\n");

        let reader = TaggingReader::new(LabelSchema::comp(), true);

        match reader.read_split(&path, "train") {
            Err(DatasetError::UnknownLabel { label, .. }) => assert_eq!(label, "B_PER"),
            other => panic!("expected an unknown label, got {:?}", other),
        }
    }
}
