use std::path::Path;

use crate::pipelines::sequence_classification::labels::LabelSchema;

use super::{check_label, column, read_rows, DatasetError, Example, Label, Reader, Split};

/// The name of the binary sentence classification dataset
pub static DATASET: &str = "sentences";

/// Reads `label;text` rows for binary sentence classification
#[derive(Clone, Debug)]
pub struct SentenceReader {
    schema: LabelSchema,
}

impl SentenceReader {
    /// Create a reader over the binary `"0"`/`"1"` schema
    pub fn new() -> Self {
        Self {
            schema: LabelSchema::binary(),
        }
    }
}

impl Default for SentenceReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader for SentenceReader {
    fn labels(&self) -> &LabelSchema {
        &self.schema
    }

    fn file_name(&self, split: Split) -> &str {
        match split {
            Split::Train => "train.tsv",
            Split::Valid => "dev.tsv",
            Split::Test => "test.tsv",
        }
    }

    fn read_split(&self, path: &Path, split: &str) -> Result<Vec<Example>, DatasetError> {
        info!("Reading {} examples from {}", split, path.display());

        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(b';')
            .has_headers(false)
            .quoting(false)
            .flexible(true);

        let examples = read_rows(path, &builder)?
            .into_iter()
            .map(|(row, record)| {
                let label = column(path, row, &record, 0)?;
                let text = column(path, row, &record, 1)?;

                check_label(&self.schema, path, row, label)?;

                Ok(Example::new(
                    format!("{}-{}", split, row),
                    text.to_string(),
                    None,
                    Label::Class(label.to_string()),
                ))
            })
            .collect::<Result<Vec<_>, DatasetError>>()?;

        info!("Read {} {} examples", examples.len(), split);

        Ok(examples)
    }
}
