use std::path::Path;

use crate::pipelines::sequence_classification::labels::LabelSchema;

use super::{check_label, column, read_rows, DatasetError, Example, Label, Reader, Split};

/// The name of the sentence-pair dataset
pub static DATASET: &str = "mrpc";

/// Reads tab-separated sentence pairs, with the label in column 0 and the texts in columns 3 and 4
#[derive(Clone, Debug)]
pub struct PairReader {
    schema: LabelSchema,
}

impl PairReader {
    /// Create a reader over the binary `"0"`/`"1"` schema
    pub fn new() -> Self {
        Self {
            schema: LabelSchema::binary(),
        }
    }
}

impl Default for PairReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader for PairReader {
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
        info!("Reading {} sentence pairs from {}", split, path.display());

        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(b'\t')
            .has_headers(false)
            .quoting(false)
            .flexible(true);

        let examples = read_rows(path, &builder)?
            .into_iter()
            .map(|(row, record)| {
                let label = column(path, row, &record, 0)?;
                let text_a = column(path, row, &record, 3)?;
                let text_b = column(path, row, &record, 4)?;

                check_label(&self.schema, path, row, label)?;

                Ok(Example::new(
                    format!("{}-{}", split, row),
                    text_a.to_string(),
                    Some(text_b.to_string()),
                    Label::Class(label.to_string()),
                ))
            })
            .collect::<Result<Vec<_>, DatasetError>>()?;

        info!("Read {} {} sentence pairs", examples.len(), split);

        Ok(examples)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::datasets::tests::write_fixture;

    #[test]
    fn test_read_split() {
        let (_dir, path) = write_fixture(
            "train.tsv",
            "Quality\t#1 ID\t#2 ID\t#1 String\t#2 String\n\
             1\t702876\t702977\tAmrozi accused his brother.\tReferring to him, Amrozi accused his brother.\n\
             0\t2108705\t2108831\tYucaipa owned Dominick's.\tYucaipa bought Dominick's in 1995.\n",
        );

        let examples = PairReader::new().read_split(&path, "train").unwrap();

        assert_eq!(examples.len(), 2);
        assert_eq!(
            examples[1],
            Example::new(
                "train-2".to_string(),
                "Yucaipa owned Dominick's.".to_string(),
                Some("Yucaipa bought Dominick's in 1995.".to_string()),
                Label::Class("0".to_string()),
            )
        );
    }

    #[test]
    fn test_short_row_is_malformed() {
        let (_dir, path) = write_fixture("dev.tsv", "Quality\t#1 ID\t#2 ID\t#1 String\t#2 String\n1\t1\t2\tonly one\n");

        let result = PairReader::new().read_split(&path, "dev");

        match result {
            Err(DatasetError::MalformedRow { row, .. }) => assert_eq!(row, 1),
            other => panic!("expected a malformed row, got {:?}", other),
        }
    }
}
