use std::{
    fmt::Display,
    fs::File,
    path::{Path, PathBuf},
};

use csv::StringRecord;
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::pipelines::sequence_classification::labels::{LabelError, LabelSchema};

/// Binary sentence classification, one `label;text` row per example
pub mod sentences;

/// Sentence-pair classification in the tab-separated MRPC layout
pub mod mrpc;

/// Token tagging, one `labels,text` row per sentence
pub mod tagging;

/// The label attached to an example
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    /// A single class label for the whole example
    Class(String),

    /// One tag per whitespace-separated word of the primary text
    Tags(Vec<String>),

    /// One tag per wordpiece of the primary text, led by the start label
    PieceTags(Vec<String>),
}

/// A single labeled example, built from one row of a dataset file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Example {
    /// A unique id in the form `{split}-{row_index}`
    pub id: String,

    /// The primary text
    pub text_a: String,

    /// The secondary text, for sentence-pair tasks
    pub text_b: Option<String>,

    /// The example's label
    pub label: Label,
}

impl Example {
    /// The primary text split on whitespace, as the tagging labels see it
    pub fn words(&self) -> Vec<String> {
        self.text_a.split_whitespace().map(String::from).collect()
    }
}

/// The dataset splits a reader can resolve from a data directory
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Split {
    /// The training split
    Train,

    /// The validation split
    Valid,

    /// The held-out test split
    Test,
}

impl Split {
    /// The split name used as the prefix of example ids
    pub fn as_str(&self) -> &str {
        match self {
            Split::Train => "train",
            Split::Valid => "dev",
            Split::Test => "test",
        }
    }
}

impl Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A task-specific parser from a dataset file to examples
pub trait Reader {
    /// The label schema this reader's examples are labeled with
    fn labels(&self) -> &LabelSchema;

    /// The file name holding a split, relative to the data directory
    fn file_name(&self, split: Split) -> &str;

    /// Read every example in a file. A malformed row aborts the whole split.
    fn read_split(&self, path: &Path, split: &str) -> Result<Vec<Example>, DatasetError>;

    /// Resolve a split within a data directory and read it
    fn read(&self, data_dir: &Path, split: Split) -> Result<Vec<Example>, DatasetError> {
        let path: PathBuf = data_dir.join(self.file_name(split));

        self.read_split(&path, split.as_str())
    }
}

/// Read every row of a delimited file along with its row index, skipping the header at row 0
pub(crate) fn read_rows(
    path: &Path,
    builder: &csv::ReaderBuilder,
) -> Result<Vec<(usize, StringRecord)>, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = builder.from_reader(file);

    let mut rows = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| DatasetError::MalformedRow {
            path: path.to_path_buf(),
            row,
            reason: e.to_string(),
        })?;

        if row == 0 {
            continue;
        }

        rows.push((row, record));
    }

    Ok(rows)
}

/// Fetch a column from a row, or fail naming the file and row
pub(crate) fn column<'a>(
    path: &Path,
    row: usize,
    record: &'a StringRecord,
    index: usize,
) -> Result<&'a str, DatasetError> {
    record.get(index).ok_or_else(|| DatasetError::MalformedRow {
        path: path.to_path_buf(),
        row,
        reason: format!(
            "expected at least {} columns, found {}",
            index + 1,
            record.len()
        ),
    })
}

/// Check a label against a schema, or fail naming the file and row
pub(crate) fn check_label(
    schema: &LabelSchema,
    path: &Path,
    row: usize,
    label: &str,
) -> Result<(), DatasetError> {
    match schema.id(label) {
        Ok(_) => Ok(()),
        Err(LabelError::Unknown(label)) => Err(DatasetError::UnknownLabel {
            path: path.to_path_buf(),
            row,
            label,
        }),
        Err(source) => Err(DatasetError::MalformedRow {
            path: path.to_path_buf(),
            row,
            reason: source.to_string(),
        }),
    }
}

/// Dataset Error
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// The file is missing or unreadable
    #[error("unable to read {}: {source}", path.display())]
    FileAccess {
        /// The path that failed to open
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// A row is missing a column or its words and tags disagree
    #[error("malformed row {row} in {}: {reason}", path.display())]
    MalformedRow {
        /// The file holding the row
        path: PathBuf,
        /// The row index, counting the header as row 0
        row: usize,
        /// What is wrong with the row
        reason: String,
    },

    /// A row carries a label outside of the reader's schema
    #[error("unknown label {label:?} in row {row} of {}", path.display())]
    UnknownLabel {
        /// The file holding the row
        path: PathBuf,
        /// The row index, counting the header as row 0
        row: usize,
        /// The offending label
        label: String,
    },
}
