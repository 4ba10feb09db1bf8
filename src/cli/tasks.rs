use std::fmt::Display;

use crate::{
    datasets::{mrpc, sentences, tagging, Reader},
    pipelines::sequence_classification::LabelSchema,
};

use super::models::Model;

/// The task enum, selecting a reader, a label schema and a classifier head
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Task {
    /// Binary sentence classification
    Sentences,

    /// Sentence-pair classification
    Mrpc,

    /// Company-mention tagging
    Comp,

    /// CoNLL-2003 named-entity tagging
    Conll,
}

impl Task {
    /// The label schema for the task
    pub fn schema(&self) -> LabelSchema {
        match self {
            Task::Sentences | Task::Mrpc => LabelSchema::binary(),
            Task::Comp => LabelSchema::comp(),
            Task::Conll => LabelSchema::conll(),
        }
    }

    /// The reader for the task's files. `delimiter` applies to tagging files only.
    pub fn reader(&self, lowercase: bool, delimiter: u8) -> Box<dyn Reader> {
        match self {
            Task::Sentences => Box::new(sentences::SentenceReader::new()),
            Task::Mrpc => Box::new(mrpc::PairReader::new()),
            Task::Comp | Task::Conll => Box::new(
                tagging::TaggingReader::new(self.schema(), lowercase).with_delimiter(delimiter),
            ),
        }
    }

    /// Whether the task labels every token
    pub fn is_tagging(&self) -> bool {
        matches!(self, Task::Comp | Task::Conll)
    }

    /// Get the default model for the task
    pub fn default_model(&self) -> Model {
        if self.is_tagging() {
            Model::Bert("bert-base-cased".to_string())
        } else {
            Model::Bert("bert-base-uncased".to_string())
        }
    }
}

impl TryFrom<&str> for Task {
    type Error = TaskError;

    /// Try to convert a string to a Task
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.to_lowercase();

        if value == sentences::DATASET {
            Ok(Task::Sentences)
        } else if value == mrpc::DATASET {
            Ok(Task::Mrpc)
        } else if value == tagging::COMP_DATASET {
            Ok(Task::Comp)
        } else if value == tagging::CONLL_DATASET {
            Ok(Task::Conll)
        } else {
            Err(Self::Error::Unknown(value))
        }
    }
}

impl Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Task::Sentences => sentences::DATASET,
            Task::Mrpc => mrpc::DATASET,
            Task::Comp => tagging::COMP_DATASET,
            Task::Conll => tagging::CONLL_DATASET,
        };

        write!(f, "{}", name)
    }
}

/// Task Error
#[derive(thiserror::Error, Debug)]
pub enum TaskError {
    /// No task found for the given string
    #[error("no task found for {0}")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_task_names_round_trip() {
        for task in [Task::Sentences, Task::Mrpc, Task::Comp, Task::Conll] {
            assert_eq!(Task::try_from(task.to_string().as_str()).unwrap(), task);
        }

        assert_eq!(Task::try_from("CoNLL").unwrap(), Task::Conll);
        assert!(Task::try_from("snips").is_err());
    }

    #[test]
    fn test_reader_matches_schema() {
        let reader = Task::Comp.reader(true, b'\t');

        assert_eq!(reader.labels(), &LabelSchema::comp());
        assert!(reader.labels().is_tagging());
        assert!(!Task::Mrpc.schema().is_tagging());
    }
}
