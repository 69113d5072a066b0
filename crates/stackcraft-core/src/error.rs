use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackInputError {
    #[error("failed to read stack input {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to deserialize stack input: {0}")]
    Deserialization(String),

    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("unsupported resource kind: {0}")]
    UnknownKind(String),

    #[error("stack input is for {actual}, expected {expected}")]
    KindMismatch { expected: String, actual: String },
}

impl StackInputError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for StackInputError {
    fn from(e: serde_json::Error) -> Self {
        Self::Deserialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for StackInputError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Deserialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StackInputError>;
