use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error(
        "Stack input not found. Looked for:\n\
        - current directory: stack-input.yaml, stack-input.yml, stack-input.json\n\
        - ./.stackcraft/ directory\n\
        Pass --input or set STACKCRAFT_STACK_INPUT to point at a file"
    )]
    StackInputNotFound,

    #[error("Invalid settings file {path}: {message}")]
    InvalidSettings { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
