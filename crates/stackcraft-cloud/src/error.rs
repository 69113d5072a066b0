//! Engine error types

use thiserror::Error;

/// Errors raised while registering resources with an engine
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("failed to create {provider} provider: {message}")]
    ProviderInitialization { provider: String, message: String },

    #[error("failed to register {type_token} '{name}': {message}")]
    ResourceRegistration {
        type_token: String,
        name: String,
        message: String,
    },

    #[error("Resource already registered: {0}")]
    DuplicateResource(String),

    #[error("Output already exported: {0}")]
    DuplicateOutput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("{message}: {source}")]
    Context {
        message: String,
        source: Box<CloudError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderInitialization {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Walks through `Context` wrappers to the error that started it all
    pub fn root_cause(&self) -> &CloudError {
        match self {
            CloudError::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

/// Wraps a failure with a resource-specific message
pub trait ResultExt<T> {
    fn context(self, message: impl Into<String>) -> Result<T>;

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CloudError>,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| CloudError::Context {
            message: message.into(),
            source: Box::new(e.into()),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| CloudError::Context {
            message: f(),
            source: Box::new(e.into()),
        })
    }
}
