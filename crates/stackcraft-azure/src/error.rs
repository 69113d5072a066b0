//! Azure provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("Azure AD token request failed: {0}")]
    TokenError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error(transparent)]
    Input(#[from] stackcraft_core::StackInputError),

    #[error(transparent)]
    Cloud(#[from] stackcraft_cloud::CloudError),
}

pub type Result<T> = std::result::Result<T, AzureError>;
