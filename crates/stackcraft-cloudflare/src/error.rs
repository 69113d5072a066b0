//! Cloudflare provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudflareError {
    #[error("Cloudflare API error: {0}")]
    ApiError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error(transparent)]
    Input(#[from] stackcraft_core::StackInputError),

    #[error(transparent)]
    Cloud(#[from] stackcraft_cloud::CloudError),
}

pub type Result<T> = std::result::Result<T, CloudflareError>;
