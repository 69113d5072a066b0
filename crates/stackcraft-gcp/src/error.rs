//! GCP provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GcpError {
    #[error(transparent)]
    Input(#[from] stackcraft_core::StackInputError),

    #[error(transparent)]
    Cloud(#[from] stackcraft_cloud::CloudError),
}

pub type Result<T> = std::result::Result<T, GcpError>;
