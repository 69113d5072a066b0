//! Google Cloud resource modules for Stackcraft
//!
//! - [`GcpGcsBucket`](gcs_bucket): Cloud Storage bucket and IAM bindings

pub mod error;
pub mod gcs_bucket;
pub mod provider;

pub use error::{GcpError, Result};
pub use gcs_bucket::{GcpGcsBucketSpec, GcsBucketModule};
pub use provider::{GcpProvider, GcpProviderConfig};
