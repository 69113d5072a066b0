//! Cloudflare resource modules for Stackcraft
//!
//! - [`CloudflareR2Bucket`](r2_bucket): R2 bucket, managed and custom domains
//! - [`CloudflareDnsZone`](dns_zone): zone plus records
//! - [`CloudflareD1Database`](d1_database): D1 database
//!
//! # Credentials
//!
//! `providerConfig.apiToken`, or `apiKey` + `email`. Without a
//! `providerConfig` the engine reads `CLOUDFLARE_API_TOKEN`.
//!
//! # Example
//!
//! ```ignore
//! use stackcraft_cloud::{Context, RecordingEngine};
//! use stackcraft_cloudflare::R2BucketModule;
//! use stackcraft_core::{RawStackInput, run_module};
//!
//! let raw = RawStackInput::from_path(Path::new("stack-input.yaml"))?;
//! let mut ctx = Context::new(Arc::new(RecordingEngine::new()), "web", "dev");
//! run_module::<R2BucketModule>(&mut ctx, raw).await?;
//! ```

pub mod d1_database;
pub mod dns_zone;
pub mod error;
pub mod provider;
pub mod r2_bucket;

pub use d1_database::{CloudflareD1DatabaseSpec, D1DatabaseModule};
pub use dns_zone::{CloudflareDnsZoneSpec, DnsZoneModule};
pub use error::{CloudflareError, Result};
pub use provider::{CloudflareProvider, CloudflareProviderConfig};
pub use r2_bucket::{CloudflareR2BucketSpec, R2BucketModule};
