//! AWS resource modules for Stackcraft
//!
//! - [`AwsRoute53Zone`](route53_zone): hosted zone, DNSSEC, query logging, records
//! - [`AwsS3Bucket`](s3_bucket): bucket with encryption, lifecycle, logging and CORS
//!
//! Credentials come from `providerConfig` (`accessKeyId`, `secretAccessKey`,
//! `region`, `sessionToken`, `accountId`) or, when absent, from the standard
//! AWS credential chain.

pub mod error;
pub mod provider;
pub mod route53_zone;
pub mod s3_bucket;

pub use error::{AwsError, Result};
pub use provider::{AwsPackage, AwsProvider, AwsProviderConfig};
pub use route53_zone::{AwsRoute53ZoneSpec, Route53ZoneModule};
pub use s3_bucket::{AwsS3BucketSpec, S3BucketModule};
