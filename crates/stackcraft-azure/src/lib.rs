//! Azure resource modules for Stackcraft
//!
//! - [`AzureDnsZone`](dns_zone): DNS zone, records and an optional resource group

pub mod dns_zone;
pub mod error;
pub mod provider;

pub use dns_zone::{AzureDnsZoneSpec, DnsZoneModule};
pub use error::{AzureError, Result};
pub use provider::{AzureProvider, AzureProviderConfig};
