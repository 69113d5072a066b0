//! Kubernetes resource modules for Stackcraft
//!
//! - [`KubernetesNamespace`](namespace): namespace with quotas, limits,
//!   network policies and mesh injection
//! - [`KubernetesExternalDns`](external_dns): external-dns Helm release for
//!   Cloud DNS, Route 53, Azure DNS or Cloudflare

pub mod error;
pub mod external_dns;
pub mod namespace;
pub mod provider;

pub use error::{KubernetesError, Result};
pub use external_dns::{ExternalDnsModule, KubernetesExternalDnsSpec};
pub use namespace::{KubernetesNamespaceSpec, NamespaceModule};
pub use provider::{KubernetesProvider, KubernetesProviderConfig};
