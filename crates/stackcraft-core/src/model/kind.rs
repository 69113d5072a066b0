use crate::error::StackInputError;
use std::fmt;
use std::str::FromStr;

/// Provider package a resource kind is provisioned through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Cloudflare,
    Aws,
    Gcp,
    Azure,
    Kubernetes,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Cloudflare => "cloudflare",
            ProviderKind::Aws => "aws",
            ProviderKind::Gcp => "gcp",
            ProviderKind::Azure => "azure",
            ProviderKind::Kubernetes => "kubernetes",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Cloudflare => "Cloudflare",
            ProviderKind::Aws => "AWS",
            ProviderKind::Gcp => "Google Cloud",
            ProviderKind::Azure => "Azure",
            ProviderKind::Kubernetes => "Kubernetes",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every resource kind with a provisioning module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudResourceKind {
    CloudflareR2Bucket,
    CloudflareDnsZone,
    CloudflareD1Database,
    AwsRoute53Zone,
    AwsS3Bucket,
    GcpGcsBucket,
    AzureDnsZone,
    KubernetesNamespace,
    KubernetesExternalDns,
}

impl CloudResourceKind {
    pub const ALL: [CloudResourceKind; 9] = [
        CloudResourceKind::CloudflareR2Bucket,
        CloudResourceKind::CloudflareDnsZone,
        CloudResourceKind::CloudflareD1Database,
        CloudResourceKind::AwsRoute53Zone,
        CloudResourceKind::AwsS3Bucket,
        CloudResourceKind::GcpGcsBucket,
        CloudResourceKind::AzureDnsZone,
        CloudResourceKind::KubernetesNamespace,
        CloudResourceKind::KubernetesExternalDns,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CloudResourceKind::CloudflareR2Bucket => "CloudflareR2Bucket",
            CloudResourceKind::CloudflareDnsZone => "CloudflareDnsZone",
            CloudResourceKind::CloudflareD1Database => "CloudflareD1Database",
            CloudResourceKind::AwsRoute53Zone => "AwsRoute53Zone",
            CloudResourceKind::AwsS3Bucket => "AwsS3Bucket",
            CloudResourceKind::GcpGcsBucket => "GcpGcsBucket",
            CloudResourceKind::AzureDnsZone => "AzureDnsZone",
            CloudResourceKind::KubernetesNamespace => "KubernetesNamespace",
            CloudResourceKind::KubernetesExternalDns => "KubernetesExternalDns",
        }
    }

    pub fn provider(&self) -> ProviderKind {
        match self {
            CloudResourceKind::CloudflareR2Bucket
            | CloudResourceKind::CloudflareDnsZone
            | CloudResourceKind::CloudflareD1Database => ProviderKind::Cloudflare,
            CloudResourceKind::AwsRoute53Zone | CloudResourceKind::AwsS3Bucket => ProviderKind::Aws,
            CloudResourceKind::GcpGcsBucket => ProviderKind::Gcp,
            CloudResourceKind::AzureDnsZone => ProviderKind::Azure,
            CloudResourceKind::KubernetesNamespace | CloudResourceKind::KubernetesExternalDns => {
                ProviderKind::Kubernetes
            }
        }
    }

    /// `apiVersion` written by tooling that generates stack inputs
    pub fn api_version(&self) -> String {
        format!("{}.stackcraft.dev/v1", self.provider())
    }
}

impl fmt::Display for CloudResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudResourceKind {
    type Err = StackInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CloudResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| StackInputError::UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_name() {
        for kind in CloudResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<CloudResourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind() {
        let err = "AwsLambda".parse::<CloudResourceKind>().unwrap_err();
        assert!(matches!(err, StackInputError::UnknownKind(k) if k == "AwsLambda"));
    }

    #[test]
    fn test_provider_and_api_version() {
        assert_eq!(CloudResourceKind::AzureDnsZone.provider(), ProviderKind::Azure);
        assert_eq!(
            CloudResourceKind::CloudflareR2Bucket.api_version(),
            "cloudflare.stackcraft.dev/v1"
        );
    }
}
