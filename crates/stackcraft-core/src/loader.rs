//! Stack input loader
//!
//! Reads a YAML or JSON stack input, identifies the target kind, and turns
//! it into a typed [`StackInput`] once the caller knows which spec to expect.

use crate::error::{Result, StackInputError};
use crate::model::{CloudResourceKind, CloudResourceMetadata, StackInput};
use crate::validate::Validate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, instrument};

/// Serialization of a stack input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Yaml,
    Json,
}

impl InputFormat {
    /// `.json` files are JSON, everything else is read as YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => InputFormat::Json,
            _ => InputFormat::Yaml,
        }
    }
}

/// A parsed stack input whose spec has not been typed yet
#[derive(Debug, Clone)]
pub struct RawStackInput {
    kind: CloudResourceKind,
    document: Value,
}

impl RawStackInput {
    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| StackInputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, InputFormat::from_path(path))
    }

    pub fn parse(content: &str, format: InputFormat) -> Result<Self> {
        let document: Value = match format {
            InputFormat::Yaml => serde_yaml::from_str(content)?,
            InputFormat::Json => serde_json::from_str(content)?,
        };

        let kind = document
            .pointer("/target/kind")
            .and_then(Value::as_str)
            .ok_or_else(|| StackInputError::Deserialization("target.kind is required".into()))?
            .parse::<CloudResourceKind>()?;

        debug!(%kind, "Parsed stack input");
        Ok(Self { kind, document })
    }

    pub fn kind(&self) -> CloudResourceKind {
        self.kind
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn metadata(&self) -> Result<CloudResourceMetadata> {
        let metadata = self
            .document
            .pointer("/target/metadata")
            .cloned()
            .ok_or_else(|| StackInputError::Deserialization("target.metadata is required".into()))?;
        Ok(serde_json::from_value(metadata)?)
    }

    /// The provider configuration block, if the input carries one
    pub fn provider_config(&self) -> Option<&Value> {
        self.document
            .get("providerConfig")
            .or_else(|| self.document.get("provider_config"))
            .filter(|v| !v.is_null())
    }

    /// Deserialize into the typed input for `expected` and run schema validation
    pub fn into_typed<S, P>(self, expected: CloudResourceKind) -> Result<StackInput<S, P>>
    where
        S: DeserializeOwned + Validate,
        P: DeserializeOwned,
    {
        if self.kind != expected {
            return Err(StackInputError::KindMismatch {
                expected: expected.to_string(),
                actual: self.kind.to_string(),
            });
        }

        let input: StackInput<S, P> = serde_json::from_value(self.document)?;
        input.target.metadata.validate()?;
        input.target.spec.validate()?;
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct BucketSpec {
        bucket_name: String,
    }

    impl Validate for BucketSpec {
        fn validate(&self) -> Result<()> {
            crate::validate::require("spec.bucketName", &self.bucket_name)
        }
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct TokenConfig {
        api_token: String,
    }

    const YAML: &str = r#"
target:
  apiVersion: cloudflare.stackcraft.dev/v1
  kind: CloudflareR2Bucket
  metadata:
    name: assets
    org: acme
  spec:
    bucketName: test-bucket
providerConfig:
  apiToken: abc
"#;

    #[test]
    fn test_parse_yaml() {
        let raw = RawStackInput::parse(YAML, InputFormat::Yaml).unwrap();
        assert_eq!(raw.kind(), CloudResourceKind::CloudflareR2Bucket);
        assert_eq!(raw.metadata().unwrap().org, "acme");

        let input: StackInput<BucketSpec, TokenConfig> =
            raw.into_typed(CloudResourceKind::CloudflareR2Bucket).unwrap();
        assert_eq!(input.spec().bucket_name, "test-bucket");
        assert_eq!(input.provider_config.unwrap().api_token, "abc");
    }

    #[test]
    fn test_parse_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"target":{{"kind":"CloudflareR2Bucket","metadata":{{"name":"a"}},"spec":{{"bucketName":"b"}}}}}}"#
        )
        .unwrap();

        let raw = RawStackInput::from_path(&path).unwrap();
        assert!(raw.provider_config().is_none());
        let input: StackInput<BucketSpec, TokenConfig> =
            raw.into_typed(CloudResourceKind::CloudflareR2Bucket).unwrap();
        assert!(input.provider_config.is_none());
    }

    #[test]
    fn test_snake_case_provider_config() {
        let yaml = YAML.replace("providerConfig:", "provider_config:");
        let raw = RawStackInput::parse(&yaml, InputFormat::Yaml).unwrap();
        assert!(raw.provider_config().is_some());
        let input: StackInput<BucketSpec, TokenConfig> =
            raw.into_typed(CloudResourceKind::CloudflareR2Bucket).unwrap();
        assert_eq!(input.provider_config.unwrap().api_token, "abc");
    }

    #[test]
    fn test_missing_required_field() {
        let yaml = YAML.replace("    bucketName: test-bucket\n", "    other: 1\n");
        let raw = RawStackInput::parse(&yaml, InputFormat::Yaml).unwrap();
        let err = raw
            .into_typed::<BucketSpec, TokenConfig>(CloudResourceKind::CloudflareR2Bucket)
            .unwrap_err();
        assert!(matches!(err, StackInputError::Deserialization(_)));
    }

    #[test]
    fn test_validation_failure() {
        let yaml = YAML.replace("bucketName: test-bucket", "bucketName: \"\"");
        let raw = RawStackInput::parse(&yaml, InputFormat::Yaml).unwrap();
        let err = raw
            .into_typed::<BucketSpec, TokenConfig>(CloudResourceKind::CloudflareR2Bucket)
            .unwrap_err();
        assert!(matches!(err, StackInputError::Validation { .. }));
    }

    #[test]
    fn test_kind_mismatch_and_unknown() {
        let raw = RawStackInput::parse(YAML, InputFormat::Yaml).unwrap();
        assert!(matches!(
            raw.into_typed::<BucketSpec, TokenConfig>(CloudResourceKind::AwsS3Bucket),
            Err(StackInputError::KindMismatch { .. })
        ));

        let unknown = YAML.replace("CloudflareR2Bucket", "CloudflareWorker");
        assert!(matches!(
            RawStackInput::parse(&unknown, InputFormat::Yaml),
            Err(StackInputError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_malformed_payload() {
        assert!(matches!(
            RawStackInput::parse("target: [unclosed", InputFormat::Yaml),
            Err(StackInputError::Deserialization(_))
        ));
        assert!(matches!(
            RawStackInput::parse("{}", InputFormat::Json),
            Err(StackInputError::Deserialization(_))
        ));
    }
}
