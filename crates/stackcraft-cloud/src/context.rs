//! Per-run registration context handed to resource modules

use crate::engine::Engine;
use crate::error::Result;
use crate::output::OutputMap;
use crate::provider::CloudProvider;
use crate::resource::{ProviderRef, ResourceOptions, ResourceRef, ResourceRequest, urn};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// What a finished run produced
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    pub outputs: OutputMap,
    pub warnings: Vec<String>,
    pub resources: Vec<ResourceRef>,
}

/// Registration context for one module run against one stack
pub struct Context {
    engine: Arc<dyn Engine>,
    project: String,
    stack: String,
    outputs: OutputMap,
    warnings: Vec<String>,
    resources: Vec<ResourceRef>,
}

impl Context {
    pub fn new(engine: Arc<dyn Engine>, project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            engine,
            project: project.into(),
            stack: stack.into(),
            outputs: OutputMap::new(),
            warnings: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// Register one resource with the engine
    pub async fn register<A>(
        &mut self,
        type_token: &str,
        name: &str,
        args: &A,
        options: ResourceOptions,
    ) -> Result<ResourceRef>
    where
        A: Serialize + ?Sized,
    {
        let request = ResourceRequest {
            urn: urn(&self.stack, &self.project, type_token, name),
            type_token: type_token.to_string(),
            name: name.to_string(),
            args: serde_json::to_value(args)?,
            options,
        };

        tracing::debug!(type_token, name, "registering resource");
        let resource = self.engine.register_resource(request).await?;
        self.resources.push(resource.clone());
        Ok(resource)
    }

    /// Register a provider resource for `provider` under `name`
    pub async fn register_provider(
        &mut self,
        name: &str,
        provider: &dyn CloudProvider,
    ) -> Result<ProviderRef> {
        let type_token = format!("pulumi:providers:{}", provider.name());
        let resource = self
            .register(&type_token, name, &provider.provider_args(), ResourceOptions::new())
            .await?;

        tracing::info!("Using {} provider '{}'", provider.display_name(), name);
        Ok(ProviderRef {
            urn: resource.urn,
            id: resource.id,
            package: provider.name().to_string(),
        })
    }

    /// Publish a stack output; each key may be exported once
    pub fn export(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        tracing::debug!(key, "exporting output");
        self.outputs.insert(key, value)
    }

    /// Record a non-fatal problem with the input
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn outputs(&self) -> &OutputMap {
        &self.outputs
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn resources(&self) -> &[ResourceRef] {
        &self.resources
    }

    pub fn finish(self) -> RunResult {
        RunResult {
            outputs: self.outputs,
            warnings: self.warnings,
            resources: self.resources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudError;
    use crate::provider::AuthStatus;
    use crate::recording::RecordingEngine;
    use async_trait::async_trait;
    use serde_json::json;

    struct FakeProvider;

    #[async_trait]
    impl CloudProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        fn display_name(&self) -> &str {
            "Fake"
        }

        fn provider_args(&self) -> Value {
            json!({ "region": "local" })
        }

        async fn check_auth(&self) -> Result<AuthStatus> {
            Ok(AuthStatus::ok("tester"))
        }
    }

    #[tokio::test]
    async fn test_register_and_export() {
        let engine = Arc::new(RecordingEngine::new());
        let mut ctx = Context::new(engine.clone(), "web", "dev");

        let provider = ctx.register_provider("fake", &FakeProvider).await.unwrap();
        assert_eq!(provider.package, "fake");
        assert_eq!(provider.urn, "urn:stackcraft:dev::web::pulumi:providers:fake::fake");

        let bucket = ctx
            .register(
                "fake:index/bucket:Bucket",
                "bucket",
                &json!({ "name": "assets" }),
                ResourceOptions::new().provider(&provider),
            )
            .await
            .unwrap();
        ctx.export("bucket_name", bucket.id.clone()).unwrap();

        let result = ctx.finish();
        assert_eq!(result.resources.len(), 2);
        assert_eq!(result.outputs.get_str("bucket_name"), Some("assets"));
        assert_eq!(engine.registrations()[1].options.provider, Some(provider));
    }

    #[tokio::test]
    async fn test_duplicate_export_fails() {
        let mut ctx = Context::new(Arc::new(RecordingEngine::new()), "web", "dev");
        ctx.export("zone_id", "a").unwrap();

        let err = ctx.export("zone_id", "b").unwrap_err();
        assert!(matches!(err, CloudError::DuplicateOutput(_)));
    }

    #[test]
    fn test_warnings_collected() {
        let mut ctx = Context::new(Arc::new(RecordingEngine::new()), "web", "dev");
        ctx.warn("versioning is not supported");

        assert_eq!(ctx.finish().warnings, vec!["versioning is not supported"]);
    }
}
