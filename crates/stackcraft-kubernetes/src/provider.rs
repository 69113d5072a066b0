//! Kubernetes provider factory
//!
//! The cluster credential is a kubeconfig document. Without one the
//! provider uses `KUBECONFIG` or `~/.kube/config`, like `kubectl`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use stackcraft_cloud::{AuthStatus, CloudError, CloudProvider, REDACTED};
use std::path::PathBuf;

/// `providerConfig` for Kubernetes kinds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KubernetesProviderConfig {
    /// Kubeconfig YAML
    pub kubeconfig: String,

    /// Context to use instead of the kubeconfig's `current-context`
    pub context: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Kubeconfig {
    #[serde(default)]
    current_context: Option<String>,
    clusters: Vec<NamedCluster>,
    contexts: Vec<NamedContext>,
}

#[derive(Debug, Clone, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: Cluster,
}

#[derive(Debug, Clone, Deserialize)]
struct Cluster {
    server: String,
}

#[derive(Debug, Clone, Deserialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Debug, Clone, Deserialize)]
struct ContextEntry {
    cluster: String,
}

impl Kubeconfig {
    fn parse(content: &str) -> stackcraft_cloud::Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| CloudError::provider("kubernetes", format!("invalid kubeconfig: {}", e)))
    }

    /// `(context, server)` the provider will talk to
    fn target(&self, context: Option<&str>) -> Option<(String, String)> {
        let name = context.or(self.current_context.as_deref())?;
        let entry = self.contexts.iter().find(|c| c.name == name)?;
        let cluster = self
            .clusters
            .iter()
            .find(|c| c.name == entry.context.cluster)?;
        Some((name.to_string(), cluster.cluster.server.clone()))
    }
}

#[derive(Debug, Clone)]
struct Credentials {
    yaml: String,
    kubeconfig: Kubeconfig,
}

/// Kubernetes provider
#[derive(Debug, Clone)]
pub struct KubernetesProvider {
    credentials: Option<Credentials>,
    context: Option<String>,
}

fn default_kubeconfig_path() -> Option<PathBuf> {
    std::env::var_os("KUBECONFIG")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".kube").join("config")))
}

impl KubernetesProvider {
    pub fn from_config(config: Option<&KubernetesProviderConfig>) -> stackcraft_cloud::Result<Self> {
        let Some(config) = config else {
            return Ok(Self {
                credentials: None,
                context: None,
            });
        };

        let kubeconfig = Kubeconfig::parse(&config.kubeconfig)?;
        let context = config.context.clone().filter(|c| !c.is_empty());
        if let Some(name) = &context {
            if !kubeconfig.contexts.iter().any(|c| &c.name == name) {
                return Err(CloudError::provider(
                    "kubernetes",
                    format!("context '{}' is not in the kubeconfig", name),
                ));
            }
        }

        Ok(Self {
            credentials: Some(Credentials {
                yaml: config.kubeconfig.clone(),
                kubeconfig,
            }),
            context,
        })
    }

    /// Provider built from the kubeconfig at `KUBECONFIG`
    pub fn from_env() -> stackcraft_cloud::Result<Self> {
        let Some(path) = std::env::var_os("KUBECONFIG").filter(|v| !v.is_empty()) else {
            return Self::from_config(None);
        };
        let kubeconfig = std::fs::read_to_string(&path).map_err(|e| {
            CloudError::provider(
                "kubernetes",
                format!("cannot read {}: {}", PathBuf::from(&path).display(), e),
            )
        })?;
        Self::from_config(Some(&KubernetesProviderConfig {
            kubeconfig,
            context: None,
        }))
    }

    /// Kubeconfig YAML handed to the provider, never logged
    pub fn kubeconfig(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.yaml.as_str())
    }
}

#[async_trait]
impl CloudProvider for KubernetesProvider {
    fn name(&self) -> &str {
        "kubernetes"
    }

    fn display_name(&self) -> &str {
        "Kubernetes"
    }

    fn provider_args(&self) -> Value {
        let mut args = Map::new();
        if self.credentials.is_some() {
            args.insert("kubeconfig".into(), json!(REDACTED));
        }
        if let Some(context) = &self.context {
            args.insert("context".into(), json!(context));
        }
        Value::Object(args)
    }

    async fn check_auth(&self) -> stackcraft_cloud::Result<AuthStatus> {
        let kubeconfig = match &self.credentials {
            Some(credentials) => credentials.kubeconfig.clone(),
            None => {
                let Some(path) = default_kubeconfig_path() else {
                    return Ok(AuthStatus::failed("no kubeconfig found"));
                };
                match std::fs::read_to_string(&path) {
                    Ok(content) => match Kubeconfig::parse(&content) {
                        Ok(kubeconfig) => kubeconfig,
                        Err(e) => return Ok(AuthStatus::failed(e.to_string())),
                    },
                    Err(e) => {
                        return Ok(AuthStatus::failed(format!(
                            "cannot read {}: {}",
                            path.display(),
                            e
                        )));
                    }
                }
            }
        };

        tracing::debug!(context = ?self.context, "resolving kubeconfig target");
        Ok(match kubeconfig.target(self.context.as_deref()) {
            Some((context, server)) => AuthStatus::ok(format!("context {} on {}", context, server)),
            None => AuthStatus::failed("kubeconfig has no usable current context"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: prod
clusters:
  - name: prod-cluster
    cluster:
      server: https://10.0.0.1:6443
contexts:
  - name: prod
    context:
      cluster: prod-cluster
      user: admin
users:
  - name: admin
    user:
      token: abc
"#;

    fn config() -> KubernetesProviderConfig {
        KubernetesProviderConfig {
            kubeconfig: KUBECONFIG.to_string(),
            context: None,
        }
    }

    #[tokio::test]
    async fn test_kubeconfig_target() {
        let provider = KubernetesProvider::from_config(Some(&config())).unwrap();
        assert_eq!(provider.provider_args(), json!({ "kubeconfig": "[secret]" }));
        assert!(provider.kubeconfig().unwrap().contains("prod-cluster"));

        let status = provider.check_auth().await.unwrap();
        assert_eq!(
            status.identity(),
            Some("context prod on https://10.0.0.1:6443")
        );
    }

    #[test]
    fn test_rejects_malformed_kubeconfig() {
        let config = KubernetesProviderConfig {
            kubeconfig: "clusters: 3".into(),
            context: None,
        };
        let err = KubernetesProvider::from_config(Some(&config)).unwrap_err();
        assert!(matches!(err, CloudError::ProviderInitialization { .. }));
    }

    #[test]
    fn test_unknown_context() {
        let config = KubernetesProviderConfig {
            context: Some("staging".into()),
            ..config()
        };
        let err = KubernetesProvider::from_config(Some(&config)).unwrap_err();
        assert!(err.to_string().contains("context 'staging'"));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_kubeconfig_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KUBECONFIG.as_bytes()).unwrap();

        temp_env::with_var("KUBECONFIG", Some(file.path()), || {
            let provider = KubernetesProvider::from_env().unwrap();
            assert!(provider.kubeconfig().is_some());
        });
    }
}
