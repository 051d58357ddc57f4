use super::types::{LifecycleState, ProcessSnapshot, UnitSnapshot};
use super::StatusProvider;
use crate::config::ClusterConfig;
use crate::error::StatusError;
use crate::identity::VarSource;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::{Certificate, StatusCode, Url};
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Status provider backed by the in-cluster Kubernetes API server
pub struct KubernetesStatusProvider {
    client: reqwest::Client,
    base_url: Url,
    token_path: PathBuf,
}

impl KubernetesStatusProvider {
    /// Create a provider from cluster configuration, deriving the API server
    /// address from the service environment when it is not configured
    pub fn new(config: &ClusterConfig, env: &dyn VarSource) -> Result<Self, StatusError> {
        let base_url = resolve_api_url(config, env)?;
        Self::with_base_url(base_url, config)
    }

    /// Create a provider talking to an explicit API server address
    pub fn with_base_url(base_url: Url, config: &ClusterConfig) -> Result<Self, StatusError> {
        let mut builder = reqwest::Client::builder().timeout(config.request_timeout());

        let ca_path = Path::new(&config.ca_path);
        if ca_path.exists() {
            let pem = std::fs::read(ca_path).map_err(|source| StatusError::Credentials {
                path: config.ca_path.clone(),
                source,
            })?;
            let certificate = Certificate::from_pem(&pem).map_err(|e| {
                StatusError::configuration(format!(
                    "invalid CA bundle {}: {}",
                    config.ca_path, e
                ))
            })?;
            builder = builder.add_root_certificate(certificate);
            debug!("Trusting cluster CA bundle from {}", config.ca_path);
        } else {
            debug!("No cluster CA bundle at {}, using system roots", config.ca_path);
        }

        let client = builder.build()?;

        info!("Kubernetes status provider using API server {}", base_url);

        Ok(Self {
            client,
            base_url,
            token_path: PathBuf::from(&config.token_path),
        })
    }

    fn pod_url(&self, namespace: &str, unit_name: &str) -> Result<Url, StatusError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                StatusError::configuration(format!(
                    "API server URL {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["api", "v1", "namespaces", namespace, "pods", unit_name]);
        Ok(url)
    }

    /// The service account token is re-read on every request since bound
    /// tokens are rotated by the kubelet
    async fn bearer_token(&self) -> Result<Option<String>, StatusError> {
        match tokio::fs::read_to_string(&self.token_path).await {
            Ok(token) => {
                let token = token.trim().to_string();
                Ok((!token.is_empty()).then_some(token))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(
                    "No service account token at {}, sending unauthenticated request",
                    self.token_path.display()
                );
                Ok(None)
            }
            Err(source) => Err(StatusError::Credentials {
                path: self.token_path.display().to_string(),
                source,
            }),
        }
    }
}

#[async_trait::async_trait]
impl StatusProvider for KubernetesStatusProvider {
    async fn fetch(&self, namespace: &str, unit_name: &str) -> Result<UnitSnapshot, StatusError> {
        let url = self.pod_url(namespace, unit_name)?;

        let mut request = self.client.get(url).header(ACCEPT, "application/json");
        if let Some(token) = self.bearer_token().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!("Error sending pod status request: {}", e);
            StatusError::Transport(e)
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!("Pod {} not found in {} namespace", unit_name, namespace);
            return Err(StatusError::NotFound {
                namespace: namespace.to_string(),
                name: unit_name.to_string(),
            });
        }

        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiStatus>(&body)
                .ok()
                .and_then(|api_status| api_status.message)
                .unwrap_or(body);
            error!("Error getting pod {}: {} {}", unit_name, status, message);
            return Err(StatusError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let pod: Pod = serde_json::from_str(&body)?;
        debug!("Found {} pod in {} namespace", unit_name, namespace);

        Ok(pod.into_snapshot(unit_name))
    }

    fn provider_name(&self) -> &str {
        "kubernetes"
    }
}

/// Base URL of the API server: explicit configuration first, then the
/// KUBERNETES_SERVICE_HOST/PORT pair injected into every pod
pub fn resolve_api_url(config: &ClusterConfig, env: &dyn VarSource) -> Result<Url, StatusError> {
    let raw = match &config.api_url {
        Some(api_url) => api_url.clone(),
        None => {
            let host = env
                .var("KUBERNETES_SERVICE_HOST")
                .filter(|host| !host.is_empty())
                .ok_or_else(|| {
                    StatusError::configuration(
                        "cluster.api_url is unset and KUBERNETES_SERVICE_HOST is not defined",
                    )
                })?;
            let port = env
                .var("KUBERNETES_SERVICE_PORT")
                .filter(|port| !port.is_empty())
                .unwrap_or_else(|| "443".to_string());

            if host.contains(':') {
                format!("https://[{}]:{}", host, port)
            } else {
                format!("https://{}:{}", host, port)
            }
        }
    };

    Url::parse(&raw)
        .map_err(|e| StatusError::configuration(format!("invalid API server URL {}: {}", raw, e)))
}

// Just the slice of the Pod object the watch needs.

#[derive(Debug, Deserialize)]
struct Pod {
    #[serde(default)]
    spec: PodSpec,
    #[serde(default)]
    status: PodStatus,
}

#[derive(Debug, Default, Deserialize)]
struct PodSpec {
    #[serde(default)]
    containers: Vec<Container>,
}

#[derive(Debug, Deserialize)]
struct Container {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodStatus {
    #[serde(default)]
    container_statuses: Vec<ContainerStatus>,
}

#[derive(Debug, Deserialize)]
struct ContainerStatus {
    name: String,
    #[serde(default)]
    state: ContainerState,
}

#[derive(Debug, Default, Deserialize)]
struct ContainerState {
    running: Option<serde_json::Value>,
    terminated: Option<TerminatedState>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TerminatedState {
    reason: Option<String>,
    exit_code: Option<i32>,
    finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    message: Option<String>,
}

impl Pod {
    fn into_snapshot(self, unit_name: &str) -> UnitSnapshot {
        let declared = self
            .spec
            .containers
            .into_iter()
            .map(|container| container.name)
            .collect();

        let processes = self
            .status
            .container_statuses
            .into_iter()
            .map(|status| ProcessSnapshot {
                name: status.name,
                state: status.state.into_lifecycle(),
            })
            .collect();

        UnitSnapshot {
            unit: unit_name.to_string(),
            declared,
            processes,
        }
    }
}

impl ContainerState {
    fn into_lifecycle(self) -> LifecycleState {
        if let Some(terminated) = self.terminated {
            return LifecycleState::Terminated {
                reason: terminated
                    .reason
                    .filter(|reason| !reason.is_empty())
                    .unwrap_or_else(|| "Terminated".to_string()),
                exit_code: terminated.exit_code,
                finished_at: terminated.finished_at,
            };
        }

        if self.running.is_some() {
            LifecycleState::Running
        } else {
            LifecycleState::Unknown
        }
    }
}
