use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReaperConfig {
    pub identity: IdentityConfig,
    pub watch: WatchConfig,
    pub retry: RetryConfig,
    pub cluster: ClusterConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IdentityConfig {
    /// File holding the namespace of the running pod
    #[serde(default = "default_namespace_path")]
    pub namespace_path: String,

    /// Pod name; falls back to POD_NAME, then HOSTNAME
    #[serde(default)]
    pub pod_name: Option<String>,

    /// Proxy container name; falls back to the proxy name variables, then "linkerd-proxy"
    #[serde(default)]
    pub proxy_container: Option<String>,

    /// Name of this monitor's own container, never watched
    #[serde(default)]
    pub terminator_container: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// Seconds between two status polls
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,

    /// Upper bound on the whole watch; unbounded when unset
    #[serde(default)]
    pub max_wait_seconds: Option<u64>,

    /// What to do with the proxy once max_wait_seconds elapses
    #[serde(default = "default_timeout_action")]
    pub timeout_action: TimeoutAction,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetryConfig {
    /// Retries for a failed poll once watching has started (0 = fail on first error)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on the delay between retries, in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Double the delay after each failed attempt
    #[serde(default = "default_exponential_backoff")]
    pub exponential_backoff: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClusterConfig {
    /// API server base URL; derived from KUBERNETES_SERVICE_HOST/PORT when unset
    #[serde(default)]
    pub api_url: Option<String>,

    /// Service account bearer token
    #[serde(default = "default_token_path")]
    pub token_path: String,

    /// CA bundle used to verify the API server
    #[serde(default = "default_ca_path")]
    pub ca_path: String,

    /// Timeout applied to each status request
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProxyConfig {
    /// Admin endpoint that makes the proxy exit gracefully
    #[serde(default = "default_shutdown_url")]
    pub shutdown_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutAction {
    /// Shut the proxy down anyway
    Shutdown,
    /// Leave the proxy running and exit with a failure status
    Abort,
}

impl ReaperConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("identity.namespace_path", default_namespace_path())?
            .set_default(
                "watch.poll_interval_seconds",
                default_poll_interval_seconds(),
            )?
            .set_default("watch.timeout_action", "shutdown")?
            .set_default("retry.max_retries", default_max_retries())?
            .set_default("retry.base_delay_ms", default_base_delay_ms())?
            .set_default("retry.max_delay_ms", default_max_delay_ms())?
            .set_default("retry.exponential_backoff", default_exponential_backoff())?
            .set_default("cluster.token_path", default_token_path())?
            .set_default("cluster.ca_path", default_ca_path())?
            .set_default(
                "cluster.request_timeout_seconds",
                default_request_timeout_seconds(),
            )?
            .set_default("proxy.shutdown_url", default_shutdown_url())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // SIDECAR_REAPER_WATCH__POLL_INTERVAL_SECONDS=10 and friends
            .add_source(
                Environment::with_prefix("SIDECAR_REAPER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ReaperConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.namespace_path.trim().is_empty() {
            return Err(ConfigError::Message(
                "Identity namespace_path must not be empty".to_string(),
            ));
        }

        if self.watch.poll_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "Watch poll_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.watch.max_wait_seconds == Some(0) {
            return Err(ConfigError::Message(
                "Watch max_wait_seconds must be greater than 0 when set".to_string(),
            ));
        }

        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::Message(
                "Retry base_delay_ms must not exceed max_delay_ms".to_string(),
            ));
        }

        if self.cluster.request_timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Cluster request_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if let Some(api_url) = &self.cluster.api_url {
            reqwest::Url::parse(api_url).map_err(|e| {
                ConfigError::Message(format!("Cluster api_url '{}' is invalid: {}", api_url, e))
            })?;
        }

        reqwest::Url::parse(&self.proxy.shutdown_url).map_err(|e| {
            ConfigError::Message(format!(
                "Proxy shutdown_url '{}' is invalid: {}",
                self.proxy.shutdown_url, e
            ))
        })?;

        Ok(())
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_seconds.map(Duration::from_secs)
    }
}

impl ClusterConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            identity: IdentityConfig {
                namespace_path: default_namespace_path(),
                pod_name: None,
                proxy_container: None,
                terminator_container: None,
            },
            watch: WatchConfig {
                poll_interval_seconds: default_poll_interval_seconds(),
                max_wait_seconds: None,
                timeout_action: default_timeout_action(),
            },
            retry: RetryConfig {
                max_retries: default_max_retries(),
                base_delay_ms: default_base_delay_ms(),
                max_delay_ms: default_max_delay_ms(),
                exponential_backoff: default_exponential_backoff(),
            },
            cluster: ClusterConfig {
                api_url: None,
                token_path: default_token_path(),
                ca_path: default_ca_path(),
                request_timeout_seconds: default_request_timeout_seconds(),
            },
            proxy: ProxyConfig {
                shutdown_url: default_shutdown_url(),
            },
        }
    }
}

// Default value functions
fn default_namespace_path() -> String {
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace".to_string()
}

fn default_poll_interval_seconds() -> u64 {
    5
}
fn default_timeout_action() -> TimeoutAction {
    TimeoutAction::Shutdown
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_exponential_backoff() -> bool {
    true
}

fn default_token_path() -> String {
    "/var/run/secrets/kubernetes.io/serviceaccount/token".to_string()
}
fn default_ca_path() -> String {
    "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt".to_string()
}
fn default_request_timeout_seconds() -> u64 {
    10
}

fn default_shutdown_url() -> String {
    "http://localhost:4191/shutdown".to_string()
}
