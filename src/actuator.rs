use crate::error::ActuatorError;
use reqwest::Url;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

/// Asks the proxy to shut itself down
#[async_trait::async_trait]
pub trait ShutdownActuator: Send + Sync {
    /// Fire the shutdown request once
    async fn request_shutdown(&self) -> Result<(), ActuatorError>;

    /// Where the request goes, for logging
    fn endpoint(&self) -> &str;
}

/// Shuts the proxy down through its admin HTTP endpoint
pub struct ProxyAdminActuator {
    client: reqwest::Client,
    url: Url,
}

impl ProxyAdminActuator {
    pub fn new(shutdown_url: &str) -> Result<Self, ActuatorError> {
        let url = Url::parse(shutdown_url).map_err(|e| ActuatorError::InvalidEndpoint {
            url: shutdown_url.to_string(),
            details: e.to_string(),
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            url,
        })
    }
}

#[async_trait::async_trait]
impl ShutdownActuator for ProxyAdminActuator {
    async fn request_shutdown(&self) -> Result<(), ActuatorError> {
        // Success is the request completing; the proxy's answer is not inspected
        let response = self.client.post(self.url.clone()).send().await.map_err(|e| {
            error!("Error sending shutdown request to {}: {}", self.url, e);
            ActuatorError::Transport(e)
        })?;

        debug!("Proxy admin endpoint answered {}", response.status());
        info!("Shutdown requested from proxy at {}", self.url);
        Ok(())
    }

    fn endpoint(&self) -> &str {
        self.url.as_str()
    }
}

/// Actuator that records calls instead of making them
pub struct RecordingActuator {
    calls: AtomicUsize,
    probe: Option<Arc<AtomicUsize>>,
    probe_readings: Mutex<Vec<usize>>,
    fail: bool,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            probe: None,
            probe_readings: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// Record the value of `probe` at the moment of each call
    pub fn with_probe(probe: Arc<AtomicUsize>) -> Self {
        Self {
            probe: Some(probe),
            ..Self::new()
        }
    }

    /// Every call fails with an invalid endpoint error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn probe_readings(&self) -> Vec<usize> {
        self.probe_readings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for RecordingActuator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ShutdownActuator for RecordingActuator {
    async fn request_shutdown(&self) -> Result<(), ActuatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(probe) = &self.probe {
            self.probe_readings
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(probe.load(Ordering::SeqCst));
        }

        if self.fail {
            return Err(ActuatorError::InvalidEndpoint {
                url: self.endpoint().to_string(),
                details: "recording actuator configured to fail".to_string(),
            });
        }

        debug!("Recorded shutdown request #{}", self.call_count());
        Ok(())
    }

    fn endpoint(&self) -> &str {
        "recording://proxy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_proxy_admin_posts_without_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/shutdown");
                then.status(202);
            })
            .await;

        let actuator = ProxyAdminActuator::new(&server.url("/shutdown")).unwrap();
        actuator.request_shutdown().await.unwrap();

        mock.assert_hits_async(1).await;
        assert_eq!(actuator.endpoint(), server.url("/shutdown"));
    }

    #[tokio::test]
    async fn test_proxy_admin_ignores_response_status() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/shutdown");
                then.status(500).body("already shutting down");
            })
            .await;

        let actuator = ProxyAdminActuator::new(&server.url("/shutdown")).unwrap();
        assert!(actuator.request_shutdown().await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_proxy_admin_transport_failure() {
        // Nothing listens on port 1
        let actuator = ProxyAdminActuator::new("http://127.0.0.1:1/shutdown").unwrap();
        assert!(matches!(
            actuator.request_shutdown().await,
            Err(ActuatorError::Transport(_))
        ));
    }

    #[test]
    fn test_proxy_admin_rejects_invalid_url() {
        assert!(matches!(
            ProxyAdminActuator::new("not a url"),
            Err(ActuatorError::InvalidEndpoint { .. })
        ));
    }

    #[tokio::test]
    async fn test_recording_actuator_counts_and_probes() {
        let probe = Arc::new(AtomicUsize::new(7));
        let actuator = RecordingActuator::with_probe(Arc::clone(&probe));

        actuator.request_shutdown().await.unwrap();
        probe.store(9, Ordering::SeqCst);
        actuator.request_shutdown().await.unwrap();

        assert_eq!(actuator.call_count(), 2);
        assert_eq!(actuator.probe_readings(), vec![7, 9]);
        assert!(RecordingActuator::failing().request_shutdown().await.is_err());
    }
}
