mod kubernetes;
mod mock;
mod types;

#[cfg(test)]
mod tests;

pub use kubernetes::{resolve_api_url, KubernetesStatusProvider};
pub use mock::MockStatusProvider;
pub use types::{LifecycleState, ProcessSnapshot, UnitSnapshot};

use crate::error::StatusError;

/// Reads the current status of a unit from the cluster
#[async_trait::async_trait]
pub trait StatusProvider: Send + Sync {
    /// Fetch a fresh snapshot of the named unit
    async fn fetch(&self, namespace: &str, unit_name: &str) -> Result<UnitSnapshot, StatusError>;

    /// Get the name of this provider for logging
    fn provider_name(&self) -> &str;
}
