use super::types::UnitSnapshot;
use super::StatusProvider;
use crate::error::StatusError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Scripted status provider for running the watch without a cluster.
///
/// Each fetch pops the next scripted result. Once the script runs dry the last
/// successful snapshot is repeated; with no snapshot at all the unit is reported
/// as not found.
pub struct MockStatusProvider {
    script: Mutex<VecDeque<Result<UnitSnapshot, StatusError>>>,
    last: Mutex<Option<UnitSnapshot>>,
    fetches: Arc<AtomicUsize>,
}

impl MockStatusProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_snapshots<I: IntoIterator<Item = UnitSnapshot>>(snapshots: I) -> Self {
        let provider = Self::new();
        for snapshot in snapshots {
            provider.push_snapshot(snapshot);
        }
        provider
    }

    pub fn push_snapshot(&self, snapshot: UnitSnapshot) {
        self.script_queue().push_back(Ok(snapshot));
    }

    pub fn push_error(&self, error: StatusError) {
        self.script_queue().push_back(Err(error));
    }

    /// Number of fetches served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Shared handle on the fetch counter
    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetches)
    }

    fn script_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<UnitSnapshot, StatusError>>> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn last_snapshot(&self) -> std::sync::MutexGuard<'_, Option<UnitSnapshot>> {
        self.last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockStatusProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StatusProvider for MockStatusProvider {
    async fn fetch(&self, namespace: &str, unit_name: &str) -> Result<UnitSnapshot, StatusError> {
        let fetch = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Mock status fetch #{} for {}/{}", fetch, namespace, unit_name);

        let next = self.script_queue().pop_front();
        match next {
            Some(Ok(snapshot)) => {
                *self.last_snapshot() = Some(snapshot.clone());
                Ok(snapshot)
            }
            Some(Err(error)) => Err(error),
            None => self
                .last_snapshot()
                .clone()
                .ok_or_else(|| StatusError::NotFound {
                    namespace: namespace.to_string(),
                    name: unit_name.to_string(),
                }),
        }
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}
