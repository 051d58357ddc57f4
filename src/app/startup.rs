use super::{ReaperOrchestrator, ReaperPhase};
use crate::error::Result;
use crate::watch::{build_watch_set, WatchPlan};
use tracing::{error, info};

impl ReaperOrchestrator {
    /// Fetch the first snapshot of the pod and decide what to watch.
    ///
    /// Any fetch error here is fatal: without a first snapshot there is no
    /// watch set to build.
    pub async fn prepare(&mut self) -> Result<WatchPlan> {
        self.set_phase(ReaperPhase::Preparing);
        info!(
            "Reading pod {} through the {} status provider",
            self.identity,
            self.provider.provider_name()
        );

        let snapshot = match self
            .provider
            .fetch(&self.identity.namespace, &self.identity.unit_name)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Failed to read pod {}: {}", self.identity, e);
                self.set_phase(ReaperPhase::Failed);
                return Err(e.into());
            }
        };

        info!(
            "Found {} pod in {} namespace with containers {:?}",
            self.identity.unit_name, self.identity.namespace, snapshot.declared
        );

        Ok(build_watch_set(&snapshot, &self.identity))
    }
}
