use super::{ReaperOrchestrator, ReaperPhase};
use crate::error::Result;
use tracing::{error, info, warn};

impl ReaperOrchestrator {
    /// Ask the proxy to shut down.
    ///
    /// The request is made at most once per orchestrator, successful or not; a
    /// second call is a no-op. There is no retry.
    pub async fn shutdown_proxy(&mut self) -> Result<()> {
        if self.shutdown_requested {
            warn!("Proxy shutdown was already requested; not sending it again");
            return Ok(());
        }

        self.set_phase(ReaperPhase::ShuttingDown);
        self.shutdown_requested = true;

        info!(
            "Requesting shutdown of {} at {}",
            self.identity.proxy_name,
            self.actuator.endpoint()
        );

        if let Err(e) = self.actuator.request_shutdown().await {
            error!("Failed to shut down {}: {}", self.identity.proxy_name, e);
            self.set_phase(ReaperPhase::Failed);
            return Err(e.into());
        }

        info!("Shut down {}", self.identity.proxy_name);
        Ok(())
    }
}
