use super::{ReaperOrchestrator, ReaperPhase};
use tracing::debug;

impl ReaperOrchestrator {
    /// Update the run phase
    pub(super) fn set_phase(&mut self, phase: ReaperPhase) {
        if self.phase != phase {
            debug!("Reaper phase changed from {:?} to {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    /// Get the current run phase
    pub fn phase(&self) -> ReaperPhase {
        self.phase
    }

    /// Whether the proxy shutdown request has already been made
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }
}
