use super::types::ReaperPhase;
use crate::actuator::ShutdownActuator;
use crate::config::ReaperConfig;
use crate::identity::UnitIdentity;
use crate::status::StatusProvider;
use crate::watch::WatchSettings;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Drives one reaper run: first snapshot, watch, proxy shutdown
pub struct ReaperOrchestrator {
    pub(super) config: ReaperConfig,
    pub(super) identity: UnitIdentity,
    pub(super) settings: WatchSettings,

    // Collaborators
    pub(super) provider: Arc<dyn StatusProvider>,
    pub(super) actuator: Arc<dyn ShutdownActuator>,

    // Lifecycle management
    pub(super) phase: ReaperPhase,
    pub(super) shutdown_requested: bool,
    pub(super) cancellation_token: CancellationToken,
}

impl ReaperOrchestrator {
    /// Create a new orchestrator for an already resolved identity
    pub fn new(
        config: ReaperConfig,
        identity: UnitIdentity,
        provider: Arc<dyn StatusProvider>,
        actuator: Arc<dyn ShutdownActuator>,
    ) -> Self {
        let settings = WatchSettings::from_config(&config);

        Self {
            config,
            identity,
            settings,
            provider,
            actuator,
            phase: ReaperPhase::Idle,
            shutdown_requested: false,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Override the watch timing derived from configuration
    pub fn with_settings(mut self, settings: WatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn identity(&self) -> &UnitIdentity {
        &self.identity
    }

    /// Token that stops the watch when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }
}
