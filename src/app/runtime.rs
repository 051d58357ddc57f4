use super::{ExitReason, ReaperOrchestrator, ReaperPhase};
use crate::config::TimeoutAction;
use crate::error::Result;
use crate::watch::{LifecycleWatcher, WatchOutcome, WatchPlan};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

impl ReaperOrchestrator {
    /// Run the reaper with signal handling
    pub async fn run(&mut self) -> Result<ExitReason> {
        info!("Sidecar reaper is running for pod {}", self.identity);

        // Spawn signal handlers
        self.setup_signal_handlers();

        self.execute().await
    }

    /// Prepare, watch and shut the proxy down, without installing signal handlers
    pub async fn execute(&mut self) -> Result<ExitReason> {
        let watch_set = match self.prepare().await? {
            WatchPlan::Skip { proxy_name } => {
                info!("No {} container found. Goodbye", proxy_name);
                self.set_phase(ReaperPhase::Finished);
                return Ok(ExitReason::NoProxy);
            }
            WatchPlan::Watch(watch_set) => watch_set,
        };

        self.set_phase(ReaperPhase::Watching);

        let outcome = {
            let watcher = LifecycleWatcher::new(
                self.provider.as_ref(),
                &self.identity,
                self.settings.clone(),
                self.cancellation_token.clone(),
            );
            watcher.watch(&watch_set).await
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                self.set_phase(ReaperPhase::Failed);
                return Err(e);
            }
        };

        let reason = match outcome {
            WatchOutcome::Completed { polls } => {
                info!("All watched containers are terminated. Shutting down the proxy");
                self.shutdown_proxy().await?;
                ExitReason::ProxyShutdown { polls }
            }
            WatchOutcome::TimedOut { remaining, .. } => match self.config.watch.timeout_action {
                TimeoutAction::Shutdown => {
                    warn!(
                        "Max wait elapsed with {:?} still running; shutting down the proxy anyway",
                        remaining
                    );
                    self.shutdown_proxy().await?;
                    ExitReason::TimedOut {
                        remaining,
                        proxy_shutdown: true,
                    }
                }
                TimeoutAction::Abort => {
                    warn!(
                        "Max wait elapsed with {:?} still running; leaving the proxy up",
                        remaining
                    );
                    ExitReason::TimedOut {
                        remaining,
                        proxy_shutdown: false,
                    }
                }
            },
            WatchOutcome::Cancelled { remaining, .. } => {
                info!("Watch cancelled; leaving the proxy to the pod's own termination");
                ExitReason::Cancelled { remaining }
            }
        };

        self.set_phase(ReaperPhase::Finished);
        Ok(reason)
    }

    /// Cancel the watch on SIGTERM (kubelet stop) or SIGINT
    fn setup_signal_handlers(&self) {
        // Handle SIGTERM - Unix only
        #[cfg(unix)]
        {
            let token = self.cancellation_token.clone();
            tokio::spawn(async move {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        if sigterm.recv().await.is_some() {
                            info!("Received SIGTERM signal");
                            token.cancel();
                        }
                    }
                    Err(e) => warn!("Failed to register SIGTERM handler: {}", e),
                }
            });
        }

        // Handle SIGINT (Ctrl+C) - Cross-platform
        let token: CancellationToken = self.cancellation_token.clone();
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                token.cancel();
            }
        });
    }
}
