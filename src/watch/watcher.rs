use super::set::WatchSet;
use super::state::WatchState;
use crate::config::ReaperConfig;
use crate::error::Result;
use crate::identity::UnitIdentity;
use crate::recovery::{FetchRecovery, RecoveryAction, RetryPolicy};
use crate::status::{StatusProvider, UnitSnapshot};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Timing knobs for the watch loop
#[derive(Debug, Clone, PartialEq)]
pub struct WatchSettings {
    pub poll_interval: Duration,
    /// Give up waiting after this long; None waits forever
    pub max_wait: Option<Duration>,
    pub retry: RetryPolicy,
}

impl WatchSettings {
    pub fn from_config(config: &ReaperConfig) -> Self {
        Self {
            poll_interval: config.watch.poll_interval(),
            max_wait: config.watch.max_wait(),
            retry: RetryPolicy::from_config(&config.retry),
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_wait: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// How a watch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Every watched container terminated
    Completed { polls: u64 },
    /// The max wait elapsed first
    TimedOut { polls: u64, remaining: Vec<String> },
    /// The cancellation token fired first
    Cancelled { polls: u64, remaining: Vec<String> },
}

/// Result of one fetch attempt chain
enum Fetched {
    Snapshot(UnitSnapshot),
    Cancelled,
    DeadlineReached,
}

/// Polls the unit until every member of the watch set has terminated
pub struct LifecycleWatcher<'a> {
    provider: &'a dyn StatusProvider,
    identity: &'a UnitIdentity,
    settings: WatchSettings,
    cancellation_token: CancellationToken,
}

impl<'a> LifecycleWatcher<'a> {
    pub fn new(
        provider: &'a dyn StatusProvider,
        identity: &'a UnitIdentity,
        settings: WatchSettings,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            provider,
            identity,
            settings,
            cancellation_token,
        }
    }

    /// Run the watch loop.
    ///
    /// Sleeps one poll interval before each fetch. An empty watch set completes
    /// without fetching anything. Fetch errors are retried per the retry policy
    /// and surface as errors once it gives up.
    pub async fn watch(&self, watch_set: &WatchSet) -> Result<WatchOutcome> {
        let mut state = WatchState::new(watch_set);
        let mut recovery = FetchRecovery::new(self.settings.retry.clone());
        // A bound too far out to represent on the clock is no bound at all
        let deadline = self
            .settings
            .max_wait
            .and_then(|max_wait| Instant::now().checked_add(max_wait));
        let mut polls = 0u64;

        while !state.is_complete() {
            if self.cancellation_token.is_cancelled() {
                return Ok(self.cancelled(polls, &state));
            }

            info!(
                remaining = state.remaining(),
                "Running watch containers count: {}",
                state.remaining()
            );

            let Some(pause) = self.clamp_to_deadline(self.settings.poll_interval, deadline)
            else {
                return Ok(self.timed_out(polls, &state));
            };

            if !self.pause(pause).await {
                return Ok(self.cancelled(polls, &state));
            }

            let snapshot = match self.fetch_snapshot(&mut recovery, deadline).await? {
                Fetched::Snapshot(snapshot) => snapshot,
                Fetched::Cancelled => return Ok(self.cancelled(polls, &state)),
                Fetched::DeadlineReached => return Ok(self.timed_out(polls, &state)),
            };
            polls += 1;

            let transitions = state.apply(&snapshot);
            debug!(
                "Poll {} observed {} terminations, {} remaining",
                polls,
                transitions.len(),
                state.remaining()
            );
        }

        info!("All watched containers are terminated after {} polls", polls);
        Ok(WatchOutcome::Completed { polls })
    }

    /// Shorten a wait so it ends at the deadline. None means the deadline has
    /// already passed.
    fn clamp_to_deadline(&self, wait: Duration, deadline: Option<Instant>) -> Option<Duration> {
        match deadline {
            Some(deadline) => {
                let now = Instant::now();
                (now < deadline).then(|| wait.min(deadline - now))
            }
            None => Some(wait),
        }
    }

    /// Sleep unless cancelled first; false means cancelled
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancellation_token.cancelled() => false,
            _ = sleep(duration) => true,
        }
    }

    /// Fetch the next snapshot, retrying per policy. Backoff between attempts
    /// never runs past the deadline.
    async fn fetch_snapshot(
        &self,
        recovery: &mut FetchRecovery,
        deadline: Option<Instant>,
    ) -> Result<Fetched> {
        loop {
            match self
                .provider
                .fetch(&self.identity.namespace, &self.identity.unit_name)
                .await
            {
                Ok(snapshot) => {
                    recovery.reset();
                    return Ok(Fetched::Snapshot(snapshot));
                }
                Err(error) => match recovery.handle_error(&error) {
                    RecoveryAction::RetryAfterDelay(delay) => {
                        let Some(delay) = self.clamp_to_deadline(delay, deadline) else {
                            return Ok(Fetched::DeadlineReached);
                        };
                        if !self.pause(delay).await {
                            return Ok(Fetched::Cancelled);
                        }
                        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                            return Ok(Fetched::DeadlineReached);
                        }
                    }
                    RecoveryAction::Abort => return Err(error.into()),
                },
            }
        }
    }

    fn timed_out(&self, polls: u64, state: &WatchState) -> WatchOutcome {
        let remaining = state.running_members();
        warn!(
            "Gave up waiting after {:?}; still running: {:?}",
            self.settings.max_wait.unwrap_or_default(),
            remaining
        );
        WatchOutcome::TimedOut { polls, remaining }
    }

    fn cancelled(&self, polls: u64, state: &WatchState) -> WatchOutcome {
        let remaining = state.running_members();
        info!("Watch cancelled; still running: {:?}", remaining);
        WatchOutcome::Cancelled { polls, remaining }
    }
}
