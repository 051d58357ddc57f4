/// Run phases of the reaper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaperPhase {
    Idle,
    Preparing,
    Watching,
    ShuttingDown,
    Finished,
    Failed,
}

/// Why the reaper stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// All watched containers finished and the proxy was told to shut down
    ProxyShutdown { polls: u64 },
    /// The pod has no proxy container
    NoProxy,
    /// A signal arrived before the watch finished
    Cancelled { remaining: Vec<String> },
    /// The max wait elapsed; `proxy_shutdown` tells whether the proxy was stopped anyway
    TimedOut {
        remaining: Vec<String>,
        proxy_shutdown: bool,
    },
}

impl ExitReason {
    /// Process exit status for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            ExitReason::ProxyShutdown { .. } | ExitReason::NoProxy | ExitReason::Cancelled { .. } => 0,
            ExitReason::TimedOut { .. } => 2,
        }
    }
}
