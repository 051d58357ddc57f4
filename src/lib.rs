pub mod actuator;
pub mod app;
pub mod config;
pub mod error;
pub mod identity;
pub mod recovery;
pub mod status;
pub mod watch;

pub use crate::actuator::{ProxyAdminActuator, RecordingActuator, ShutdownActuator};
pub use crate::app::{ExitReason, ReaperOrchestrator, ReaperPhase};
pub use crate::config::{ReaperConfig, TimeoutAction};
pub use crate::error::{ActuatorError, ReaperError, Result, StatusError};
pub use crate::identity::{resolve_identity, ProcessEnv, UnitIdentity, VarSource};
pub use crate::recovery::{FetchRecovery, RecoveryAction, RetryPolicy};
pub use crate::status::{
    KubernetesStatusProvider, LifecycleState, MockStatusProvider, ProcessSnapshot,
    StatusProvider, UnitSnapshot,
};
pub use crate::watch::{
    build_watch_set, LifecycleWatcher, MemberState, Transition, WatchOutcome, WatchPlan,
    WatchSet, WatchSettings, WatchState,
};
