//! The lifecycle watch: which containers to wait for, and the loop that waits.

mod set;
mod state;
mod watcher;


pub use set::{build_watch_set, WatchPlan, WatchSet};
pub use state::{MemberState, Transition, WatchState};
pub use watcher::{LifecycleWatcher, WatchOutcome, WatchSettings};
