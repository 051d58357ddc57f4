mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;


pub use orchestrator::ReaperOrchestrator;
pub use types::{ExitReason, ReaperPhase};
