use chrono::{DateTime, Utc};
use std::fmt;

/// Lifecycle state of a single process as reported by one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Terminated {
        reason: String,
        exit_code: Option<i32>,
        finished_at: Option<DateTime<Utc>>,
    },
    /// Waiting, or no state reported yet
    Unknown,
}

impl LifecycleState {
    pub fn terminated<S: Into<String>>(reason: S) -> Self {
        Self::Terminated {
            reason: reason.into(),
            exit_code: None,
            finished_at: None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Running => write!(f, "running"),
            LifecycleState::Terminated {
                reason, exit_code, ..
            } => match exit_code {
                Some(code) => write!(f, "terminated ({}, exit code {})", reason, code),
                None => write!(f, "terminated ({})", reason),
            },
            LifecycleState::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub name: String,
    pub state: LifecycleState,
}

/// One point-in-time observation of a whole unit
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnitSnapshot {
    pub unit: String,
    /// Process names declared by the unit spec, in declaration order
    pub declared: Vec<String>,
    /// Reported process states, in the order the API returned them
    pub processes: Vec<ProcessSnapshot>,
}

impl UnitSnapshot {
    pub fn new<S, I, N>(unit: S, declared: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self {
            unit: unit.into(),
            declared: declared.into_iter().map(Into::into).collect(),
            processes: Vec::new(),
        }
    }

    pub fn with_process<S: Into<String>>(mut self, name: S, state: LifecycleState) -> Self {
        self.processes.push(ProcessSnapshot {
            name: name.into(),
            state,
        });
        self
    }

    pub fn declares(&self, name: &str) -> bool {
        self.declared.iter().any(|declared| declared == name)
    }

    /// First reported state for the named process, if any
    pub fn process(&self, name: &str) -> Option<&ProcessSnapshot> {
        self.processes.iter().find(|process| process.name == name)
    }
}
