use super::set::WatchSet;
use crate::status::{LifecycleState, UnitSnapshot};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Per-member state; only ever moves from Running to Terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberState {
    Running,
    Terminated,
}

/// A member observed terminating during one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub member: String,
    pub reason: String,
    pub exit_code: Option<i32>,
}

/// Termination bookkeeping for the watch set.
///
/// Termination is sticky: once a member has been seen terminated it is never
/// inspected again, even if a later snapshot reports it running (e.g. after a
/// restart under `restartPolicy: OnFailure`).
#[derive(Debug, Clone)]
pub struct WatchState {
    members: BTreeMap<String, MemberState>,
    remaining: usize,
}

impl WatchState {
    pub fn new(watch_set: &WatchSet) -> Self {
        let members: BTreeMap<String, MemberState> = watch_set
            .iter()
            .map(|name| (name.to_string(), MemberState::Running))
            .collect();
        let remaining = members.len();

        Self { members, remaining }
    }

    /// Members not yet seen terminated
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    pub fn state_of(&self, member: &str) -> Option<MemberState> {
        self.members.get(member).copied()
    }

    pub fn running_members(&self) -> Vec<String> {
        self.members
            .iter()
            .filter(|(_, state)| **state == MemberState::Running)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Apply one snapshot, returning the members that terminated in it.
    ///
    /// A member missing from the snapshot stays running: absence may just be a
    /// partial read from the API server.
    pub fn apply(&mut self, snapshot: &UnitSnapshot) -> Vec<Transition> {
        let mut transitions = Vec::new();

        for (name, state) in self.members.iter_mut() {
            if *state == MemberState::Terminated {
                continue;
            }

            let Some(process) = snapshot.process(name) else {
                debug!(container = %name, "Container missing from snapshot, still waiting");
                continue;
            };

            debug!(container = %name, state = %process.state, "Container status");

            if let LifecycleState::Terminated {
                reason, exit_code, ..
            } = &process.state
            {
                *state = MemberState::Terminated;
                self.remaining -= 1;

                info!(
                    container = %name,
                    reason = %reason,
                    exit_code = ?exit_code,
                    "Container {} has terminated as it is {}",
                    name,
                    reason
                );

                transitions.push(Transition {
                    member: name.clone(),
                    reason: reason.clone(),
                    exit_code: *exit_code,
                });
            }
        }

        transitions
    }
}
