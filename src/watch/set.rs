use crate::identity::UnitIdentity;
use crate::status::UnitSnapshot;
use std::collections::BTreeSet;
use std::fmt;
use tracing::info;

/// Names of the containers whose completion gates proxy shutdown
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WatchSet {
    members: BTreeSet<String>,
}

impl WatchSet {
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }
}

impl fmt::Display for WatchSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, member) in self.members.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", member)?;
        }
        write!(f, "]")
    }
}

/// What startup decided to do with the unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchPlan {
    /// The unit has no proxy container, so there is nothing to shut down
    Skip { proxy_name: String },
    /// Wait for these containers, then shut the proxy down
    Watch(WatchSet),
}

/// Compute the watch plan from the first snapshot of the unit
pub fn build_watch_set(snapshot: &UnitSnapshot, identity: &UnitIdentity) -> WatchPlan {
    if !snapshot.declares(&identity.proxy_name) {
        info!(
            "No {} container found in pod {}. Nothing to watch",
            identity.proxy_name, snapshot.unit
        );
        return WatchPlan::Skip {
            proxy_name: identity.proxy_name.clone(),
        };
    }

    info!("Found {} container", identity.proxy_name);

    let watch_set = WatchSet::new(
        snapshot
            .declared
            .iter()
            .filter(|name| **name != identity.proxy_name && **name != identity.terminator_name)
            .cloned(),
    );

    info!("Watching containers: {}", watch_set);
    WatchPlan::Watch(watch_set)
}
