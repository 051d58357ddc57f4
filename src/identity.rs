//! Who we are: namespace, pod and the two container names that are never watched.

use crate::config::IdentityConfig;
use crate::error::{ReaperError, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_PROXY_NAME: &str = "linkerd-proxy";
pub const DEFAULT_TERMINATOR_NAME: &str = "linkerd-proxy-terminator";

const POD_NAME_VARS: [&str; 2] = ["POD_NAME", "HOSTNAME"];
const PROXY_NAME_VARS: [&str; 2] = ["LINKERD_PROXY_CONTAINER_NAME", "PROXY_CONTAINER_NAME"];
const TERMINATOR_NAME_VARS: [&str; 2] = [
    "LINKERD_PROXY_TERMINATOR_CONTAINER_NAME",
    "TERMINATOR_CONTAINER_NAME",
];

/// Identity of the pod being watched, resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitIdentity {
    pub namespace: String,
    pub unit_name: String,
    pub proxy_name: String,
    pub terminator_name: String,
}

impl fmt::Display for UnitIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.unit_name)
    }
}

/// Source of environment-style variables
pub trait VarSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment
pub struct ProcessEnv;

impl VarSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl VarSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Resolve the unit identity from configuration, environment and the namespace file
pub fn resolve_identity(config: &IdentityConfig, env: &dyn VarSource) -> Result<UnitIdentity> {
    let namespace = read_namespace(&config.namespace_path)?;

    let unit_name = first_set(config.pod_name.as_deref(), env, &POD_NAME_VARS).ok_or_else(|| {
        ReaperError::identity(format!(
            "pod name is not configured and none of {:?} is set",
            POD_NAME_VARS
        ))
    })?;

    let proxy_name = first_set(config.proxy_container.as_deref(), env, &PROXY_NAME_VARS)
        .unwrap_or_else(|| DEFAULT_PROXY_NAME.to_string());

    let terminator_name = first_set(
        config.terminator_container.as_deref(),
        env,
        &TERMINATOR_NAME_VARS,
    )
    .unwrap_or_else(|| DEFAULT_TERMINATOR_NAME.to_string());

    let identity = UnitIdentity {
        namespace,
        unit_name,
        proxy_name,
        terminator_name,
    };

    info!(
        namespace = %identity.namespace,
        pod = %identity.unit_name,
        proxy = %identity.proxy_name,
        terminator = %identity.terminator_name,
        "Resolved unit identity"
    );

    Ok(identity)
}

/// Read the namespace of the running pod; an unreadable or empty file is fatal
pub fn read_namespace<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ReaperError::identity(format!(
            "cannot read namespace from {}: {}",
            path.display(),
            e
        ))
    })?;

    let namespace = raw.trim();
    if namespace.is_empty() {
        return Err(ReaperError::identity(format!(
            "namespace file {} is empty",
            path.display()
        )));
    }

    debug!("Read namespace '{}' from {}", namespace, path.display());
    Ok(namespace.to_string())
}

fn first_set(explicit: Option<&str>, env: &dyn VarSource, keys: &[&str]) -> Option<String> {
    explicit
        .map(str::to_string)
        .into_iter()
        .chain(keys.iter().filter_map(|key| env.var(key)))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
