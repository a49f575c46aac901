//! Container snapshots and lifecycle hook labels
//!
//! A container declares its lifecycle hooks through labels in the
//! `com.centurylinklabs.watchtower.lifecycle.` namespace. This module turns
//! `inspect` output into a read-only [`Container`] snapshot and exposes the
//! accessors the dispatcher consults through [`ContainerSnapshot`].

use crate::errors::{Result, RuntimeError};
use crate::lifecycle::LifecyclePhase;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::warn;

/// Namespace shared by every lifecycle hook label
pub const LIFECYCLE_LABEL_PREFIX: &str = "com.centurylinklabs.watchtower.lifecycle.";

/// Timeout applied when a phase declares none (or an unparsable one)
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(60);

/// Length of the abbreviated ID used in log output
const SHORT_ID_LEN: usize = 12;

/// Stable container identifier as reported by the runtime
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for logs: `sha256:` prefix removed, first 12 characters.
    pub fn short_id(&self) -> &str {
        let id = self.0.strip_prefix("sha256:").unwrap_or(&self.0);
        match id.char_indices().nth(SHORT_ID_LEN) {
            Some((idx, _)) => &id[..idx],
            None => id,
        }
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ContainerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Read-only, point-in-time view of a container as seen by the dispatcher
///
/// Implementations must reflect the container's state at the moment they were
/// produced; the dispatcher evaluates run state when it dispatches, never earlier.
pub trait ContainerSnapshot {
    /// Stable container ID
    fn id(&self) -> &ContainerId;

    /// Human-readable container name
    fn name(&self) -> &str;

    /// Argument vector of the hook declared for `phase` (empty when none is declared)
    fn lifecycle_command(&self, phase: LifecyclePhase) -> Vec<String>;

    /// Timeout the backend should enforce for `phase`
    fn lifecycle_timeout(&self, phase: LifecyclePhase) -> Duration;

    fn is_running(&self) -> bool;

    fn is_restarting(&self) -> bool;
}

/// Container snapshot backed by runtime labels and state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    id: ContainerId,
    name: String,
    image: String,
    running: bool,
    restarting: bool,
    labels: HashMap<String, String>,
}

impl Container {
    /// Create a running, non-restarting container with no labels
    pub fn new(id: impl Into<ContainerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image: String::new(),
            running: true,
            restarting: false,
            labels: HashMap::new(),
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_state(mut self, running: bool, restarting: bool) -> Self {
        self.running = running;
        self.restarting = restarting;
        self
    }

    pub fn with_labels(mut self, labels: HashMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }

    /// Build a snapshot from one element of `inspect` JSON output
    pub fn from_inspect(value: &Value) -> Result<Self> {
        let id = value
            .get("Id")
            .and_then(Value::as_str)
            .ok_or_else(|| RuntimeError::CliError("Inspect output has no Id".to_string()))?;

        let name = value
            .get("Name")
            .and_then(Value::as_str)
            .map(|name| name.trim_start_matches('/').to_string())
            .unwrap_or_default();

        let state = value.get("State");
        let state_flag = |key: &str| {
            state
                .and_then(|state| state.get(key))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        };

        let config = value.get("Config");
        let image = config
            .and_then(|config| config.get("Image"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let labels = config
            .and_then(|config| config.get("Labels"))
            .and_then(Value::as_object)
            .map(|labels_obj| {
                labels_obj
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            id: ContainerId::new(id),
            name,
            image,
            running: state_flag("Running"),
            restarting: state_flag("Restarting"),
            labels,
        })
    }

    /// Parse the hook declared for `phase`.
    ///
    /// A missing or blank label yields an empty vector. A JSON array of strings is
    /// used verbatim; anything else, including text that merely starts with `[`,
    /// is a shell snippet run through `sh -c`.
    pub fn hook_command(&self, phase: LifecyclePhase) -> Vec<String> {
        self.labels
            .get(phase.command_label())
            .map(|raw| parse_hook_command(raw))
            .unwrap_or_default()
    }

    /// Resolve the timeout for `phase`, falling back to [`DEFAULT_HOOK_TIMEOUT`].
    ///
    /// Values are whole minutes; zero disables the timeout.
    pub fn hook_timeout(&self, phase: LifecyclePhase) -> Duration {
        let Some(label) = phase.timeout_label() else {
            return DEFAULT_HOOK_TIMEOUT;
        };
        let Some(raw) = self.labels.get(label) else {
            return DEFAULT_HOOK_TIMEOUT;
        };
        let seconds = raw
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|minutes| minutes.checked_mul(60));
        match seconds {
            Some(seconds) => Duration::from_secs(seconds),
            None => {
                warn!(
                    container = %self.name,
                    "Invalid value '{}' for {}, using default timeout of {}s",
                    raw,
                    label,
                    DEFAULT_HOOK_TIMEOUT.as_secs()
                );
                DEFAULT_HOOK_TIMEOUT
            }
        }
    }
}

impl ContainerSnapshot for Container {
    fn id(&self) -> &ContainerId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn lifecycle_command(&self, phase: LifecyclePhase) -> Vec<String> {
        self.hook_command(phase)
    }

    fn lifecycle_timeout(&self, phase: LifecyclePhase) -> Duration {
        self.hook_timeout(phase)
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn is_restarting(&self) -> bool {
        self.restarting
    }
}

fn parse_hook_command(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if trimmed.starts_with('[') {
        if let Ok(argv) = serde_json::from_str::<Vec<String>>(trimmed) {
            return argv;
        }
    }

    vec!["sh".to_string(), "-c".to_string(), raw.to_string()]
}
