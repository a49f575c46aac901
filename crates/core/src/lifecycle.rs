//! Lifecycle hook dispatch
//!
//! Decides, for one container and one phase, whether the declared hook should
//! run, runs it through a [`CommandExecutor`], and routes failures according to
//! the phase's [`ErrorPolicy`].
//!
//! Dispatch order:
//! 1. read the phase's timeout and command from the snapshot
//! 2. empty command: skip
//! 3. container not running, or restarting: skip
//! 4. execute through the backend and return its result unchanged
//!
//! Run state is read at dispatch time. A container that stops between that
//! check and the backend call is reported by the backend as a failure.

use crate::container::{ContainerId, ContainerSnapshot};
use crate::docker::{CommandExecutor, ContainerLookup};
use crate::errors::Result;
use crate::observability::{container_resolve_span, lifecycle_run_span, LogSink, LogSubject};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{Instrument, Level};

/// Points in a container's update cycle where a hook may run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecyclePhase {
    /// Before the update check for the container
    PreCheck,
    /// After the update check for the container
    PostCheck,
    /// Before the container is stopped and replaced
    PreUpdate,
    /// After the replacement container has started
    PostUpdate,
}

impl LifecyclePhase {
    /// Get the phase name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePhase::PreCheck => "pre-check",
            LifecyclePhase::PostCheck => "post-check",
            LifecyclePhase::PreUpdate => "pre-update",
            LifecyclePhase::PostUpdate => "post-update",
        }
    }

    /// All phases in the order an update campaign normally visits them
    pub fn all() -> &'static [LifecyclePhase] {
        &[
            LifecyclePhase::PreCheck,
            LifecyclePhase::PreUpdate,
            LifecyclePhase::PostUpdate,
            LifecyclePhase::PostCheck,
        ]
    }

    /// Label holding the hook command for this phase
    pub fn command_label(&self) -> &'static str {
        match self {
            LifecyclePhase::PreCheck => "com.centurylinklabs.watchtower.lifecycle.pre-check",
            LifecyclePhase::PostCheck => "com.centurylinklabs.watchtower.lifecycle.post-check",
            LifecyclePhase::PreUpdate => "com.centurylinklabs.watchtower.lifecycle.pre-update",
            LifecyclePhase::PostUpdate => "com.centurylinklabs.watchtower.lifecycle.post-update",
        }
    }

    /// Label holding the hook timeout in minutes, for phases that have one
    pub fn timeout_label(&self) -> Option<&'static str> {
        match self {
            LifecyclePhase::PreUpdate => {
                Some("com.centurylinklabs.watchtower.lifecycle.pre-update-timeout")
            }
            LifecyclePhase::PostUpdate => {
                Some("com.centurylinklabs.watchtower.lifecycle.post-update-timeout")
            }
            LifecyclePhase::PreCheck | LifecyclePhase::PostCheck => None,
        }
    }

    /// How a failed hook in this phase is handled.
    ///
    /// Only a pre-update hook can stop an update; every other hook is advisory.
    pub const fn error_policy(&self) -> ErrorPolicy {
        match self {
            LifecyclePhase::PreCheck => ErrorPolicy::LogAndSwallow,
            LifecyclePhase::PostCheck => ErrorPolicy::LogAndSwallow,
            LifecyclePhase::PreUpdate => ErrorPolicy::Propagate,
            LifecyclePhase::PostUpdate => ErrorPolicy::LogAndSwallow,
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to a hook failure once dispatch returns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Return the failure to the caller untouched, without logging it
    Propagate,
    /// Log the failure at error level and report success
    LogAndSwallow,
}

/// Outcome of evaluating the skip rules for one phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseDecision {
    /// No hook declared for the phase
    NoCommand,
    /// Container is stopped or restarting
    NotRunnable,
    /// Hook should run with this command and timeout
    Execute {
        command: Vec<String>,
        timeout: Duration,
    },
}

impl PhaseDecision {
    /// Debug message describing the decision
    pub fn describe(&self, phase: LifecyclePhase) -> String {
        match self {
            PhaseDecision::NoCommand => format!("No {} command supplied. Skipping", phase),
            PhaseDecision::NotRunnable => {
                format!("Container is not running. Skipping {} command.", phase)
            }
            PhaseDecision::Execute { .. } => format!("Executing {} command.", phase),
        }
    }
}

/// Apply the skip rules for `phase` to the current state of `container`.
///
/// The empty-command rule is evaluated first, so a stopped container without a
/// hook reports [`PhaseDecision::NoCommand`].
pub fn evaluate_phase<C>(phase: LifecyclePhase, container: &C) -> PhaseDecision
where
    C: ContainerSnapshot + ?Sized,
{
    let timeout = container.lifecycle_timeout(phase);
    let command = container.lifecycle_command(phase);

    if command.is_empty() {
        return PhaseDecision::NoCommand;
    }

    if !container.is_running() || container.is_restarting() {
        return PhaseDecision::NotRunnable;
    }

    PhaseDecision::Execute { command, timeout }
}

/// Run the hook for `phase` in `container` if it applies.
///
/// Skips return `Ok(())` without touching the executor. Executor failures are
/// returned exactly as produced; no policy is applied here.
pub async fn execute_lifecycle_phase_command<E, C>(
    phase: LifecyclePhase,
    executor: &E,
    container: &C,
    sink: &dyn LogSink,
) -> Result<()>
where
    E: CommandExecutor,
    C: ContainerSnapshot + ?Sized,
{
    let subject = LogSubject::container(container.name());
    let decision = evaluate_phase(phase, container);
    sink.record(Level::DEBUG, &subject, &decision.describe(phase));

    match decision {
        PhaseDecision::NoCommand | PhaseDecision::NotRunnable => Ok(()),
        PhaseDecision::Execute { command, timeout } => {
            executor
                .execute_command(container.id(), &command, timeout)
                .instrument(lifecycle_run_span(phase, container.name()))
                .await
        }
    }
}

/// Entry points for the four lifecycle phases.
///
/// Holds borrowed handles to the runtime and the log sink; it carries no state
/// of its own, so one dispatcher may serve many containers concurrently.
pub struct HookDispatcher<'a, R> {
    runtime: &'a R,
    sink: &'a dyn LogSink,
}

impl<'a, R> HookDispatcher<'a, R> {
    pub fn new(runtime: &'a R, sink: &'a dyn LogSink) -> Self {
        Self { runtime, sink }
    }
}

impl<'a, R> HookDispatcher<'a, R>
where
    R: CommandExecutor,
{
    /// Dispatch `phase` and apply its [`ErrorPolicy`].
    ///
    /// Returns an error only for phases whose policy is [`ErrorPolicy::Propagate`].
    pub async fn run_phase<C>(&self, phase: LifecyclePhase, container: &C) -> Result<()>
    where
        C: ContainerSnapshot + ?Sized,
    {
        let result =
            execute_lifecycle_phase_command(phase, self.runtime, container, self.sink).await;
        match (result, phase.error_policy()) {
            (Ok(()), _) => Ok(()),
            (Err(err), ErrorPolicy::Propagate) => Err(err),
            (Err(err), ErrorPolicy::LogAndSwallow) => {
                self.sink.record(
                    Level::ERROR,
                    &LogSubject::container(container.name()),
                    &err.to_string(),
                );
                Ok(())
            }
        }
    }

    /// Run the pre-check hook. Failures are logged, never returned.
    pub async fn pre_check<C>(&self, container: &C) -> Result<()>
    where
        C: ContainerSnapshot + ?Sized,
    {
        self.run_phase(LifecyclePhase::PreCheck, container).await
    }

    /// Run the post-check hook. Failures are logged, never returned.
    pub async fn post_check<C>(&self, container: &C) -> Result<()>
    where
        C: ContainerSnapshot + ?Sized,
    {
        self.run_phase(LifecyclePhase::PostCheck, container).await
    }

    /// Run the pre-update hook. Failures are returned to the caller, which
    /// decides whether to abort the update for this container.
    pub async fn pre_update<C>(&self, container: &C) -> Result<()>
    where
        C: ContainerSnapshot + ?Sized,
    {
        self.run_phase(LifecyclePhase::PreUpdate, container).await
    }
}

impl<'a, R> HookDispatcher<'a, R>
where
    R: CommandExecutor + ContainerLookup,
{
    /// Run the post-update hook in the container that replaced the old one.
    ///
    /// `new_container_id` is resolved first; a failed lookup is logged against
    /// the short ID and ends the call. Hook failures are logged, never returned.
    pub async fn post_update(&self, new_container_id: &ContainerId) -> Result<()> {
        let lookup = self
            .runtime
            .get_container(new_container_id)
            .instrument(container_resolve_span(new_container_id))
            .await;

        let container = match lookup {
            Ok(container) => container,
            Err(err) => {
                self.sink.record(
                    Level::ERROR,
                    &LogSubject::container_id(new_container_id),
                    &err.to_string(),
                );
                return Ok(());
            }
        };

        self.run_phase(LifecyclePhase::PostUpdate, &container).await
    }
}
