//! Inspect command implementation
//!
//! Implements `towerhook inspect <container>`: reports the hook declared for
//! every phase and whether it would run right now, without executing anything.

use anyhow::{Context, Result};
use serde::Serialize;
use towerhook_core::container::{Container, ContainerId, ContainerSnapshot};
use towerhook_core::docker::{CliRuntime, ContainerLookup};
use towerhook_core::lifecycle::{evaluate_phase, LifecyclePhase, PhaseDecision};
use tracing::{debug, instrument};

/// Inspect command arguments
#[derive(Debug, Clone)]
pub struct InspectArgs {
    /// Container ID or name
    pub container: String,
    /// Print JSON instead of text
    pub json: bool,
    /// Runtime used for inspect
    pub runtime: CliRuntime,
}

/// Hooks declared by one container
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookReport {
    pub id: String,
    pub name: String,
    pub running: bool,
    pub restarting: bool,
    pub phases: Vec<PhaseReport>,
}

/// Declaration and decision for one phase
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseReport {
    pub phase: LifecyclePhase,
    pub command: Vec<String>,
    pub timeout_secs: u64,
    pub decision: &'static str,
}

impl HookReport {
    pub fn from_container(container: &Container) -> Self {
        let phases = LifecyclePhase::all()
            .iter()
            .map(|&phase| {
                let decision = match evaluate_phase(phase, container) {
                    PhaseDecision::NoCommand => "skip-no-command",
                    PhaseDecision::NotRunnable => "skip-not-running",
                    PhaseDecision::Execute { .. } => "execute",
                };
                PhaseReport {
                    phase,
                    command: container.hook_command(phase),
                    timeout_secs: container.hook_timeout(phase).as_secs(),
                    decision,
                }
            })
            .collect();

        Self {
            id: container.id().to_string(),
            name: container.name().to_string(),
            running: container.is_running(),
            restarting: container.is_restarting(),
            phases,
        }
    }
}

/// Render the report as human-readable text
pub fn render_text(report: &HookReport) -> String {
    let mut out = String::new();
    let state = if report.restarting {
        "restarting"
    } else if report.running {
        "running"
    } else {
        "stopped"
    };
    out.push_str(&format!(
        "{} ({}) [{}]\n",
        report.name,
        ContainerId::new(report.id.as_str()).short_id(),
        state
    ));

    for phase in &report.phases {
        let command = if phase.command.is_empty() {
            "-".to_string()
        } else {
            shell_words::join(&phase.command)
        };
        let timeout = if phase.timeout_secs == 0 {
            "none".to_string()
        } else {
            format!("{}s", phase.timeout_secs)
        };
        out.push_str(&format!(
            "  {:<12} {:<17} timeout={:<6} {}\n",
            phase.phase.as_str(),
            phase.decision,
            timeout,
            command
        ));
    }
    out
}

/// Execute the inspect command
#[instrument(skip(args), fields(container = %args.container))]
pub async fn execute_inspect(args: InspectArgs) -> Result<()> {
    let id = ContainerId::new(args.container.as_str());
    let container = args
        .runtime
        .get_container(&id)
        .await
        .with_context(|| format!("Failed to inspect container {}", args.container))?;
    debug!("Inspected container {} ({})", container.name(), id);

    let report = HookReport::from_container(&container);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report));
    }
    Ok(())
}
