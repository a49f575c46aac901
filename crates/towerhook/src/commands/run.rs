//! Run command implementation
//!
//! Implements `towerhook run <phase> <container>`: resolves the container and
//! hands it to the dispatcher entry point for the requested phase.

use anyhow::{Context, Result};
use towerhook_core::container::{Container, ContainerId};
use towerhook_core::docker::{CliRuntime, ContainerLookup};
use towerhook_core::lifecycle::{HookDispatcher, LifecyclePhase};
use towerhook_core::observability::TracingSink;
use tracing::{debug, info, instrument};

/// Run command arguments
#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Phase whose hook should run
    pub phase: LifecyclePhase,
    /// Container ID or name
    pub container: String,
    /// Runtime used for inspect and exec
    pub runtime: CliRuntime,
}

/// Execute the run command
#[instrument(skip(args), fields(phase = %args.phase, container = %args.container))]
pub async fn execute_run(args: RunArgs) -> Result<()> {
    debug!("Run args: {:?}", args);

    let sink = TracingSink;
    let dispatcher = HookDispatcher::new(&args.runtime, &sink);
    let id = ContainerId::new(args.container.as_str());

    match args.phase {
        LifecyclePhase::PreCheck => {
            let container = resolve(&args.runtime, &id).await?;
            dispatcher.pre_check(&container).await?;
        }
        LifecyclePhase::PostCheck => {
            let container = resolve(&args.runtime, &id).await?;
            dispatcher.post_check(&container).await?;
        }
        LifecyclePhase::PreUpdate => {
            let container = resolve(&args.runtime, &id).await?;
            dispatcher.pre_update(&container).await?;
        }
        // post-update resolves the new container itself and never fails
        LifecyclePhase::PostUpdate => dispatcher.post_update(&id).await?,
    }

    info!("Finished {} hook for {}", args.phase, id.short_id());
    Ok(())
}

async fn resolve(runtime: &CliRuntime, id: &ContainerId) -> Result<Container> {
    runtime
        .get_container(id)
        .await
        .with_context(|| format!("Failed to inspect container {}", id))
}
