//! Core library for towerhook
//!
//! Runs container lifecycle hooks (pre-check, post-check, pre-update,
//! post-update) around an automated update, with phase-specific failure
//! handling. Contains the dispatcher, the container snapshot model, the
//! Docker/Podman CLI backend, logging, and error handling.

pub mod container;
pub mod docker;
pub mod errors;
pub mod lifecycle;
pub mod logging;
pub mod observability;
pub mod runtime;

pub use container::{Container, ContainerId, ContainerSnapshot};
pub use docker::{CliRuntime, CommandExecutor, ContainerLookup};
pub use errors::{HookError, Result};
pub use lifecycle::{ErrorPolicy, HookDispatcher, LifecyclePhase};
pub use observability::{LogSink, TracingSink};

/// Get the version of the core library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let version = version();
        assert!(!version.is_empty());
        assert!(version.contains('.'));
    }
}
