//! Error types and handling
//!
//! Runtime errors are wrapped in the main [`HookError`] enum. Skip outcomes
//! of the dispatcher (no command declared, container not runnable) are not
//! errors and never appear here.

use std::time::Duration;
use thiserror::Error;

/// Exit code a hook command uses to ask for the update to be skipped (`EX_TEMPFAIL`).
pub const EX_TEMPFAIL: i32 = 75;

/// Container runtime errors
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Runtime CLI binary is not installed or not accessible
    #[error("Container runtime is not installed or not accessible")]
    NotInstalled,

    /// Runtime CLI invocation error
    #[error("Runtime CLI error: {0}")]
    CliError(String),

    /// Container not found
    #[error("Container not found: {id}")]
    ContainerNotFound { id: String },

    /// Hook command exited with a non-zero status
    #[error("Command execution failed with exit code {code}")]
    ExecFailed { code: i32, stderr: String },

    /// Hook command did not finish within its timeout
    #[error("Command execution timed out after {}s", timeout.as_secs())]
    ExecTimeout { timeout: Duration },
}

/// Main error enum
#[derive(Error, Debug)]
pub enum HookError {
    /// Container runtime errors
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Invalid configuration (flags, environment variables)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HookError {
    /// Whether the hook command exited with [`EX_TEMPFAIL`], asking the caller
    /// to skip the update for this container.
    pub fn skip_update_requested(&self) -> bool {
        matches!(
            self,
            HookError::Runtime(RuntimeError::ExecFailed {
                code: EX_TEMPFAIL,
                ..
            })
        )
    }

    /// Whether the hook command was killed because its timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, HookError::Runtime(RuntimeError::ExecTimeout { .. }))
    }
}

/// Convenience type alias for Results with HookError
pub type Result<T> = std::result::Result<T, HookError>;
