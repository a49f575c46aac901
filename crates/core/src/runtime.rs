//! Container runtime selection
//!
//! Chooses between Docker and Podman and builds the matching [`CliRuntime`].
//! Precedence: CLI flag > `TOWERHOOK_RUNTIME` env var > docker.

use crate::docker::CliRuntime;
use crate::errors::HookError;

/// Environment variable consulted when no runtime flag is given
pub const RUNTIME_ENV_VAR: &str = "TOWERHOOK_RUNTIME";

/// Container runtime CLI that hooks are executed through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    Docker,
    Podman,
}

impl RuntimeKind {
    /// Binary name looked up on `PATH` when no explicit path is given
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }
}

impl std::str::FromStr for RuntimeKind {
    type Err = HookError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        [Self::Docker, Self::Podman]
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                HookError::Config(format!(
                    "Unknown runtime '{}', expected docker or podman",
                    value
                ))
            })
    }
}

impl std::fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves the runtime to use and builds its [`CliRuntime`]
pub struct RuntimeFactory;

impl RuntimeFactory {
    /// Pick the runtime: explicit choice, then `TOWERHOOK_RUNTIME`, then docker.
    ///
    /// An unrecognized environment value is logged and ignored.
    pub fn detect_runtime(cli_runtime: Option<RuntimeKind>) -> RuntimeKind {
        if let Some(runtime) = cli_runtime {
            return runtime;
        }

        if let Ok(env_runtime) = std::env::var(RUNTIME_ENV_VAR) {
            match env_runtime.parse() {
                Ok(runtime) => return runtime,
                Err(err) => tracing::warn!("Ignoring {}: {}", RUNTIME_ENV_VAR, err),
            }
        }

        RuntimeKind::Docker
    }

    /// Create the CLI runtime for `kind`, optionally overriding the binary path
    pub fn create_runtime(kind: RuntimeKind, runtime_path: Option<String>) -> CliRuntime {
        match (kind, runtime_path) {
            (_, Some(path)) => CliRuntime::with_runtime_path(path),
            (RuntimeKind::Docker, None) => CliRuntime::docker(),
            (RuntimeKind::Podman, None) => CliRuntime::podman(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests below mutate a process-wide environment variable
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_runtime_kind_parsing() {
        for (input, expected) in [
            ("docker", RuntimeKind::Docker),
            ("DOCKER", RuntimeKind::Docker),
            (" Podman ", RuntimeKind::Podman),
        ] {
            assert_eq!(input.parse::<RuntimeKind>().unwrap(), expected, "{}", input);
        }

        let err = "containerd".parse::<RuntimeKind>().unwrap_err();
        assert!(err.to_string().contains("'containerd'"));
        assert_eq!(RuntimeKind::Podman.to_string(), "podman");
    }

    #[test]
    fn test_detect_runtime_default() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::remove_var(RUNTIME_ENV_VAR);
        assert_eq!(RuntimeFactory::detect_runtime(None), RuntimeKind::Docker);
    }

    #[test]
    fn test_detect_runtime_cli_precedence() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::set_var(RUNTIME_ENV_VAR, "podman");
        assert_eq!(
            RuntimeFactory::detect_runtime(Some(RuntimeKind::Docker)),
            RuntimeKind::Docker
        );
        std::env::remove_var(RUNTIME_ENV_VAR);
    }

    #[test]
    fn test_detect_runtime_env_var() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::set_var(RUNTIME_ENV_VAR, "podman");
        assert_eq!(RuntimeFactory::detect_runtime(None), RuntimeKind::Podman);

        // Invalid env var falls back to default
        std::env::set_var(RUNTIME_ENV_VAR, "invalid");
        assert_eq!(RuntimeFactory::detect_runtime(None), RuntimeKind::Docker);

        std::env::remove_var(RUNTIME_ENV_VAR);
    }

    #[test]
    fn test_create_runtime() {
        let docker = RuntimeFactory::create_runtime(RuntimeKind::Docker, None);
        assert_eq!(docker.runtime_path(), "docker");

        let podman = RuntimeFactory::create_runtime(RuntimeKind::Podman, None);
        assert_eq!(podman.runtime_path(), "podman");

        let custom = RuntimeFactory::create_runtime(
            RuntimeKind::Podman,
            Some("/opt/bin/podman".to_string()),
        );
        assert_eq!(custom.runtime_path(), "/opt/bin/podman");
    }
}
