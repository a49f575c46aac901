//! Container runtime integration
//!
//! This module defines the two capabilities the hook dispatcher consumes
//! ([`CommandExecutor`] and [`ContainerLookup`]) and implements them on top of
//! the Docker/Podman command line.

use crate::container::{Container, ContainerId, ContainerSnapshot};
use crate::errors::{HookError, Result, RuntimeError};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Runs a hook command inside a container
#[allow(async_fn_in_trait)]
pub trait CommandExecutor {
    /// Execute `command` in `container_id`, enforcing `timeout`.
    ///
    /// A zero timeout means no limit. An elapsed timeout is reported as
    /// [`RuntimeError::ExecTimeout`], a non-zero exit as [`RuntimeError::ExecFailed`].
    async fn execute_command(
        &self,
        container_id: &ContainerId,
        command: &[String],
        timeout: Duration,
    ) -> Result<()>;
}

/// Resolves a container ID into a fresh snapshot
#[allow(async_fn_in_trait)]
pub trait ContainerLookup {
    type Snapshot: ContainerSnapshot;

    async fn get_container(&self, id: &ContainerId) -> Result<Self::Snapshot>;
}

// Implement the capabilities for references to implementors

impl<T: CommandExecutor> CommandExecutor for &T {
    async fn execute_command(
        &self,
        container_id: &ContainerId,
        command: &[String],
        timeout: Duration,
    ) -> Result<()> {
        (*self).execute_command(container_id, command, timeout).await
    }
}

impl<T: ContainerLookup> ContainerLookup for &T {
    type Snapshot = T::Snapshot;

    async fn get_container(&self, id: &ContainerId) -> Result<Self::Snapshot> {
        (*self).get_container(id).await
    }
}

/// Generic CLI-based container runtime implementation
///
/// Works for both Docker and Podman since they share a compatible CLI.
#[derive(Debug, Clone)]
pub struct CliRuntime {
    /// Container runtime CLI binary path (e.g., "docker" or "podman")
    runtime_path: String,
}

impl CliRuntime {
    pub fn docker() -> Self {
        Self::with_runtime_path("docker".to_string())
    }

    pub fn podman() -> Self {
        Self::with_runtime_path("podman".to_string())
    }

    pub fn with_runtime_path(runtime_path: String) -> Self {
        Self { runtime_path }
    }

    pub fn runtime_path(&self) -> &str {
        &self.runtime_path
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.runtime_path);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    fn spawn_error(&self, err: std::io::Error) -> HookError {
        if err.kind() == std::io::ErrorKind::NotFound {
            RuntimeError::NotInstalled.into()
        } else {
            RuntimeError::CliError(format!("Failed to run {}: {}", self.runtime_path, err)).into()
        }
    }
}

impl Default for CliRuntime {
    fn default() -> Self {
        Self::docker()
    }
}

fn log_exec_output(output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        debug!("Command output: {}", stdout.trim_end());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        warn!("Command error output: {}", stderr.trim_end());
    }
}

impl ContainerLookup for CliRuntime {
    type Snapshot = Container;

    #[instrument(skip(self), fields(runtime = %self.runtime_path))]
    async fn get_container(&self, id: &ContainerId) -> Result<Container> {
        debug!("Inspecting container: {}", id);

        let output = self
            .command()
            .args(["inspect", "--type", "container", id.as_str()])
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("No such object") || stderr.contains("No such container") {
                return Err(RuntimeError::ContainerNotFound { id: id.to_string() }.into());
            }
            return Err(
                RuntimeError::CliError(format!("Inspect command failed: {}", stderr.trim())).into(),
            );
        }

        let containers: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout)
            .map_err(|e| RuntimeError::CliError(format!("Failed to parse inspect JSON: {}", e)))?;

        match containers.first() {
            Some(container) => Container::from_inspect(container),
            None => Err(RuntimeError::ContainerNotFound { id: id.to_string() }.into()),
        }
    }
}

impl CommandExecutor for CliRuntime {
    #[instrument(skip(self, command), fields(runtime = %self.runtime_path, container_id = %container_id.short_id()))]
    async fn execute_command(
        &self,
        container_id: &ContainerId,
        command: &[String],
        timeout: Duration,
    ) -> Result<()> {
        debug!(
            "Runtime exec: {} (timeout {}s)",
            shell_words::join(command),
            timeout.as_secs()
        );

        let child = self
            .command()
            .arg("exec")
            .arg(container_id.as_str())
            .args(command)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // Dropping the future on timeout kills the exec client, not the process
        // inside the container.
        let waited = if timeout.is_zero() {
            child.wait_with_output().await
        } else {
            match tokio::time::timeout(timeout, child.wait_with_output()).await {
                Ok(waited) => waited,
                Err(_) => return Err(RuntimeError::ExecTimeout { timeout }.into()),
            }
        };
        let output = waited
            .map_err(|e| RuntimeError::CliError(format!("Failed to wait for exec: {}", e)))?;

        log_exec_output(&output);

        if output.status.success() {
            Ok(())
        } else {
            Err(RuntimeError::ExecFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into())
        }
    }
}

/// In-memory runtime for tests
pub mod mock {
    use super::{CommandExecutor, ContainerLookup};
    use crate::container::{Container, ContainerId, ContainerSnapshot};
    use crate::errors::{Result, RuntimeError};
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tracing::debug;

    /// Scripted outcome of an exec call
    #[derive(Debug, Clone, Default)]
    pub struct MockExecResponse {
        /// Exit code to report (0 is success)
        pub exit_code: i32,
        /// Report the command as timed out instead of exiting
        pub timed_out: bool,
        /// Optional delay to simulate command execution time
        pub delay: Option<Duration>,
        /// Stderr attached to a failing exit
        pub stderr: String,
    }

    impl MockExecResponse {
        pub fn success() -> Self {
            Self::default()
        }

        pub fn exit_code(code: i32) -> Self {
            Self {
                exit_code: code,
                stderr: format!("exited with {}", code),
                ..Self::default()
            }
        }

        pub fn timeout() -> Self {
            Self {
                timed_out: true,
                ..Self::default()
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    /// Record of an exec call for verification in tests
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct MockExecCall {
        pub container_id: ContainerId,
        pub command: Vec<String>,
        pub timeout: Duration,
    }

    /// Mock runtime implementing both dispatcher capabilities
    #[derive(Debug, Default, Clone)]
    pub struct MockRuntime {
        containers: Arc<Mutex<Vec<Container>>>,
        failing_lookups: Arc<Mutex<HashSet<ContainerId>>>,
        default_response: Arc<Mutex<MockExecResponse>>,
        /// Per-container responses, keyed by container ID
        responses: Arc<Mutex<HashMap<ContainerId, MockExecResponse>>>,
        exec_history: Arc<Mutex<Vec<MockExecCall>>>,
    }

    impl MockRuntime {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a container the lookup can resolve
        pub fn add_container(&self, container: Container) {
            self.containers.lock().unwrap().push(container);
        }

        /// Make lookups of `id` fail with a CLI error
        pub fn fail_lookup(&self, id: impl Into<ContainerId>) {
            self.failing_lookups.lock().unwrap().insert(id.into());
        }

        pub fn set_default_response(&self, response: MockExecResponse) {
            *self.default_response.lock().unwrap() = response;
        }

        pub fn set_response(&self, id: impl Into<ContainerId>, response: MockExecResponse) {
            self.responses.lock().unwrap().insert(id.into(), response);
        }

        /// Get history of exec calls made
        pub fn exec_history(&self) -> Vec<MockExecCall> {
            self.exec_history.lock().unwrap().clone()
        }
    }

    impl ContainerLookup for MockRuntime {
        type Snapshot = Container;

        async fn get_container(&self, id: &ContainerId) -> Result<Container> {
            debug!("MockRuntime get_container called for ID: {}", id);

            if self.failing_lookups.lock().unwrap().contains(id) {
                return Err(RuntimeError::CliError(format!("Mock lookup failure for {}", id)).into());
            }

            self.containers
                .lock()
                .unwrap()
                .iter()
                .find(|container| container.id() == id)
                .cloned()
                .ok_or_else(|| RuntimeError::ContainerNotFound { id: id.to_string() }.into())
        }
    }

    impl CommandExecutor for MockRuntime {
        async fn execute_command(
            &self,
            container_id: &ContainerId,
            command: &[String],
            timeout: Duration,
        ) -> Result<()> {
            debug!(
                "MockRuntime exec called on container {} with command: {:?}",
                container_id, command
            );

            self.exec_history.lock().unwrap().push(MockExecCall {
                container_id: container_id.clone(),
                command: command.to_vec(),
                timeout,
            });

            let response = self
                .responses
                .lock()
                .unwrap()
                .get(container_id)
                .cloned()
                .unwrap_or_else(|| self.default_response.lock().unwrap().clone());

            if let Some(delay) = response.delay {
                tokio::time::sleep(delay).await;
            }

            if response.timed_out {
                return Err(RuntimeError::ExecTimeout { timeout }.into());
            }

            if response.exit_code != 0 {
                return Err(RuntimeError::ExecFailed {
                    code: response.exit_code,
                    stderr: response.stderr,
                }
                .into());
            }

            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockExecResponse, MockRuntime};
    use super::*;
    use crate::errors::EX_TEMPFAIL;

    #[test]
    fn test_cli_runtime_constructors() {
        assert_eq!(CliRuntime::docker().runtime_path(), "docker");
        assert_eq!(CliRuntime::podman().runtime_path(), "podman");
        assert_eq!(CliRuntime::default().runtime_path(), "docker");
        assert_eq!(
            CliRuntime::with_runtime_path("/usr/local/bin/docker".to_string()).runtime_path(),
            "/usr/local/bin/docker"
        );
    }

    #[tokio::test]
    async fn test_missing_runtime_binary_is_not_installed() {
        let runtime =
            CliRuntime::with_runtime_path("/nonexistent/towerhook-test-runtime".to_string());
        let err = runtime
            .get_container(&ContainerId::new("abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::Runtime(RuntimeError::NotInstalled)));

        let err = runtime
            .execute_command(
                &ContainerId::new("abc"),
                &["true".to_string()],
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::Runtime(RuntimeError::NotInstalled)));
    }

    #[tokio::test]
    async fn test_mock_lookup() {
        let runtime = MockRuntime::new();
        runtime.add_container(Container::new("c1", "web"));
        runtime.fail_lookup("c2");

        let container = runtime.get_container(&ContainerId::new("c1")).await.unwrap();
        assert_eq!(container.name(), "web");

        let err = runtime.get_container(&ContainerId::new("c2")).await.unwrap_err();
        assert!(matches!(err, HookError::Runtime(RuntimeError::CliError(_))));

        let err = runtime.get_container(&ContainerId::new("c3")).await.unwrap_err();
        assert!(matches!(
            err,
            HookError::Runtime(RuntimeError::ContainerNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_exec_responses() {
        let runtime = MockRuntime::new();
        runtime.set_response("slow", MockExecResponse::timeout());
        runtime.set_response("skip", MockExecResponse::exit_code(EX_TEMPFAIL));
        let command = vec!["true".to_string()];

        assert!(runtime
            .execute_command(&ContainerId::new("ok"), &command, Duration::ZERO)
            .await
            .is_ok());

        let err = runtime
            .execute_command(&ContainerId::new("slow"), &command, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        let err = runtime
            .execute_command(&ContainerId::new("skip"), &command, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.skip_update_requested());

        let history = runtime.exec_history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].timeout, Duration::from_secs(5));
    }

    /// Exec against a shell script standing in for the runtime CLI
    #[cfg(unix)]
    mod cli_exec {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::PathBuf;
        use std::time::Instant;
        use tempfile::TempDir;

        // Invoked as `exec <id> <seconds> [exit code]`
        const SLEEPY_RUNTIME: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
sleep "$3"
echo "slept $3" > "$dir/finished"
if [ "${4:-0}" != 0 ]; then
  echo "hook failed" >&2
fi
exit "${4:-0}"
"#;

        fn sleepy_runtime() -> (TempDir, CliRuntime) {
            let dir = TempDir::new().unwrap();
            let script = dir.path().join("docker");
            fs::write(&script, SLEEPY_RUNTIME).unwrap();
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
            let runtime = CliRuntime::with_runtime_path(script.to_string_lossy().into_owned());
            (dir, runtime)
        }

        fn marker(dir: &TempDir) -> PathBuf {
            dir.path().join("finished")
        }

        fn args(args: &[&str]) -> Vec<String> {
            args.iter().map(|arg| arg.to_string()).collect()
        }

        #[tokio::test]
        async fn test_exec_timeout_kills_client() {
            let (dir, runtime) = sleepy_runtime();
            let started = Instant::now();

            let err = runtime
                .execute_command(
                    &ContainerId::new("c1"),
                    &args(&["1"]),
                    Duration::from_millis(200),
                )
                .await
                .unwrap_err();

            assert!(err.is_timeout(), "unexpected error: {:?}", err);
            assert!(matches!(
                err,
                HookError::Runtime(RuntimeError::ExecTimeout { timeout })
                    if timeout == Duration::from_millis(200)
            ));
            assert!(started.elapsed() < Duration::from_secs(1));

            // The killed client never gets to write its marker
            tokio::time::sleep(Duration::from_millis(1500)).await;
            assert!(!marker(&dir).exists());
        }

        #[tokio::test]
        async fn test_exec_zero_timeout_waits_for_completion() {
            let (dir, runtime) = sleepy_runtime();

            runtime
                .execute_command(&ContainerId::new("c1"), &args(&["1"]), Duration::ZERO)
                .await
                .unwrap();

            assert!(marker(&dir).exists());
        }

        #[tokio::test]
        async fn test_exec_non_zero_exit() {
            let (_dir, runtime) = sleepy_runtime();

            let err = runtime
                .execute_command(
                    &ContainerId::new("c1"),
                    &args(&["0", "3"]),
                    Duration::from_secs(5),
                )
                .await
                .unwrap_err();

            match err {
                HookError::Runtime(RuntimeError::ExecFailed { code, stderr }) => {
                    assert_eq!(code, 3);
                    assert_eq!(stderr, "hook failed");
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_exec_tempfail_requests_skip() {
            let (_dir, runtime) = sleepy_runtime();
            let exit_code = EX_TEMPFAIL.to_string();

            let err = runtime
                .execute_command(
                    &ContainerId::new("c1"),
                    &args(&["0", &exit_code]),
                    Duration::from_secs(5),
                )
                .await
                .unwrap_err();

            assert!(err.skip_update_requested());
        }
    }
}
