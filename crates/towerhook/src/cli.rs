use crate::commands::inspect::{execute_inspect, InspectArgs};
use crate::commands::run::{execute_run, RunArgs};
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use towerhook_core::lifecycle::LifecyclePhase;
use towerhook_core::logging::LOG_FILTER_ENV_VAR;
use towerhook_core::runtime::{RuntimeFactory, RuntimeKind};

/// Runtime selection options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum RuntimeOption {
    /// Docker runtime
    Docker,
    /// Podman runtime
    Podman,
}

impl From<RuntimeOption> for RuntimeKind {
    fn from(runtime: RuntimeOption) -> Self {
        match runtime {
            RuntimeOption::Docker => RuntimeKind::Docker,
            RuntimeOption::Podman => RuntimeKind::Podman,
        }
    }
}

/// Lifecycle phase options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PhaseOption {
    /// Before the update check
    PreCheck,
    /// After the update check
    PostCheck,
    /// Before the container is replaced (failures abort)
    PreUpdate,
    /// After the replacement container started (takes the new container ID)
    PostUpdate,
}

impl From<PhaseOption> for LifecyclePhase {
    fn from(phase: PhaseOption) -> Self {
        match phase {
            PhaseOption::PreCheck => LifecyclePhase::PreCheck,
            PhaseOption::PostCheck => LifecyclePhase::PostCheck,
            PhaseOption::PreUpdate => LifecyclePhase::PreUpdate,
            PhaseOption::PostUpdate => LifecyclePhase::PostUpdate,
        }
    }
}

/// Log format options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

/// Log level options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warning and error messages
    Warn,
    /// Informational messages and above
    Info,
    /// Debug messages and above
    Debug,
    /// All messages including trace
    Trace,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// towerhook subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the lifecycle hook of one phase for one container
    #[command(long_about = "Run the lifecycle hook of one phase for one container\n\n\
        Hooks are declared with com.centurylinklabs.watchtower.lifecycle.* labels. \
        A hook is skipped when the container declares no command for the phase, \
        or when the container is stopped or restarting.\n\n\
        Only pre-update failures make this command fail; failures of the other \
        phases are logged. A pre-update hook exiting with code 75 exits with 75.")]
    Run {
        /// Lifecycle phase to run
        #[arg(value_enum)]
        phase: PhaseOption,
        /// Container ID or name (for post-update: the new container's ID)
        container: String,
    },

    /// Show the hooks a container declares without running them
    Inspect {
        /// Container ID or name
        container: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Run container lifecycle hooks around automated updates
#[derive(Debug, Parser)]
#[command(name = "towerhook", version, about)]
pub struct Cli {
    /// Log format (text or json, defaults to text, can be set via TOWERHOOK_LOG_FORMAT env var)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Log level
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Container runtime to use (docker or podman, can be set via TOWERHOOK_RUNTIME env var)
    #[arg(long, global = true, value_enum)]
    pub runtime: Option<RuntimeOption>,

    /// Path to the runtime executable (overrides --runtime)
    #[arg(long, global = true, value_name = "PATH")]
    pub runtime_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub async fn dispatch(self) -> Result<()> {
        let log_format = match self.log_format {
            Some(LogFormat::Text) => Some("text"),
            Some(LogFormat::Json) => Some("json"),
            None => None, // Let logging module check environment variable
        };

        let log_level = self.log_level.as_str();
        if std::env::var_os(LOG_FILTER_ENV_VAR).is_none() && std::env::var_os("RUST_LOG").is_none()
        {
            std::env::set_var(
                "RUST_LOG",
                format!("towerhook={},towerhook_core={}", log_level, log_level),
            );
        }
        towerhook_core::logging::init(log_format)?;
        tracing::debug!("CLI initialized with log level: {}", log_level);

        let kind = RuntimeFactory::detect_runtime(self.runtime.map(Into::into));
        let runtime = RuntimeFactory::create_runtime(kind, self.runtime_path);
        tracing::debug!("Using container runtime: {}", runtime.runtime_path());

        match self.command {
            Commands::Run { phase, container } => {
                execute_run(RunArgs {
                    phase: phase.into(),
                    container,
                    runtime,
                })
                .await
            }
            Commands::Inspect { container, json } => {
                execute_inspect(InspectArgs {
                    container,
                    json,
                    runtime,
                })
                .await
            }
        }
    }
}
