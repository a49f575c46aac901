//! Logging initialization
//!
//! Installs a `tracing-subscriber` registry with either text or JSON
//! formatting, selected at runtime via arguments and environment variables.
//! All logging output goes to stderr so stdout stays free for command output.

use anyhow::Result;
use std::{io, sync::Once};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable selecting the log format ("json" or "text")
pub const LOG_FORMAT_ENV_VAR: &str = "TOWERHOOK_LOG_FORMAT";

/// Environment variable holding the log filter directive
pub const LOG_FILTER_ENV_VAR: &str = "TOWERHOOK_LOG";

/// Initialize the logging system with an optional format
///
/// Subsequent calls are no-ops.
///
/// ## Arguments
///
/// * `format` - `None` or `"text"` for human-readable output, `"json"` for
///   one JSON object per event. Any other value falls back to text.
///
/// ## Environment Variables
///
/// * `TOWERHOOK_LOG_FORMAT` - used when `format` is `None`
/// * `TOWERHOOK_LOG` - filter directive (e.g. `towerhook_core=debug`)
/// * `RUST_LOG` - fallback filter directive
pub fn init(format: Option<&str>) -> Result<()> {
    INIT.call_once(|| {
        let filter = create_env_filter();

        let env_format = std::env::var(LOG_FORMAT_ENV_VAR).ok();
        let effective_format = format.or(env_format.as_deref()).unwrap_or("text");

        match effective_format {
            "json" => {
                tracing_subscriber::registry()
                    .with(
                        fmt::layer()
                            .json()
                            .with_target(true)
                            .with_span_events(fmt::format::FmtSpan::CLOSE)
                            .with_writer(io::stderr),
                    )
                    .with(filter)
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(fmt::layer().with_target(true).with_writer(io::stderr))
                    .with(filter)
                    .init();
            }
        }

        tracing::debug!("Logging initialized with format: {}", effective_format);
    });

    Ok(())
}

/// Create an EnvFilter from `TOWERHOOK_LOG`, then `RUST_LOG`, then `info`
fn create_env_filter() -> EnvFilter {
    if let Ok(spec) = std::env::var(LOG_FILTER_ENV_VAR) {
        EnvFilter::try_new(&spec).unwrap_or_else(|_| {
            eprintln!(
                "Invalid {} specification '{}', using default 'info'",
                LOG_FILTER_ENV_VAR, spec
            );
            EnvFilter::new("info")
        })
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Check if logging has been initialized
pub fn is_initialized() -> bool {
    INIT.is_completed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_init_multiple_calls_safe() {
        let _guard = TEST_MUTEX.lock().unwrap();

        assert!(init(None).is_ok());
        assert!(init(Some("json")).is_ok());
        assert!(init(Some("invalid")).is_ok());
        assert!(is_initialized());
    }

    #[test]
    fn test_env_filter_with_env_vars() {
        let _guard = TEST_MUTEX.lock().unwrap();

        std::env::set_var(LOG_FILTER_ENV_VAR, "towerhook_core=trace");
        let _filter = create_env_filter();

        // Invalid directive falls back to info without panicking
        std::env::set_var(LOG_FILTER_ENV_VAR, "=[invalid");
        let _filter = create_env_filter();

        std::env::remove_var(LOG_FILTER_ENV_VAR);
    }
}
