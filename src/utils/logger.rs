// Logger initialization

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "tablescrub=info,reqwest=warn";

/// Where log output goes
#[derive(Debug, Clone)]
pub enum LogTarget {
    /// Human-readable lines on stderr
    Stderr,
    /// Daily-rotated files in a directory; the terminal belongs to the TUI
    File(PathBuf),
}

/// Default directory for TUI log files
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tablescrub")
        .join("logs")
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
///
/// Keep the returned guard alive for as long as file logging is needed;
/// dropping it flushes the background writer.
pub fn init_logger(target: LogTarget) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    match target {
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
            Ok(None)
        }
        LogTarget::File(dir) => {
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::daily(&dir, "tablescrub.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                )
                .try_init()?;
            Ok(Some(guard))
        }
    }
}
