//! Tracing setup for the command line.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "keymaster=debug,keymaster_core=debug"
    } else {
        "keymaster=info,keymaster_core=info"
    }
}

/// Install the global subscriber: stderr always, plus daily files under `log_dir`.
///
/// The returned guard flushes the file writer and must live until exit.
pub fn init_logging(verbose: bool, log_dir: Option<&str>) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose).into());

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_guard, file_layer) = match log_dir {
        Some(log_dir) => {
            if let Err(e) = std::fs::create_dir_all(log_dir) {
                eprintln!("Failed to create log directory {}: {}", log_dir, e);
                (None, None)
            } else {
                match rolling::RollingFileAppender::builder()
                    .rotation(rolling::Rotation::DAILY)
                    .filename_prefix("keymaster")
                    .filename_suffix("log")
                    .build(log_dir)
                {
                    Ok(file_appender) => {
                        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                        let layer = tracing_subscriber::fmt::layer()
                            .with_writer(non_blocking)
                            .with_ansi(false);
                        (Some(guard), Some(layer))
                    }
                    Err(e) => {
                        eprintln!("Failed to create log file in {}: {}", log_dir, e);
                        (None, None)
                    }
                }
            }
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer);
    if let Some(layer) = file_layer {
        registry.with(layer).init();
    } else {
        registry.init();
    }

    file_guard
}
