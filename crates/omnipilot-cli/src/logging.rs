use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::OmniPilotToml;
use crate::home::LOG_FILE_NAME;

/// Installs the file logger at `<conf_dir>/omnipilot.log`. `RUST_LOG` wins
/// over the configured level. Failures are reported and otherwise ignored.
pub fn init_tracing(conf_dir: &Path, config: &OmniPilotToml) {
    static TRACE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

    if let Err(error) = std::fs::create_dir_all(conf_dir) {
        eprintln!(
            "warning: failed to create log dir {}: {error}",
            conf_dir.display()
        );
        return;
    }

    let appender = tracing_appender::rolling::never(conf_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let _ = TRACE_GUARD.set(guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking);

    let init_result = if config.log.stdout {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .try_init()
    };
    if let Err(error) = init_result {
        eprintln!(
            "warning: failed to initialize tracing subscriber for {}: {error}",
            conf_dir.join(LOG_FILE_NAME).display()
        );
    }
}
