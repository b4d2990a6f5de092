//! Logging setup
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (default: `consultorio=info`)
//! - `CONSULTORIO_LOG_FORMAT`: `pretty` (default) or `json`
//! - `CONSULTORIO_LOG_DIR`: also write JSON logs to a daily rolling file there

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "consultorio.log";

/// Install the global subscriber; logs go to stderr so stdout stays clean
///
/// The returned guard flushes the log file and must live until exit.
pub fn init_logging(debug: bool) -> Result<Option<WorkerGuard>> {
    let default_directive = if debug {
        "consultorio=debug"
    } else {
        "consultorio=info"
    };
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !debug => EnvFilter::try_new(directives)?,
        _ => EnvFilter::try_new(default_directive)?,
    };

    let (file_layer, guard) = match std::env::var("CONSULTORIO_LOG_DIR") {
        Ok(dir) => {
            let dir = shellexpand::tilde(&dir).into_owned();
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    let log_format =
        std::env::var("CONSULTORIO_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    // The file layer sits directly on the registry so both arms share its type
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(file_layer)
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(file_layer)
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(guard)
}
