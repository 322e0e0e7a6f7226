//! Tracing setup: a console layer plus an optional JSON-lines file
//! layer driven by the `[logging]` config section.

use crate::cli::{Cli, FILE_GUARD};
use soda_config::Logging;
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

pub fn init(cli: &Cli, logging: &Logging) {
    // RUST_LOG wins over --log-level for the console.
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let file_layer: Option<Box<dyn Layer<Registry> + Send + Sync>> =
        logging.file.as_deref().map(|path| {
        let path = Path::new(path);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("soda.log"));
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);

        let level = logging
            .level
            .clone()
            .unwrap_or_else(|| cli.log_level.clone());
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(EnvFilter::new(level))
            .boxed()
        });

    if cli.json {
        tracing_subscriber::registry()
            .with(file_layer)
            .with(fmt::layer().json().with_filter(console_filter))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(file_layer)
            .with(fmt::layer().with_filter(console_filter))
            .init();
    }
}
