use std::path::PathBuf;

use anyhow::Context;
use directories::ProjectDirs;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

const LOG_LEVEL_ENV: &str = "MRLENS_LOG_LEVEL";

pub fn log_dir() -> PathBuf {
    match ProjectDirs::from("io", "mrlens", env!("CARGO_PKG_NAME")) {
        Some(p) => p.data_local_dir().to_path_buf(),
        None => PathBuf::from(".").join(".data"),
    }
}

fn filter_directive(rust_log: Option<String>, log_level: Option<String>) -> String {
    rust_log
        .or(log_level)
        .unwrap_or_else(|| format!("{}=info", env!("CARGO_CRATE_NAME")))
}

/// Logs go to a file, stdout belongs to the terminal ui.
pub fn initialize_logging() -> anyhow::Result<PathBuf> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log dir {}", dir.display()))?;
    let log_path = dir.join("mrlens.log");

    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("failed to create log file {}", log_path.display()))?;

    let file_subscriber = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_filter(EnvFilter::new(filter_directive(
            std::env::var("RUST_LOG").ok(),
            std::env::var(LOG_LEVEL_ENV).ok(),
        )));

    tracing_subscriber::registry()
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(log_path)
}

pub fn initialize_panic_handler() {
    std::panic::set_hook(Box::new(move |panic_info| {
        if let Err(e) = crate::tui::restore() {
            tracing::error!("unable to restore terminal: {e:?}");
        }

        #[cfg(not(debug_assertions))]
        {
            use human_panic::{handle_dump, print_msg, Metadata};
            let meta = Metadata {
                version: env!("CARGO_PKG_VERSION").into(),
                name: env!("CARGO_PKG_NAME").into(),
                authors: env!("CARGO_PKG_AUTHORS").replace(':', ", ").into(),
                homepage: env!("CARGO_PKG_HOMEPAGE").into(),
            };

            let file_path = handle_dump(&meta, panic_info);
            if let Err(e) = print_msg(file_path, &meta) {
                eprintln!("failed to print panic report: {e}");
            }
        }

        #[cfg(debug_assertions)]
        eprintln!("{panic_info}");

        tracing::error!("panic: {panic_info}");
    }));
}
