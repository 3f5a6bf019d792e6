// SPDX-License-Identifier: Apache-2.0

//! Logging and observability helpers.

use std::fs;
use std::path::Path;

use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "querygate.log";
const DEFAULT_FILTER: &str = "querygate=info,tower_http=warn";

/// Installs the global JSON subscriber and a panic hook.
///
/// With a `log_dir` logs go to a daily rolling file there, otherwise to
/// stdout. Calling this twice is harmless: the second subscriber is dropped.
pub fn init_tracing(log_dir: Option<&Path>) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE);

    match log_dir {
        Some(dir) => {
            if let Err(e) = fs::create_dir_all(dir) {
                eprintln!("Failed to create log directory {}: {}", dir.display(), e);
            }
            let file_appender: RollingFileAppender =
                tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let _ = builder.with_writer(file_appender).try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stdout).try_init();
        }
    }

    install_panic_hook();

    match log_dir {
        Some(dir) => tracing::info!("Tracing initialized. Logs directory: {:?}", dir),
        None => tracing::info!("Tracing initialized on stdout"),
    }
}

fn install_panic_hook() {
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let payload = panic_info.payload();
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            format!("PANIC: {}", s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("PANIC: {}", s)
        } else {
            "PANIC: unknown cause".to_string()
        };

        tracing::error!(target: "panic", location = %location, message = %msg, "Gateway panicked");

        // Keep default behavior (stderr) too
        previous_hook(panic_info);
    }));
}
