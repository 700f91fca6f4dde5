// src/utils/logging.rs

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Installs the global subscriber: stdout plus a daily-rolling file under `log_dir`.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the process.
pub fn init_tracing(config: &Config) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

/// Logs the rolled-up category tree, one line per root.
pub fn log_bank_summary(roots: &[crate::models::category::Category], hot_questions: usize) {
    tracing::info!("Question bank has {} root categories", roots.len());
    for root in roots {
        tracing::info!(
            "  {} (#{}) - {} questions, {} sub-categories",
            root.name,
            root.id,
            root.count,
            root.children.len()
        );
    }
    tracing::info!("Hot question list currently resolves {} questions", hot_questions);
}
