use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::constants::LOG_TARGET_CRATE;

pub fn level_for_verbosity(verbosity: &str) -> Level {
    match verbosity {
        "silent" => Level::ERROR,
        "normal" => Level::INFO,
        "verbose" => Level::DEBUG,
        _ => Level::INFO,
    }
}

/// Installs the global `tracing` subscriber. Logs go to stderr so that
/// reports printed on stdout stay machine-readable.
pub fn setup_logging(verbosity: &str) -> Result<()> {
    let level = level_for_verbosity(verbosity);

    let filter = EnvFilter::from_default_env().add_directive(
        format!("{}={}", LOG_TARGET_CRATE, level.as_str().to_lowercase()).parse()?,
    );

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
