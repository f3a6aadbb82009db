use crate::config::LoggingConfig;
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default directory for rotated log files: `~/.tensor-runtime/logs`
pub fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tensor-runtime")
        .join("logs")
}

/// Initialize site logging from configuration
///
/// - Stdout with compact formatting
/// - Daily rotating `runtime.log` when `log_to_file` is set
/// - RUST_LOG overrides the configured level
pub fn init_production_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if !config.log_to_file {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_target(false)
                    .with_line_number(false),
            )
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
        return Ok(());
    }

    let log_dir = config.log_dir.clone().unwrap_or_else(default_log_dir);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "runtime.log");

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false) // No colors in log files
                .with_target(true)
                .with_line_number(true),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(false)
                .with_line_number(false),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        "Site logging initialized"
    );

    Ok(())
}

/// Initialize stdout-only logging (tests, embedding hosts)
pub fn init_simple_logging(level: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(false)
                .with_line_number(false),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // Whichever call wins installs the global subscriber; the other must
        // report an error instead of panicking.
        let first = init_simple_logging("warn");
        let second = init_simple_logging("warn");
        assert!(first.is_err() || second.is_err());
    }

    #[test]
    fn test_file_logging_creates_log_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let log_dir = temp.path().join("site-0").join("logs");
        let config = LoggingConfig {
            log_to_file: true,
            log_dir: Some(log_dir.clone()),
            ..LoggingConfig::default()
        };

        // Another test may already own the global subscriber, so only the
        // directory setup is guaranteed to have happened.
        let result = init_production_logging(&config);
        assert!(log_dir.is_dir());
        if let Err(e) = result {
            assert!(e.to_string().starts_with("Failed to initialize logging"));
        }
    }

    #[test]
    fn test_default_log_dir() {
        assert!(default_log_dir().ends_with(".tensor-runtime/logs"));
    }
}
