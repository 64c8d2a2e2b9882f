//! Logging system initialization
//!
//! Sets up tracing-based logging with file output to
//! `<config dir>/hapticbind/app.log`. The previous sessions' logs are rotated
//! on startup, keeping 9 of them next to the current one.

use crate::config::ConfigManager;
use crate::error::{HapticError, Result, StringError};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt};

/// Maximum number of historical log files to keep (app.log.1 through app.log.9)
const MAX_LOG_FILES: u8 = 9;

/// Log file name inside the log directory
const LOG_FILE_NAME: &str = "app.log";

/// Filter used when `RUST_LOG` is not set
///
/// The Buttplug client logs every message exchange at info level.
const DEFAULT_FILTER: &str = "info,buttplug=warn";

/// Initialize the logging system in the application's config directory
///
/// The returned guard flushes buffered log lines when dropped; keep it alive
/// for the lifetime of the process.
pub fn init_logging() -> Result<WorkerGuard> {
    init_logging_in(&ConfigManager::get_config_dir())
}

/// Initialize the logging system writing to `log_dir/app.log`
pub fn init_logging_in(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    rotate_logs_on_startup(&log_dir.join(LOG_FILE_NAME))?;

    // Rotation is done above, once per session, so the appender never rolls
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("app")
        .filename_suffix("log")
        .build(log_dir)
        .map_err(|e| HapticError::ConfigError(Box::new(e)))?;
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = fmt()
        .with_writer(writer)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| HapticError::ConfigError(Box::new(e)))?;

    tracing::info!("hapticbind v{} started", env!("CARGO_PKG_VERSION"));
    tracing::info!("Logging to {}", log_dir.join(LOG_FILE_NAME).display());

    Ok(guard)
}

/// Shift `app.log` to `app.log.1`, `app.log.1` to `app.log.2` and so on,
/// dropping the oldest beyond [`MAX_LOG_FILES`]
///
/// Runs on every startup regardless of size, so each session keeps its own
/// file.
fn rotate_logs_on_startup(log_path: &Path) -> Result<()> {
    if !log_path.exists() {
        return Ok(());
    }

    let (Some(log_dir), Some(log_name)) = (log_path.parent(), log_path.file_name()) else {
        return Err(HapticError::ConfigError(StringError::new(format!(
            "Invalid log path {}",
            log_path.display()
        ))));
    };
    let log_name = log_name.to_string_lossy();
    let numbered = |i: u8| log_dir.join(format!("{log_name}.{i}"));

    let oldest = numbered(MAX_LOG_FILES);
    if oldest.exists() {
        std::fs::remove_file(&oldest)?;
    }

    for i in (1..MAX_LOG_FILES).rev() {
        let current = numbered(i);
        if current.exists() {
            std::fs::rename(&current, numbered(i + 1))?;
        }
    }

    std::fs::rename(log_path, numbered(1))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_dir;
    use std::fs;

    fn session(dir: &Path, content: &str) {
        fs::write(dir.join(LOG_FILE_NAME), content).unwrap();
        rotate_logs_on_startup(&dir.join(LOG_FILE_NAME)).unwrap();
    }

    fn read(dir: &Path, name: &str) -> String {
        fs::read_to_string(dir.join(name)).unwrap()
    }

    #[test]
    fn test_rotation_moves_current_log() {
        let dir = create_test_dir();
        session(dir.path(), "first");

        assert_eq!(read(dir.path(), "app.log.1"), "first");
        assert!(!dir.path().join(LOG_FILE_NAME).exists());
    }

    #[test]
    fn test_rotation_orders_sessions_newest_first() {
        let dir = create_test_dir();
        for i in 1..=4 {
            session(dir.path(), &format!("session {i}"));
        }

        assert_eq!(read(dir.path(), "app.log.1"), "session 4");
        assert_eq!(read(dir.path(), "app.log.4"), "session 1");
    }

    #[test]
    fn test_rotation_caps_history() {
        let dir = create_test_dir();
        for i in 1..=12 {
            session(dir.path(), &format!("session {i}"));
        }

        assert_eq!(read(dir.path(), "app.log.1"), "session 12");
        assert_eq!(read(dir.path(), "app.log.9"), "session 4");
        assert!(!dir.path().join("app.log.10").exists());
    }

    #[test]
    fn test_rotation_without_log_is_noop() {
        let dir = create_test_dir();
        rotate_logs_on_startup(&dir.path().join(LOG_FILE_NAME)).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_rotation_with_gaps() {
        let dir = create_test_dir();
        fs::write(dir.path().join("app.log.1"), "previous").unwrap();
        fs::write(dir.path().join("app.log.5"), "old").unwrap();
        session(dir.path(), "current");

        assert_eq!(read(dir.path(), "app.log.1"), "current");
        assert_eq!(read(dir.path(), "app.log.2"), "previous");
        assert_eq!(read(dir.path(), "app.log.6"), "old");
    }
}
