//! Categorized logging for SkillBridge
//!
//! Always logs to the console; also appends to a daily file under the
//! configured log directory. Categories:
//! - ROUTING: which persona(s) answer a message and why
//! - AGENT: reply generation (remote or canned)
//! - SESSION: session lifecycle (create, clear, evict)
//! - COMPLETION: remote API calls, model switches, connection probes
//! - ERROR: failures (remote failures are logged here, then downgraded)

use crate::config::Config;
use crate::error::Result;
use chrono::{Local, Utc};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Days of log files kept by `cleanup_old_logs`
const LOG_RETENTION_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Routing,
    Agent,
    Session,
    Completion,
    Error,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Routing => "ROUTING",
            LogCategory::Agent => "AGENT",
            LogCategory::Session => "SESSION",
            LogCategory::Completion => "COMPLETION",
            LogCategory::Error => "ERROR",
        }
    }
}

/// Today's log file inside `dir`
pub fn log_file_path(dir: &Path) -> PathBuf {
    let today = Local::now().format("%Y-%m-%d").to_string();
    dir.join(format!("skillbridge-{}.log", today))
}

/// Install the global subscriber. `RUST_LOG` overrides the default `info` filter.
///
/// Calling this twice is harmless: the second subscriber is dropped.
pub fn init_logging(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match &config.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file_path(dir))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        log_session(None, "SkillBridge logging initialized");
    }
    Ok(())
}

/// Log a message with category and optional session context
pub fn log(category: LogCategory, session_id: Option<&str>, message: &str) {
    let session = session_id.unwrap_or("-");
    match category {
        LogCategory::Error => {
            tracing::error!(category = category.as_str(), session, "{}", message)
        }
        _ => tracing::info!(category = category.as_str(), session, "{}", message),
    }
}

/// Log a routing decision (which persona, why)
pub fn log_routing(session_id: Option<&str>, message: &str) {
    log(LogCategory::Routing, session_id, message);
}

/// Log a reply generation event
pub fn log_agent(session_id: Option<&str>, message: &str) {
    log(LogCategory::Agent, session_id, message);
}

/// Log a session lifecycle event
pub fn log_session(session_id: Option<&str>, message: &str) {
    log(LogCategory::Session, session_id, message);
}

/// Log a completion API event
pub fn log_completion(session_id: Option<&str>, message: &str) {
    log(LogCategory::Completion, session_id, message);
}

/// Log an error
pub fn log_error(session_id: Option<&str>, message: &str) {
    log(LogCategory::Error, session_id, message);
}

/// Remove log files older than a week. Returns how many were deleted.
pub fn cleanup_old_logs(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - chrono::Duration::days(LOG_RETENTION_DAYS);
    let mut deleted = 0;

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }
        let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };
        let modified: chrono::DateTime<Utc> = modified.into();
        if modified < cutoff && fs::remove_file(&path).is_ok() {
            deleted += 1;
        }
    }

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels() {
        assert_eq!(LogCategory::Routing.as_str(), "ROUTING");
        assert_eq!(LogCategory::Error.as_str(), "ERROR");
    }

    #[test]
    fn log_file_is_dated() {
        let path = log_file_path(Path::new("/var/log/skillbridge"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("skillbridge-"));
        assert!(name.ends_with(".log"));
        assert_eq!(name.len(), "skillbridge-2024-01-01.log".len());
    }

    #[test]
    fn cleanup_keeps_fresh_files() {
        let dir = std::env::temp_dir().join(format!("skillbridge-logs-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(log_file_path(&dir), "fresh\n").unwrap();

        assert_eq!(cleanup_old_logs(&dir).unwrap(), 0);
        assert!(log_file_path(&dir).exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn cleanup_of_missing_dir_is_noop() {
        let dir =
            std::env::temp_dir().join(format!("skillbridge-missing-{}", uuid::Uuid::new_v4()));
        assert_eq!(cleanup_old_logs(&dir).unwrap(), 0);
    }
}
