//! Runtime configuration for the CLI process.
//!
//! Flags win over environment variables; clap resolves both. Anything left
//! unset falls back to the defaults below.

use crate::cli::GlobalArgs;
use marginalia_core::db::DbOptions;
use marginalia_core::{
    default_log_level, init_logging, init_stderr_logging, SqliteDocumentStore, StoreResult,
};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DB_FILE: &str = "marginalia.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub busy_timeout_ms: u64,
}

impl CliConfig {
    pub fn resolve(args: &GlobalArgs) -> Self {
        Self {
            db_path: args
                .db_path
                .clone()
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE)),
            log_level: args
                .log_level
                .clone()
                .unwrap_or_else(|| default_log_level().to_string()),
            log_dir: args
                .log_dir
                .clone()
                .filter(|dir| !dir.trim().is_empty()),
            busy_timeout_ms: args.busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }

    /// Starts file logging when a directory is configured, stderr otherwise.
    pub fn init_logging(&self) -> Result<(), String> {
        match &self.log_dir {
            Some(dir) => init_logging(&self.log_level, dir),
            None => init_stderr_logging(&self.log_level),
        }
    }

    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }

    pub fn open_store(&self) -> StoreResult<SqliteDocumentStore> {
        SqliteDocumentStore::open(&self.db_path, self.db_options())
    }
}

#[cfg(test)]
mod tests {
    use super::{CliConfig, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_DB_FILE};
    use crate::cli::GlobalArgs;
    use marginalia_core::default_log_level;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn unset_values_fall_back_to_defaults() {
        let config = CliConfig::resolve(&GlobalArgs::default());
        assert_eq!(config.db_path, std::env::temp_dir().join(DEFAULT_DB_FILE));
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.log_dir, None);
        assert_eq!(config.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
    }

    #[test]
    fn explicit_values_are_kept() {
        let config = CliConfig::resolve(&GlobalArgs {
            db_path: Some(PathBuf::from("/var/lib/marginalia/db.sqlite3")),
            log_level: Some("warn".to_string()),
            log_dir: Some("/var/log/marginalia".to_string()),
            busy_timeout_ms: Some(250),
        });
        assert_eq!(config.db_path, PathBuf::from("/var/lib/marginalia/db.sqlite3"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir.as_deref(), Some("/var/log/marginalia"));
        assert_eq!(config.db_options().busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn blank_log_dir_means_stderr() {
        let config = CliConfig::resolve(&GlobalArgs {
            log_dir: Some("  ".to_string()),
            ..GlobalArgs::default()
        });
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn open_store_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::resolve(&GlobalArgs {
            db_path: Some(dir.path().join("cli.sqlite3")),
            ..GlobalArgs::default()
        });
        config.open_store().unwrap();
        assert!(config.db_path.exists());
    }
}
