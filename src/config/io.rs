//! Configuration file I/O operations

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use super::Config;

/// Default configuration content written by `init`
pub const DEFAULT_CONFIG: &str = r#"# Portal engagement configuration
# ===============================

# ============================================================================
# SESSION - Active-time tracking
# ============================================================================
#
#   tick_interval_secs   - How often completed blocks are credited (default: 60)
#   save_interval_secs   - How often the recovery checkpoint is saved (default: 30)
#   credit_block_minutes - Portal time is credited in whole blocks (default: 5)
#   points_per_block     - Points per credited block (default: 1)
#   max_gap_minutes      - Older checkpoints are discarded on start (default: 30)
#   recovery_cap_minutes - Most time a recovery can credit (default: 30)

[session]
tick_interval_secs = 60
save_interval_secs = 30
credit_block_minutes = 5
points_per_block = 1
max_gap_minutes = 30
recovery_cap_minutes = 30

# ============================================================================
# POINTS - Value of each activity
# ============================================================================
#
# Joining a meeting on time (within 15 minutes) is worth more than joining
# early (15+ minutes before the start).

[points]
daily_login = 10
meeting_early = 30
meeting_on_time = 50
meeting_late = 20
project_created = 25
project_updated = 5
evaluation_submitted = 20
paper_read = 5
paper_submitted = 40
database_write = 2
half_hour_bonus = 10
hour_bonus = 25

# [storage]
# database_path = "/path/to/engagement.db"
# checkpoint_path = "/path/to/session.json"
"#;

impl Config {
    /// Get the global config directory path (~/.portal-engagement/)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".portal-engagement")
    }

    /// Get the global config file path (~/.portal-engagement/config.toml)
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `path` if given, else the global config file.
    /// A missing global file yields defaults; a missing explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let global_path = Self::global_config_path();
        if global_path.exists() {
            Self::from_file(&global_path)
        } else {
            tracing::debug!("No config at {}, using defaults", global_path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to a file with atomic write and file locking.
    ///
    /// 1. Exclusive lock prevents concurrent writers
    /// 2. Atomic write (temp file + rename) prevents corruption on crash
    /// 3. Parent directory is created if needed
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;
        write_locked(path, content.as_bytes())
    }
}

/// Lock-protected atomic file replacement
pub(crate) fn write_locked(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    // Lock file is separate from the target so the rename cannot drop the lock
    let lock_path = path.with_extension(lock_extension(path));
    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

    lock_file
        .lock_exclusive()
        .with_context(|| format!("Failed to acquire lock: {}", lock_path.display()))?;

    let temp_path = path.with_extension(temp_extension(path));
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

    temp_file
        .write_all(content)
        .with_context(|| format!("Failed to write: {}", temp_path.display()))?;

    temp_file
        .sync_all()
        .with_context(|| format!("Failed to sync: {}", temp_path.display()))?;

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename into place: {}", path.display()))?;

    Ok(())
}

fn lock_extension(path: &Path) -> String {
    suffixed_extension(path, "lock")
}

fn temp_extension(path: &Path) -> String {
    suffixed_extension(path, "tmp")
}

fn suffixed_extension(path: &Path, suffix: &str) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{ext}.{suffix}"),
        None => suffix.to_string(),
    }
}
