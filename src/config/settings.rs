//! Settings configuration types

use std::path::PathBuf;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::Config;

/// Session tracking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// How often the running tracker checks for completed credit blocks
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// How often the checkpoint is saved regardless of crediting.
    /// Bounds unsaved progress on an ungraceful exit.
    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: u64,

    /// Portal time is credited only in whole blocks of this many minutes
    #[serde(default = "default_credit_block_minutes")]
    pub credit_block_minutes: u32,

    /// Points per credited block
    #[serde(default = "default_points_per_block")]
    pub points_per_block: u32,

    /// A checkpoint saved longer ago than this is discarded on start
    #[serde(default = "default_max_gap_minutes")]
    pub max_gap_minutes: u32,

    /// Upper bound on the time credited during recovery
    #[serde(default = "default_recovery_cap_minutes")]
    pub recovery_cap_minutes: u32,
}

impl SessionSettings {
    pub fn credit_block(&self) -> Duration {
        Duration::minutes(self.credit_block_minutes.max(1) as i64)
    }

    pub fn max_gap(&self) -> Duration {
        Duration::minutes(self.max_gap_minutes as i64)
    }

    pub fn recovery_cap(&self) -> Duration {
        Duration::minutes(self.recovery_cap_minutes as i64)
    }
}

fn default_tick_interval_secs() -> u64 {
    60
}

fn default_save_interval_secs() -> u64 {
    30
}

fn default_credit_block_minutes() -> u32 {
    5
}

fn default_points_per_block() -> u32 {
    1
}

fn default_max_gap_minutes() -> u32 {
    30
}

fn default_recovery_cap_minutes() -> u32 {
    30
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            save_interval_secs: default_save_interval_secs(),
            credit_block_minutes: default_credit_block_minutes(),
            points_per_block: default_points_per_block(),
            max_gap_minutes: default_max_gap_minutes(),
            recovery_cap_minutes: default_recovery_cap_minutes(),
        }
    }
}

/// Point values per activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointSettings {
    #[serde(default = "default_daily_login")]
    pub daily_login: u32,

    /// Joined 15 or more minutes before the scheduled start
    #[serde(default = "default_meeting_early")]
    pub meeting_early: u32,

    /// Joined within 15 minutes of the scheduled start.
    /// Intentionally worth more than joining early.
    #[serde(default = "default_meeting_on_time")]
    pub meeting_on_time: u32,

    #[serde(default = "default_meeting_late")]
    pub meeting_late: u32,

    #[serde(default = "default_project_created")]
    pub project_created: u32,

    #[serde(default = "default_project_updated")]
    pub project_updated: u32,

    #[serde(default = "default_evaluation_submitted")]
    pub evaluation_submitted: u32,

    #[serde(default = "default_paper_read")]
    pub paper_read: u32,

    #[serde(default = "default_paper_submitted")]
    pub paper_submitted: u32,

    #[serde(default = "default_database_write")]
    pub database_write: u32,

    /// Bonus when credited portal time reaches a multiple of 30 minutes
    #[serde(default = "default_half_hour_bonus")]
    pub half_hour_bonus: u32,

    /// Bonus when credited portal time reaches a multiple of 60 minutes
    #[serde(default = "default_hour_bonus")]
    pub hour_bonus: u32,
}

fn default_daily_login() -> u32 {
    10
}

fn default_meeting_early() -> u32 {
    30
}

fn default_meeting_on_time() -> u32 {
    50
}

fn default_meeting_late() -> u32 {
    20
}

fn default_project_created() -> u32 {
    25
}

fn default_project_updated() -> u32 {
    5
}

fn default_evaluation_submitted() -> u32 {
    20
}

fn default_paper_read() -> u32 {
    5
}

fn default_paper_submitted() -> u32 {
    40
}

fn default_database_write() -> u32 {
    2
}

fn default_half_hour_bonus() -> u32 {
    10
}

fn default_hour_bonus() -> u32 {
    25
}

impl Default for PointSettings {
    fn default() -> Self {
        Self {
            daily_login: default_daily_login(),
            meeting_early: default_meeting_early(),
            meeting_on_time: default_meeting_on_time(),
            meeting_late: default_meeting_late(),
            project_created: default_project_created(),
            project_updated: default_project_updated(),
            evaluation_submitted: default_evaluation_submitted(),
            paper_read: default_paper_read(),
            paper_submitted: default_paper_submitted(),
            database_write: default_database_write(),
            half_hour_bonus: default_half_hour_bonus(),
            hour_bonus: default_hour_bonus(),
        }
    }
}

/// Storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite database path (default: ~/.portal-engagement/engagement.db)
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Session checkpoint file (default: ~/.portal-engagement/session.json)
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,
}

fn default_database_path() -> PathBuf {
    Config::global_config_dir().join("engagement.db")
}

fn default_checkpoint_path() -> PathBuf {
    Config::global_config_dir().join("session.json")
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            checkpoint_path: default_checkpoint_path(),
        }
    }
}
