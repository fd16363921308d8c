//! Configuration loading and management

mod io;
mod settings;

pub use io::DEFAULT_CONFIG;
pub(crate) use io::write_locked;
pub use settings::{PointSettings, SessionSettings, StorageSettings};

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Session tracker timing and crediting
    #[serde(default)]
    pub session: SessionSettings,

    /// Point values per activity
    #[serde(default)]
    pub points: PointSettings,

    /// Database and checkpoint locations
    #[serde(default)]
    pub storage: StorageSettings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [points]
            daily_login = 15

            [session]
            recovery_cap_minutes = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.points.daily_login, 15);
        assert_eq!(config.points.meeting_on_time, 50);
        assert_eq!(config.session.recovery_cap_minutes, 20);
        assert_eq!(config.session.credit_block_minutes, 5);
        assert_eq!(config.session.tick_interval_secs, 60);
    }

    #[test]
    fn test_default_config_template_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.session.save_interval_secs, 30);
        assert_eq!(config.points.hour_bonus, 25);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.points.paper_read = 7;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.points.paper_read, 7);
        assert!(!path.with_extension("toml.tmp").exists());
    }
}
