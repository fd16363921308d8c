//! CLI command implementations

pub mod init;
pub mod record;
pub mod status;
pub mod track;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use portal_engagement::clock::SystemClock;
use portal_engagement::identity::StaticIdentity;
use portal_engagement::stats::SqliteStatsStore;
use portal_engagement::{Config, GamificationEngine};

/// Engine opened against the configured database, signed in as one user
pub struct Portal {
    pub config: Config,
    pub engine: GamificationEngine,
    pub user_id: String,
}

impl Portal {
    pub fn open(config_path: Option<&Path>, user: Option<&str>) -> Result<Self> {
        let Some(user_id) = user.map(str::trim).filter(|u| !u.is_empty()) else {
            bail!("No user given. Pass --user <id>.");
        };

        let config = Config::load(config_path)?;
        let store = SqliteStatsStore::open(&config.storage.database_path).with_context(|| {
            format!(
                "Failed to open stats database: {}",
                config.storage.database_path.display()
            )
        })?;

        let engine = GamificationEngine::new(
            Arc::new(store),
            Arc::new(StaticIdentity::signed_in(user_id)),
            Arc::new(SystemClock),
            config.points.clone(),
        );

        Ok(Self {
            config,
            engine,
            user_id: user_id.to_string(),
        })
    }
}
