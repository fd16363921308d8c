//! Badge evaluation against the stored aggregate

use std::sync::Arc;

use super::checker::newly_earned;
use super::definitions::Badge;
use crate::error::Result;
use crate::stats::{FieldUpdate, StatsStore};

/// Evaluates the badge catalog and records newly earned badges
#[derive(Clone)]
pub struct BadgeEngine {
    store: Arc<dyn StatsStore>,
}

impl BadgeEngine {
    pub fn new(store: Arc<dyn StatsStore>) -> Self {
        Self { store }
    }

    /// Evaluate all badges the user does not hold yet.
    ///
    /// Appends one log entry per newly earned badge, then merges all new IDs
    /// into the badge set with a single update. Running it again without a
    /// stat change writes nothing.
    pub async fn evaluate(&self, user_id: &str) -> Result<Vec<&'static Badge>> {
        let stats = self.store.get_or_create(user_id).await?;
        let earned = newly_earned(&stats);
        if earned.is_empty() {
            return Ok(earned);
        }

        for badge in &earned {
            self.store
                .append_badge_log(user_id, badge.id.as_str(), badge.name)
                .await?;
            tracing::info!("🏅 {} earned badge {} ({})", user_id, badge.name, badge.id.as_str());
        }

        let ids = earned.iter().map(|b| b.id.as_str().to_string()).collect();
        self.store
            .atomic_set_fields(user_id, &[FieldUpdate::MergeBadges(ids)])
            .await?;

        Ok(earned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::stats::{MemoryStatsStore, StatField};

    #[tokio::test]
    async fn test_evaluate_twice_is_idempotent() {
        let store = MemoryStatsStore::new(Arc::new(SystemClock));
        store
            .atomic_increment("alice", StatField::EvaluationsSubmitted, 1)
            .await
            .unwrap();
        let engine = BadgeEngine::new(Arc::new(store.clone()));

        let first = engine.evaluate("alice").await.unwrap();
        assert_eq!(first.len(), 1);
        let after_first = store.get_or_create("alice").await.unwrap();

        let second = engine.evaluate("alice").await.unwrap();
        assert!(second.is_empty());

        let after_second = store.get_or_create("alice").await.unwrap();
        assert_eq!(after_first.badges, after_second.badges);
        assert_eq!(store.badge_log("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_error() {
        let store = MemoryStatsStore::new(Arc::new(SystemClock));
        store
            .atomic_increment("alice", StatField::PapersSubmitted, 1)
            .await
            .unwrap();
        store.set_fail_writes(true);

        let engine = BadgeEngine::new(Arc::new(store.clone()));
        assert!(engine.evaluate("alice").await.is_err());
        assert!(store.get_or_create("alice").await.unwrap().badges.is_empty());
    }
}
