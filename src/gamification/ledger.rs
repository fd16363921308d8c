//! Points ledger: credit points, record the transaction, re-check badges

use std::sync::Arc;

use serde_json::Value;

use super::badges::{Badge, BadgeEngine};
use crate::error::{EngagementError, Result};
use crate::identity::AuthContext;
use crate::stats::{NewTransaction, PointTransaction, StatField, StatsStore};

/// What a successful award did
#[derive(Debug, Clone)]
pub struct AwardReceipt {
    pub transaction: PointTransaction,
    /// total_points after the increment
    pub total_points: u64,
    pub new_badges: Vec<&'static Badge>,
}

/// Orchestrates point awards.
///
/// Delivery is at-least-once: there is no idempotency key, so a retried
/// call credits the points again.
#[derive(Clone)]
pub struct PointsLedger {
    store: Arc<dyn StatsStore>,
    badges: BadgeEngine,
    auth: Arc<dyn AuthContext>,
}

impl PointsLedger {
    pub fn new(store: Arc<dyn StatsStore>, auth: Arc<dyn AuthContext>) -> Self {
        Self {
            badges: BadgeEngine::new(store.clone()),
            store,
            auth,
        }
    }

    pub fn badges(&self) -> &BadgeEngine {
        &self.badges
    }

    /// Check that `user_id` is the signed-in user (client-side check only)
    pub fn authorize(&self, user_id: &str) -> Result<()> {
        let current = self
            .auth
            .current_user_id()
            .ok_or(EngagementError::Unauthenticated)?;
        if current != user_id {
            return Err(EngagementError::IdentityMismatch {
                requested: user_id.to_string(),
                current,
            });
        }
        Ok(())
    }

    /// Check that someone is signed in (read models may show other users)
    pub fn authorize_any(&self) -> Result<String> {
        self.auth
            .current_user_id()
            .ok_or(EngagementError::Unauthenticated)
    }

    /// Award points, surfacing any failure.
    ///
    /// The increment and the ledger append must both succeed. A badge
    /// evaluation failure afterwards is logged and does not fail the award.
    pub async fn try_award(
        &self,
        user_id: &str,
        points: u32,
        reason: &str,
        metadata: Value,
    ) -> Result<AwardReceipt> {
        if points == 0 {
            return Err(EngagementError::InvalidPoints(points));
        }
        self.authorize(user_id)?;

        self.store.get_or_create(user_id).await?;
        let total_points = self
            .store
            .atomic_increment(user_id, StatField::TotalPoints, points as u64)
            .await?;
        let transaction = self
            .store
            .append_transaction(
                user_id,
                NewTransaction {
                    points,
                    reason: reason.to_string(),
                    metadata,
                },
            )
            .await?;

        tracing::info!("+{} points for {}: {} (total {})", points, user_id, reason, total_points);

        let new_badges = match self.badges.evaluate(user_id).await {
            Ok(badges) => badges,
            Err(e) => {
                tracing::warn!("Badge evaluation failed for {}: {}", user_id, e);
                Vec::new()
            }
        };

        Ok(AwardReceipt {
            transaction,
            total_points,
            new_badges,
        })
    }

    /// Award points without ever failing the caller.
    ///
    /// Returns `false` on any failure; failures are logged, not propagated.
    pub async fn award(&self, user_id: &str, points: u32, reason: &str, metadata: Value) -> bool {
        match self.try_award(user_id, points, reason, metadata).await {
            Ok(_) => true,
            Err(EngagementError::Unauthenticated) => {
                tracing::debug!("Skipping award '{}': no authenticated user", reason);
                false
            }
            Err(e) => {
                tracing::warn!("Failed to award {} points to {} ({}): {}", points, user_id, reason, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::identity::StaticIdentity;
    use crate::stats::MemoryStatsStore;
    use serde_json::json;

    fn ledger_for(user: Option<&str>) -> (PointsLedger, MemoryStatsStore) {
        let store = MemoryStatsStore::new(Arc::new(SystemClock));
        let identity = match user {
            Some(u) => StaticIdentity::signed_in(u),
            None => StaticIdentity::signed_out(),
        };
        (
            PointsLedger::new(Arc::new(store.clone()), Arc::new(identity)),
            store,
        )
    }

    #[tokio::test]
    async fn test_award_increments_and_appends() {
        let (ledger, store) = ledger_for(Some("alice"));

        let receipt = ledger
            .try_award("alice", 25, "Project created", json!({ "projectId": "p1" }))
            .await
            .unwrap();

        assert_eq!(receipt.total_points, 25);
        assert_eq!(receipt.transaction.points, 25);
        assert_eq!(receipt.transaction.metadata["projectId"], "p1");
        assert_eq!(store.transactions("alice").len(), 1);
        assert_eq!(store.get_or_create("alice").await.unwrap().total_points, 25);
    }

    #[tokio::test]
    async fn test_retried_award_double_credits() {
        let (ledger, store) = ledger_for(Some("alice"));

        assert!(ledger.award("alice", 10, "Daily login", Value::Null).await);
        assert!(ledger.award("alice", 10, "Daily login", Value::Null).await);

        assert_eq!(store.get_or_create("alice").await.unwrap().total_points, 20);
        assert_eq!(store.transactions("alice").len(), 2);
    }

    #[tokio::test]
    async fn test_rejects_zero_points_and_other_users() {
        let (ledger, store) = ledger_for(Some("alice"));

        assert!(matches!(
            ledger.try_award("alice", 0, "Nothing", Value::Null).await,
            Err(EngagementError::InvalidPoints(0))
        ));
        assert!(matches!(
            ledger.try_award("mallory", 5, "Sneaky", Value::Null).await,
            Err(EngagementError::IdentityMismatch { .. })
        ));
        assert!(store.transactions("alice").is_empty());
        assert!(store.transactions("mallory").is_empty());
    }

    #[tokio::test]
    async fn test_signed_out_award_is_noop() {
        let (ledger, store) = ledger_for(None);
        assert!(!ledger.award("alice", 5, "Paper read", Value::Null).await);
        assert!(store.transactions("alice").is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_returns_false() {
        let (ledger, store) = ledger_for(Some("alice"));
        store.set_fail_writes(true);

        assert!(!ledger.award("alice", 5, "Paper read", Value::Null).await);
        assert!(matches!(
            ledger.try_award("alice", 5, "Paper read", Value::Null).await,
            Err(EngagementError::Store(_))
        ));

        store.set_fail_writes(false);
        assert_eq!(store.get_or_create("alice").await.unwrap().total_points, 0);
    }

    #[tokio::test]
    async fn test_award_crossing_threshold_earns_badge() {
        let (ledger, store) = ledger_for(Some("alice"));

        let receipt = ledger
            .try_award("alice", 100, "Bonus", Value::Null)
            .await
            .unwrap();

        assert_eq!(receipt.new_badges.len(), 1);
        assert_eq!(receipt.new_badges[0].id.as_str(), "points_100");
        assert!(store
            .get_or_create("alice")
            .await
            .unwrap()
            .badges
            .contains("points_100"));
    }
}
