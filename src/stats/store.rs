//! Store contract for the per-user aggregate and its append-only logs

use async_trait::async_trait;

use super::models::{BadgeLogEntry, FieldUpdate, NewTransaction, PointTransaction, StatField, UserStats};
use crate::error::Result;

/// Durable per-user document store.
///
/// Additive counters must go through [`atomic_increment`](StatsStore::atomic_increment),
/// which implementations back with a native atomic primitive, never read-modify-write,
/// so concurrent writers for the same user never lose updates. Fields written with
/// [`atomic_set_fields`](StatsStore::atomic_set_fields) are last-write-wins.
///
/// Timestamps on appended records are assigned by the store.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Load the user's stats, creating a zero-initialized record if absent
    async fn get_or_create(&self, user_id: &str) -> Result<UserStats>;

    /// Atomically add `delta` to a counter and return the post-increment value.
    /// Creates the record if it does not exist yet.
    async fn atomic_increment(&self, user_id: &str, field: StatField, delta: u64) -> Result<u64>;

    /// Write non-additive fields in a single update
    async fn atomic_set_fields(&self, user_id: &str, updates: &[FieldUpdate]) -> Result<()>;

    /// Append one immutable point transaction
    async fn append_transaction(&self, user_id: &str, txn: NewTransaction) -> Result<PointTransaction>;

    /// Append one immutable badge-award entry
    async fn append_badge_log(
        &self,
        user_id: &str,
        badge_id: &str,
        badge_name: &str,
    ) -> Result<BadgeLogEntry>;

    /// Most recent transactions first
    async fn recent_transactions(&self, user_id: &str, limit: usize) -> Result<Vec<PointTransaction>>;

    /// Badge log in the order badges were earned
    async fn badge_log(&self, user_id: &str) -> Result<Vec<BadgeLogEntry>>;
}
