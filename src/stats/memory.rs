//! In-memory stats store
//!
//! Used by tests and embedders that do not need durability. Every call yields
//! to the scheduler once before touching state, the way a network round trip
//! would, so concurrent callers actually interleave.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::models::{BadgeLogEntry, FieldUpdate, NewTransaction, PointTransaction, StatField, UserStats};
use super::store::StatsStore;
use crate::clock::Clock;
use crate::error::{EngagementError, Result};

#[derive(Debug)]
struct UserDocument {
    stats: UserStats,
    transactions: Vec<PointTransaction>,
    badge_log: Vec<BadgeLogEntry>,
}

/// Mutex-protected map of user documents
#[derive(Clone)]
pub struct MemoryStatsStore {
    users: Arc<Mutex<HashMap<String, UserDocument>>>,
    clock: Arc<dyn Clock>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStatsStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            users: Arc::new(Mutex::new(HashMap::new())),
            clock,
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every mutating call fail with a store error (simulates an outage
    /// or a permission-denied response)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of a user's transactions in append order
    pub fn transactions(&self, user_id: &str) -> Vec<PointTransaction> {
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        users
            .get(user_id)
            .map(|doc| doc.transactions.clone())
            .unwrap_or_default()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(EngagementError::Store("store unavailable".to_string()));
        }
        Ok(())
    }

    fn with_document<T>(&self, user_id: &str, f: impl FnOnce(&mut UserDocument) -> T) -> T {
        let now = self.clock.now();
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        let doc = users.entry(user_id.to_string()).or_insert_with(|| UserDocument {
            stats: UserStats::new(user_id, now),
            transactions: Vec::new(),
            badge_log: Vec::new(),
        });
        f(doc)
    }
}

#[async_trait]
impl StatsStore for MemoryStatsStore {
    async fn get_or_create(&self, user_id: &str) -> Result<UserStats> {
        tokio::task::yield_now().await;
        Ok(self.with_document(user_id, |doc| doc.stats.clone()))
    }

    async fn atomic_increment(&self, user_id: &str, field: StatField, delta: u64) -> Result<u64> {
        tokio::task::yield_now().await;
        self.check_writable()?;
        let now = self.clock.now();
        Ok(self.with_document(user_id, |doc| {
            let counter = doc.stats.counter_mut(field);
            *counter = counter.saturating_add(delta);
            let value = *counter;
            doc.stats.updated_at = now;
            value
        }))
    }

    async fn atomic_set_fields(&self, user_id: &str, updates: &[FieldUpdate]) -> Result<()> {
        tokio::task::yield_now().await;
        self.check_writable()?;
        let now = self.clock.now();
        self.with_document(user_id, |doc| {
            for update in updates {
                doc.stats.apply(update);
            }
            doc.stats.updated_at = now;
        });
        Ok(())
    }

    async fn append_transaction(&self, user_id: &str, txn: NewTransaction) -> Result<PointTransaction> {
        tokio::task::yield_now().await;
        self.check_writable()?;
        let record = PointTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            points: txn.points,
            reason: txn.reason,
            metadata: txn.metadata,
            created_at: self.clock.now(),
        };
        self.with_document(user_id, |doc| doc.transactions.push(record.clone()));
        Ok(record)
    }

    async fn append_badge_log(
        &self,
        user_id: &str,
        badge_id: &str,
        badge_name: &str,
    ) -> Result<BadgeLogEntry> {
        tokio::task::yield_now().await;
        self.check_writable()?;
        let entry = BadgeLogEntry {
            badge_id: badge_id.to_string(),
            badge_name: badge_name.to_string(),
            earned_at: self.clock.now(),
        };
        self.with_document(user_id, |doc| doc.badge_log.push(entry.clone()));
        Ok(entry)
    }

    async fn recent_transactions(&self, user_id: &str, limit: usize) -> Result<Vec<PointTransaction>> {
        tokio::task::yield_now().await;
        Ok(self.with_document(user_id, |doc| {
            doc.transactions.iter().rev().take(limit).cloned().collect()
        }))
    }

    async fn badge_log(&self, user_id: &str) -> Result<Vec<BadgeLogEntry>> {
        tokio::task::yield_now().await;
        Ok(self.with_document(user_id, |doc| doc.badge_log.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let store = MemoryStatsStore::new(Arc::new(SystemClock));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .atomic_increment("alice", StatField::TotalPoints, 3)
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = store.get_or_create("alice").await.unwrap();
        assert_eq!(stats.total_points, 60);
    }

    #[tokio::test]
    async fn test_fail_writes_leaves_reads_working() {
        let store = MemoryStatsStore::new(Arc::new(SystemClock));
        store.set_fail_writes(true);

        assert!(store
            .atomic_increment("bob", StatField::PapersRead, 1)
            .await
            .is_err());
        let stats = store.get_or_create("bob").await.unwrap();
        assert_eq!(stats.papers_read, 0);
    }
}
