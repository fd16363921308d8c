//! Shared test utilities for engine and tracker integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use portal_engagement::clock::ManualClock;
use portal_engagement::config::{PointSettings, SessionSettings};
use portal_engagement::gamification::GamificationEngine;
use portal_engagement::identity::StaticIdentity;
use portal_engagement::session::{MemoryCheckpointStore, SessionCheckpoint, SessionTracker};
use portal_engagement::stats::{MemoryStatsStore, PointTransaction, StatsStore, UserStats};

pub const USER: &str = "alice";

/// Monday 2024-06-03 09:00 UTC
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
}

/// Engine wired to in-memory stores and a manual clock, signed in as [`USER`]
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub identity: Arc<StaticIdentity>,
    pub store: MemoryStatsStore,
    pub checkpoints: Arc<MemoryCheckpointStore>,
    pub engine: GamificationEngine,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let identity = Arc::new(StaticIdentity::signed_in(USER));
        let store = MemoryStatsStore::new(clock.clone());
        let engine = GamificationEngine::new(
            Arc::new(store.clone()),
            identity.clone(),
            clock.clone(),
            PointSettings::default(),
        );

        Self {
            clock,
            identity,
            store,
            checkpoints: Arc::new(MemoryCheckpointStore::new()),
            engine,
        }
    }

    pub fn tracker(&self) -> Arc<SessionTracker> {
        SessionTracker::new(
            &self.engine,
            self.checkpoints.clone(),
            SessionSettings::default(),
        )
    }

    pub fn now(&self) -> DateTime<Utc> {
        use portal_engagement::clock::Clock;
        self.clock.now()
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.clock.advance(Duration::minutes(minutes));
    }

    pub fn advance_days(&self, days: i64) {
        self.clock.advance(Duration::days(days));
    }

    pub async fn stats(&self) -> UserStats {
        self.store.get_or_create(USER).await.unwrap()
    }

    pub fn transactions(&self) -> Vec<PointTransaction> {
        self.store.transactions(USER)
    }

    pub fn checkpoint(&self) -> SessionCheckpoint {
        self.checkpoints.peek().expect("checkpoint saved")
    }

    pub fn reasons(&self) -> Vec<String> {
        self.transactions().into_iter().map(|t| t.reason).collect()
    }
}
