//! Integration tests for the engine on the SQLite store

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use portal_engagement::clock::SystemClock;
use portal_engagement::config::PointSettings;
use portal_engagement::gamification::GamificationEngine;
use portal_engagement::identity::StaticIdentity;
use portal_engagement::stats::{SqliteStatsStore, StatsStore};

fn engine_at(dir: &TempDir) -> GamificationEngine {
    let store = SqliteStatsStore::open(&dir.path().join("engagement.db"))
        .expect("Failed to open stats database");
    GamificationEngine::new(
        Arc::new(store),
        Arc::new(StaticIdentity::signed_in("carol")),
        Arc::new(SystemClock),
        PointSettings::default(),
    )
}

#[tokio::test]
async fn test_progress_survives_reopen() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    {
        let engine = engine_at(&dir);
        assert!(engine.track_daily_login("carol").await);
        assert!(engine.track_project_created("carol", "p1").await);
        assert!(engine.award("carol", 70, "Conference talk", json!({ "event": "ICSE" })).await);
    }

    let engine = engine_at(&dir);
    let stats = engine
        .get_user_gamification_stats("carol")
        .await
        .expect("stats readable");
    assert_eq!(stats.total_points, 105);
    assert_eq!(stats.projects_created, 1);
    assert_eq!(stats.consecutive_days, 1);
    assert!(stats.badges.contains("first_project"));
    assert!(stats.badges.contains("points_100"));

    // Already credited today, even from a fresh process
    assert!(!engine.track_daily_login("carol").await);

    let recent = engine.recent_transactions("carol", 10).await;
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].reason, "Conference talk");
    assert_eq!(recent[0].metadata["event"], "ICSE");
}

#[tokio::test]
async fn test_two_handles_share_counters() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("engagement.db");

    let first = SqliteStatsStore::open(&path).unwrap();
    let second = SqliteStatsStore::open(&path).unwrap();

    for _ in 0..5 {
        first
            .atomic_increment("dave", portal_engagement::stats::StatField::PapersRead, 1)
            .await
            .unwrap();
        second
            .atomic_increment("dave", portal_engagement::stats::StatField::PapersRead, 1)
            .await
            .unwrap();
    }

    assert_eq!(first.get_or_create("dave").await.unwrap().papers_read, 10);
}
