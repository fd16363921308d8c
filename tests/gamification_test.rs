//! Integration tests for activity tracking, streaks, and badges

mod common;

use chrono::Duration;
use serde_json::json;

use common::{Harness, USER, t0};
use portal_engagement::gamification::{Activity, BadgeId, MeetingPunctuality};

#[tokio::test]
async fn test_daily_login_streak() {
    let h = Harness::new();

    assert!(h.engine.track_daily_login(USER).await);
    assert_eq!(h.stats().await.consecutive_days, 1);
    assert_eq!(h.stats().await.last_login_date, Some(t0().date_naive()));

    // Same day: no second credit
    h.advance_minutes(120);
    assert!(!h.engine.track_daily_login(USER).await);
    assert_eq!(h.stats().await.total_points, 10);

    h.advance_days(1);
    assert!(h.engine.track_daily_login(USER).await);
    assert_eq!(h.stats().await.consecutive_days, 2);

    // Skipped a day
    h.advance_days(2);
    assert!(h.engine.track_daily_login(USER).await);
    assert_eq!(h.stats().await.consecutive_days, 1);
    assert_eq!(h.stats().await.total_points, 30);
}

#[tokio::test]
async fn test_concurrent_daily_login_credits_once() {
    let h = Harness::new();

    let (first, second) = tokio::join!(
        h.engine.track_daily_login(USER),
        h.engine.track_daily_login(USER)
    );

    assert!(first ^ second);
    assert_eq!(h.stats().await.total_points, 10);
    assert_eq!(h.transactions().len(), 1);
}

#[tokio::test]
async fn test_meeting_joins_classified_and_counted() {
    let h = Harness::new();
    let scheduled = t0() + Duration::hours(1);

    let early = h
        .engine
        .track_meeting_join(USER, "m1", scheduled, scheduled - Duration::minutes(20))
        .await
        .unwrap();
    let on_time = h
        .engine
        .track_meeting_join(USER, "m2", scheduled, scheduled + Duration::minutes(5))
        .await
        .unwrap();
    let late = h
        .engine
        .track_meeting_join(USER, "m3", scheduled, scheduled + Duration::minutes(20))
        .await
        .unwrap();

    assert_eq!(early.punctuality, MeetingPunctuality::Early);
    assert_eq!(on_time.punctuality, MeetingPunctuality::OnTime);
    assert_eq!(late.punctuality, MeetingPunctuality::Late);

    let stats = h.stats().await;
    assert_eq!(stats.meetings_total, 3);
    assert_eq!(stats.meetings_early, 1);
    assert_eq!(stats.meetings_on_time, 1);
    assert_eq!(stats.meetings_late, 1);
    assert_eq!(stats.total_points, 100);

    let badges: Vec<BadgeId> = h
        .engine
        .get_user_badges(USER)
        .await
        .into_iter()
        .map(|b| b.badge.id)
        .collect();
    assert_eq!(badges, vec![BadgeId::FirstMeeting, BadgeId::Points100]);
}

#[tokio::test]
async fn test_unreadable_meeting_time_counts_as_on_time() {
    let h = Harness::new();

    let classification = h
        .engine
        .track_meeting_join_raw(USER, "m1", "garbage", "2024-06-03T10:00:00Z")
        .await
        .expect("join still recorded");
    assert_eq!(classification.punctuality, MeetingPunctuality::OnTime);
    assert_eq!(classification.delta_minutes, None);

    let stats = h.stats().await;
    assert_eq!(stats.meetings_total, 1);
    assert_eq!(stats.meetings_on_time, 1);
    assert_eq!(stats.total_points, 50);

    let late = h
        .engine
        .track_meeting_join_raw(USER, "m2", "2024-06-03T10:00:00Z", "2024-06-03T10:20:00+00:00")
        .await
        .unwrap();
    assert_eq!(late.punctuality, MeetingPunctuality::Late);
    assert_eq!(h.stats().await.meetings_late, 1);
}

#[tokio::test]
async fn test_activities_move_counters_and_award() {
    let h = Harness::new();

    for i in 0..10 {
        assert!(h.engine.track_paper_read(USER, &format!("paper-{i}")).await);
    }
    assert!(h.engine.track_project_created(USER, "p1").await);
    assert!(h.engine.track_database_write(USER, "notes").await);

    let stats = h.stats().await;
    assert_eq!(stats.papers_read, 10);
    assert_eq!(stats.projects_created, 1);
    assert_eq!(stats.database_writes, 1);
    assert_eq!(stats.total_points, 50 + 25 + 2);
    assert!(stats.badges.contains("bookworm"));
    assert!(stats.badges.contains("first_project"));

    let earned = h.engine.get_user_badges(USER).await;
    assert!(earned.iter().all(|b| b.earned_at.is_some()));
}

#[tokio::test]
async fn test_points_equal_sum_of_transactions() {
    let h = Harness::new();

    h.engine.track_daily_login(USER).await;
    h.engine.track_evaluation_submitted(USER, "e1").await;
    h.engine.track_paper_submitted(USER, "paper").await;
    h.engine.award(USER, 7, "Manual", json!({})).await;

    let total: u64 = h.transactions().iter().map(|t| t.points as u64).sum();
    assert_eq!(h.stats().await.total_points, total);
    assert_eq!(total, 10 + 20 + 40 + 7);
}

#[tokio::test]
async fn test_recent_transactions_newest_first() {
    let h = Harness::new();

    h.engine.track_project_updated(USER, "p1").await;
    h.advance_minutes(1);
    h.engine.track_paper_read(USER, "paper").await;
    h.advance_minutes(1);
    h.engine.track_daily_login(USER).await;

    let recent = h.engine.recent_transactions(USER, 2).await;
    let reasons: Vec<&str> = recent.iter().map(|t| t.reason.as_str()).collect();
    assert_eq!(reasons, vec!["Daily login", "Paper read"]);
}

#[tokio::test]
async fn test_signed_out_calls_are_noops() {
    let h = Harness::new();
    h.identity.sign_out();

    assert!(!h.engine.track_daily_login(USER).await);
    assert!(!h.engine.track_project_created(USER, "p1").await);
    assert!(!h.engine.award(USER, 5, "Manual", json!({})).await);
    assert!(
        !h.engine
            .track_activity(USER, Activity::PaperRead, json!({}))
            .await
    );
    assert!(h.engine.get_user_gamification_stats(USER).await.is_none());
    assert!(h.engine.get_user_badges(USER).await.is_empty());
    assert!(h.transactions().is_empty());
}

#[tokio::test]
async fn test_other_user_is_rejected() {
    let h = Harness::new();

    assert!(!h.engine.track_paper_read("bob", "paper").await);
    assert!(!h.engine.award("bob", 5, "Manual", json!({})).await);
    assert!(h.store.transactions("bob").is_empty());
}

#[tokio::test]
async fn test_store_outage_is_swallowed() {
    let h = Harness::new();
    h.store.set_fail_writes(true);

    assert!(!h.engine.track_paper_read(USER, "paper").await);
    assert!(!h.engine.track_daily_login(USER).await);

    h.store.set_fail_writes(false);
    // The failed login never marked the day
    assert!(h.engine.track_daily_login(USER).await);
}
