//! Gamification engine - entry point for activity events and read models
//!
//! Every `track_*` call classifies the activity, moves its counter, and awards
//! points through the ledger. None of them return errors: gamification must
//! never block the action that triggered it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::json;

use super::badges::{Badge, BadgeId};
use super::classifiers::{
    classify_activity, classify_daily_login, classify_meeting_join, classify_meeting_join_raw,
    Activity, DailyLogin, MeetingClassification,
};
use super::ledger::PointsLedger;
use crate::clock::Clock;
use crate::config::PointSettings;
use crate::error::{EngagementError, Result};
use crate::identity::AuthContext;
use crate::stats::{FieldUpdate, PointTransaction, StatField, StatsStore, UserStats};

/// A badge the user holds, with the time it was logged
#[derive(Debug, Clone)]
pub struct EarnedBadge {
    pub badge: &'static Badge,
    pub earned_at: Option<DateTime<Utc>>,
}

/// Releases a single-flight slot on all exit paths
struct InFlightGuard<'a> {
    slots: &'a Mutex<HashSet<String>>,
    user_id: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(slots: &'a Mutex<HashSet<String>>, user_id: &str) -> Option<Self> {
        let mut held = slots.lock().unwrap_or_else(|e| e.into_inner());
        if !held.insert(user_id.to_string()) {
            return None;
        }
        Some(Self {
            slots,
            user_id: user_id.to_string(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        held.remove(&self.user_id);
    }
}

/// Owns the ledger and the per-instance single-flight guards
pub struct GamificationEngine {
    store: Arc<dyn StatsStore>,
    ledger: Arc<PointsLedger>,
    clock: Arc<dyn Clock>,
    points: PointSettings,
    login_in_flight: Mutex<HashSet<String>>,
}

impl GamificationEngine {
    pub fn new(
        store: Arc<dyn StatsStore>,
        auth: Arc<dyn AuthContext>,
        clock: Arc<dyn Clock>,
        points: PointSettings,
    ) -> Self {
        Self {
            ledger: Arc::new(PointsLedger::new(store.clone(), auth)),
            store,
            clock,
            points,
            login_in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Shared ledger, also used by the session tracker
    pub fn ledger(&self) -> &Arc<PointsLedger> {
        &self.ledger
    }

    pub fn points(&self) -> &PointSettings {
        &self.points
    }

    pub fn store(&self) -> &Arc<dyn StatsStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Award points for an explicit event. See [`PointsLedger::award`].
    pub async fn award(&self, user_id: &str, points: u32, reason: &str, metadata: serde_json::Value) -> bool {
        self.ledger.award(user_id, points, reason, metadata).await
    }

    // ========================================
    // ACTIVITY EVENTS
    // ========================================

    /// Record a research activity and award its points
    pub async fn track_activity(&self, user_id: &str, activity: Activity, metadata: serde_json::Value) -> bool {
        match self.try_track_activity(user_id, activity, metadata).await {
            Ok(()) => true,
            Err(e) => {
                log_skipped(activity.as_str(), user_id, &e);
                false
            }
        }
    }

    async fn try_track_activity(
        &self,
        user_id: &str,
        activity: Activity,
        metadata: serde_json::Value,
    ) -> Result<()> {
        self.ledger.authorize(user_id)?;
        let award = classify_activity(activity, &self.points);
        self.store.atomic_increment(user_id, award.counter, 1).await?;
        if award.points > 0 {
            self.ledger
                .try_award(user_id, award.points, award.reason, metadata)
                .await?;
        }
        Ok(())
    }

    pub async fn track_project_created(&self, user_id: &str, project_id: &str) -> bool {
        self.track_activity(user_id, Activity::ProjectCreated, json!({ "projectId": project_id }))
            .await
    }

    pub async fn track_project_updated(&self, user_id: &str, project_id: &str) -> bool {
        self.track_activity(user_id, Activity::ProjectUpdated, json!({ "projectId": project_id }))
            .await
    }

    pub async fn track_evaluation_submitted(&self, user_id: &str, evaluation_id: &str) -> bool {
        self.track_activity(
            user_id,
            Activity::EvaluationSubmitted,
            json!({ "evaluationId": evaluation_id }),
        )
        .await
    }

    pub async fn track_paper_read(&self, user_id: &str, paper_id: &str) -> bool {
        self.track_activity(user_id, Activity::PaperRead, json!({ "paperId": paper_id }))
            .await
    }

    pub async fn track_paper_submitted(&self, user_id: &str, paper_id: &str) -> bool {
        self.track_activity(user_id, Activity::PaperSubmitted, json!({ "paperId": paper_id }))
            .await
    }

    pub async fn track_database_write(&self, user_id: &str, collection: &str) -> bool {
        self.track_activity(user_id, Activity::DatabaseWrite, json!({ "collection": collection }))
            .await
    }

    /// Classify a meeting join, move the meeting counters, award points.
    /// Returns the classification when the points were credited.
    pub async fn track_meeting_join(
        &self,
        user_id: &str,
        meeting_id: &str,
        scheduled_at: DateTime<Utc>,
        joined_at: DateTime<Utc>,
    ) -> Option<MeetingClassification> {
        let classification = classify_meeting_join(scheduled_at, joined_at, &self.points);
        self.record_meeting(user_id, meeting_id, classification).await
    }

    /// Same as [`track_meeting_join`](Self::track_meeting_join) for RFC 3339
    /// strings as they arrive from the caller. Unusable timestamps are
    /// scored as on time rather than dropping the join.
    pub async fn track_meeting_join_raw(
        &self,
        user_id: &str,
        meeting_id: &str,
        scheduled_at: &str,
        joined_at: &str,
    ) -> Option<MeetingClassification> {
        let classification = classify_meeting_join_raw(scheduled_at, joined_at, &self.points);
        self.record_meeting(user_id, meeting_id, classification).await
    }

    async fn record_meeting(
        &self,
        user_id: &str,
        meeting_id: &str,
        classification: MeetingClassification,
    ) -> Option<MeetingClassification> {
        match self.try_track_meeting(user_id, meeting_id, &classification).await {
            Ok(()) => Some(classification),
            Err(e) => {
                log_skipped("meeting join", user_id, &e);
                None
            }
        }
    }

    async fn try_track_meeting(
        &self,
        user_id: &str,
        meeting_id: &str,
        classification: &MeetingClassification,
    ) -> Result<()> {
        self.ledger.authorize(user_id)?;
        let punctuality = classification.punctuality;
        self.store
            .atomic_increment(user_id, StatField::MeetingsTotal, 1)
            .await?;
        self.store
            .atomic_increment(user_id, punctuality.counter(), 1)
            .await?;
        self.ledger
            .try_award(
                user_id,
                classification.points,
                punctuality.reason(),
                json!({
                    "meetingId": meeting_id,
                    "punctuality": punctuality.as_str(),
                    "deltaMinutes": classification.delta_minutes,
                }),
            )
            .await?;
        Ok(())
    }

    /// Credit the daily login bonus at most once per local calendar day.
    ///
    /// A concurrent call for the same user on this instance is rejected by the
    /// in-flight guard; calls from other instances are stopped by the stored
    /// last-login date.
    pub async fn track_daily_login(&self, user_id: &str) -> bool {
        match self.try_track_daily_login(user_id).await {
            Ok(credited) => credited,
            Err(e) => {
                log_skipped("daily login", user_id, &e);
                false
            }
        }
    }

    async fn try_track_daily_login(&self, user_id: &str) -> Result<bool> {
        self.ledger.authorize(user_id)?;

        let Some(_guard) = InFlightGuard::acquire(&self.login_in_flight, user_id) else {
            tracing::debug!("Daily login for {} already in flight", user_id);
            return Ok(false);
        };

        let today = self.clock.today();
        let stats = self.store.get_or_create(user_id).await?;

        let DailyLogin::Credit {
            consecutive_days,
            streak_continued,
        } = classify_daily_login(today, stats.last_login_date, stats.consecutive_days)
        else {
            tracing::debug!("Daily login for {} already credited on {}", user_id, today);
            return Ok(false);
        };

        // Mark the day first so a failed award cannot be retried into a double credit
        self.store
            .atomic_set_fields(
                user_id,
                &[
                    FieldUpdate::LastLoginDate(today),
                    FieldUpdate::ConsecutiveDays(consecutive_days),
                ],
            )
            .await?;

        if !streak_continued && stats.consecutive_days > 1 {
            tracing::info!("Streak for {} reset after {} days", user_id, stats.consecutive_days);
        }

        self.ledger
            .try_award(
                user_id,
                self.points.daily_login,
                "Daily login",
                json!({ "date": today.to_string(), "consecutiveDays": consecutive_days }),
            )
            .await?;
        Ok(true)
    }

    // ========================================
    // READ MODELS
    // ========================================

    /// Current aggregate for display; `None` when signed out or on failure
    pub async fn get_user_gamification_stats(&self, user_id: &str) -> Option<UserStats> {
        self.read(user_id, "stats", self.store.get_or_create(user_id))
            .await
    }

    /// Earned badges in catalog order, with the time each was logged
    pub async fn get_user_badges(&self, user_id: &str) -> Vec<EarnedBadge> {
        let Some(stats) = self.get_user_gamification_stats(user_id).await else {
            return Vec::new();
        };
        let log = self
            .read(user_id, "badge log", self.store.badge_log(user_id))
            .await
            .unwrap_or_default();

        BadgeId::all()
            .iter()
            .filter(|id| stats.badges.contains(id.as_str()))
            .filter_map(|id| Badge::get(*id))
            .map(|badge| EarnedBadge {
                badge,
                earned_at: log
                    .iter()
                    .find(|entry| entry.badge_id == badge.id.as_str())
                    .map(|entry| entry.earned_at),
            })
            .collect()
    }

    /// Most recent point transactions for the activity feed
    pub async fn recent_transactions(&self, user_id: &str, limit: usize) -> Vec<PointTransaction> {
        self.read(
            user_id,
            "transactions",
            self.store.recent_transactions(user_id, limit),
        )
        .await
        .unwrap_or_default()
    }

    async fn read<T>(
        &self,
        user_id: &str,
        what: &str,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Option<T> {
        if self.ledger.authorize_any().is_err() {
            tracing::debug!("Skipping {} read for {}: no authenticated user", what, user_id);
            return None;
        }
        match fut.await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Failed to read {} for {}: {}", what, user_id, e);
                None
            }
        }
    }
}

fn log_skipped(what: &str, user_id: &str, err: &EngagementError) {
    match err {
        EngagementError::Unauthenticated => {
            tracing::debug!("Skipping {}: no authenticated user", what)
        }
        _ => tracing::warn!("Failed to track {} for {}: {}", what, user_id, err),
    }
}
