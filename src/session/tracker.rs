//! Portal-time session tracker
//!
//! ```text
//! STOPPED ──start()──▶ RECOVERING ──▶ RUNNING ──stop()──▶ STOPPED
//! ```
//!
//! Portal time is credited in whole blocks measured from the checkpoint. The
//! checkpoint only ever advances by credited minutes, so a partial block is
//! carried into the next tick, the next recovery, or the next session.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::checkpoint::{CheckpointStore, SessionCheckpoint};
use crate::clock::Clock;
use crate::config::{PointSettings, SessionSettings};
use crate::gamification::{GamificationEngine, PointsLedger};
use crate::stats::{FieldUpdate, StatField, StatsStore};

const PORTAL_TIME_REASON: &str = "Portal time spent";
const HALF_HOUR_REASON: &str = "30 minutes milestone";
const HOUR_REASON: &str = "60 minutes milestone";

/// Tracker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Stopped,
    Recovering,
    Running,
}

/// Portal time credited by one tick or recovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credit {
    pub minutes: u64,
    pub points: u32,
    /// Milestone bonus points awarded on top of `points`
    pub bonus_points: u32,
    /// total_portal_time after the increment, if the increment succeeded
    pub total_portal_time: Option<u64>,
}

struct Timers {
    shutdown: watch::Sender<bool>,
    _handle: JoinHandle<()>,
}

/// Measures continuous engagement for the signed-in user.
///
/// One instance per authenticated session: construct on login, `start()` on
/// mount, `stop()` on unmount or logout.
pub struct SessionTracker {
    ledger: Arc<PointsLedger>,
    store: Arc<dyn StatsStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    points: PointSettings,
    state: Mutex<TrackerState>,
    /// Serializes start and stop so a stop during recovery cannot be overtaken
    lifecycle: tokio::sync::Mutex<()>,
    current: tokio::sync::Mutex<Option<SessionCheckpoint>>,
    timers: Mutex<Option<Timers>>,
}

impl SessionTracker {
    pub fn new(
        engine: &GamificationEngine,
        checkpoints: Arc<dyn CheckpointStore>,
        settings: SessionSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            ledger: engine.ledger().clone(),
            store: engine.store().clone(),
            checkpoints,
            clock: engine.clock().clone(),
            settings,
            points: engine.points().clone(),
            state: Mutex::new(TrackerState::Stopped),
            lifecycle: tokio::sync::Mutex::new(()),
            current: tokio::sync::Mutex::new(None),
            timers: Mutex::new(None),
        })
    }

    pub fn state(&self) -> TrackerState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: TrackerState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        tracing::debug!("Session tracker {:?} -> {:?}", *state, next);
        *state = next;
    }

    /// Start tracking, recovering uncredited time from a recent checkpoint.
    ///
    /// Returns `false` without an authenticated user. Calling it while
    /// already running is a no-op.
    pub async fn start(self: &Arc<Self>) -> bool {
        let Ok(user_id) = self.ledger.authorize_any() else {
            tracing::debug!("Not starting session tracker: no authenticated user");
            return false;
        };

        let _lifecycle = self.lifecycle.lock().await;
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state != TrackerState::Stopped {
                tracing::debug!("Session tracker already {:?}", *state);
                return true;
            }
            *state = TrackerState::Recovering;
        }

        let mut current = self.current.lock().await;
        let checkpoint = self.recover_or_fresh(&user_id).await;
        self.persist(&checkpoint);
        *current = Some(checkpoint);
        drop(current);

        self.set_state(TrackerState::Running);
        self.spawn_timers();
        true
    }

    /// Stop the timers and persist the checkpoint.
    ///
    /// A partial block is never flushed; it stays in the checkpoint for the
    /// next recovery. An award already in flight completes first.
    pub async fn stop(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        let timers = self.timers.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(timers) = timers {
            let _ = timers.shutdown.send(true);
        }

        self.set_state(TrackerState::Stopped);

        let mut current = self.current.lock().await;
        if let Some(checkpoint) = current.as_mut() {
            checkpoint.saved_at = self.clock.now();
            self.persist(checkpoint);
        }
        *current = None;
    }

    /// Credit every whole block elapsed since the checkpoint.
    ///
    /// Called by the periodic timer; returns what was credited, if anything.
    pub async fn tick(&self) -> Option<Credit> {
        let mut current = self.current.lock().await;
        if self.state() != TrackerState::Running {
            return None;
        }
        let checkpoint = current.as_mut()?;
        if let Err(e) = self.ledger.authorize(&checkpoint.user_id) {
            tracing::debug!("Skipping session tick: {}", e);
            return None;
        }

        let now = self.clock.now();
        let elapsed = now - checkpoint.last_checkpoint;
        let credit = self.credit(&checkpoint.user_id, elapsed).await?;

        checkpoint.last_checkpoint += Duration::minutes(credit.minutes as i64);
        checkpoint.saved_at = now;
        self.persist(checkpoint);
        Some(credit)
    }

    /// Persist the checkpoint without crediting
    pub async fn save_checkpoint(&self) -> bool {
        let mut current = self.current.lock().await;
        match current.as_mut() {
            Some(checkpoint) => {
                checkpoint.saved_at = self.clock.now();
                self.persist(checkpoint)
            }
            None => false,
        }
    }

    /// Best-effort synchronous save for page unload / process exit.
    /// Skipped when a tick currently holds the checkpoint.
    pub fn on_unload(&self) {
        match self.current.try_lock() {
            Ok(mut current) => {
                if let Some(checkpoint) = current.as_mut() {
                    checkpoint.saved_at = self.clock.now();
                    self.persist(checkpoint);
                }
            }
            Err(_) => tracing::debug!("Checkpoint busy during unload, skipping save"),
        }
    }

    async fn recover_or_fresh(&self, user_id: &str) -> SessionCheckpoint {
        let now = self.clock.now();
        let Some(saved) = self.checkpoints.load(user_id) else {
            tracing::debug!("No checkpoint for {}, starting fresh", user_id);
            return SessionCheckpoint::fresh(user_id, now);
        };

        let age = now - saved.saved_at;
        if age >= self.settings.max_gap() || age < Duration::zero() || saved.last_checkpoint > now {
            tracing::debug!("Discarding stale checkpoint for {} (age {}m)", user_id, age.num_minutes());
            if let Err(e) = self.checkpoints.clear(user_id) {
                tracing::warn!("Failed to clear stale checkpoint: {}", e);
            }
            return SessionCheckpoint::fresh(user_id, now);
        }

        // Anything older than the cap is forfeited
        let cap = self.settings.recovery_cap();
        let base = if now - saved.last_checkpoint > cap {
            now - cap
        } else {
            saved.last_checkpoint
        };

        let mut checkpoint = SessionCheckpoint {
            last_checkpoint: base,
            saved_at: now,
            ..saved
        };
        if let Some(credit) = self.credit(user_id, now - base).await {
            checkpoint.last_checkpoint = base + Duration::minutes(credit.minutes as i64);
            tracing::info!("Recovered {} minutes of portal time for {}", credit.minutes, user_id);
        }
        checkpoint
    }

    /// Credit the whole blocks contained in `elapsed`.
    ///
    /// `None` when there is no whole block or the point award failed; the
    /// caller then leaves the checkpoint where it was.
    async fn credit(&self, user_id: &str, elapsed: Duration) -> Option<Credit> {
        let block_minutes = self.settings.credit_block().num_minutes();
        let blocks = elapsed.num_minutes() / block_minutes;
        if blocks <= 0 {
            return None;
        }

        let minutes = (blocks * block_minutes) as u64;
        let points = u32::try_from(blocks)
            .unwrap_or(u32::MAX)
            .saturating_mul(self.settings.points_per_block);

        if points > 0
            && !self
                .ledger
                .award(user_id, points, PORTAL_TIME_REASON, json!({ "minutes": minutes }))
                .await
        {
            return None;
        }

        let mut credit = Credit {
            minutes,
            points,
            bonus_points: 0,
            total_portal_time: None,
        };

        match self
            .store
            .atomic_increment(user_id, StatField::TotalPortalTime, minutes)
            .await
        {
            Ok(total) => {
                credit.total_portal_time = Some(total);
                credit.bonus_points = self.award_milestones(user_id, total).await;
            }
            Err(e) => tracing::warn!("Failed to add {} portal minutes for {}: {}", minutes, user_id, e),
        }

        tracing::debug!("Credited {:?} to {}", credit, user_id);
        Some(credit)
    }

    /// Milestone bonuses for the post-increment total.
    ///
    /// The 30-minute bonus is granted at most once per hour block; the
    /// 60-minute bonus at every multiple of 60.
    async fn award_milestones(&self, user_id: &str, total: u64) -> u32 {
        if total == 0 {
            return 0;
        }
        let mut bonus = 0;

        if total % 30 == 0 {
            let hour_start = (total - 1) / 60 * 60;
            match self.store.get_or_create(user_id).await {
                Ok(stats) if stats.half_hour_bonus_at <= hour_start => {
                    match self
                        .store
                        .atomic_set_fields(user_id, &[FieldUpdate::HalfHourBonusAt(total)])
                        .await
                    {
                        Ok(()) => {
                            bonus += self
                                .bonus(user_id, self.points.half_hour_bonus, HALF_HOUR_REASON, total)
                                .await
                        }
                        Err(e) => tracing::warn!("Failed to record 30 minute milestone: {}", e),
                    }
                }
                Ok(_) => tracing::debug!("30 minute bonus already granted in this hour"),
                Err(e) => tracing::warn!("Failed to load stats for milestone check: {}", e),
            }
        }

        if total % 60 == 0 {
            bonus += self
                .bonus(user_id, self.points.hour_bonus, HOUR_REASON, total)
                .await;
        }

        bonus
    }

    async fn bonus(&self, user_id: &str, points: u32, reason: &str, total: u64) -> u32 {
        if points == 0 {
            return 0;
        }
        let awarded = self
            .ledger
            .award(user_id, points, reason, json!({ "portalMinutes": total }))
            .await;
        if awarded {
            points
        } else {
            0
        }
    }

    fn persist(&self, checkpoint: &SessionCheckpoint) -> bool {
        match self.checkpoints.save(checkpoint) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to save session checkpoint: {}", e);
                false
            }
        }
    }

    fn spawn_timers(self: &Arc<Self>) {
        let (shutdown, rx) = watch::channel(false);
        let tick_every = StdDuration::from_secs(self.settings.tick_interval_secs.max(1));
        let save_every = StdDuration::from_secs(self.settings.save_interval_secs.max(1));
        let handle = tokio::spawn(run_timers(Arc::downgrade(self), rx, tick_every, save_every));

        let previous = self
            .timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(Timers {
                shutdown,
                _handle: handle,
            });
        if let Some(previous) = previous {
            let _ = previous.shutdown.send(true);
        }
    }
}

/// Credit tick and checkpoint save loop; exits on shutdown or when the tracker is dropped
async fn run_timers(
    tracker: Weak<SessionTracker>,
    mut shutdown: watch::Receiver<bool>,
    tick_every: StdDuration,
    save_every: StdDuration,
) {
    let start = tokio::time::Instant::now();
    let mut tick = tokio::time::interval_at(start + tick_every, tick_every);
    let mut save = tokio::time::interval_at(start + save_every, save_every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    save.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                let Some(tracker) = tracker.upgrade() else { break };
                tracker.tick().await;
            }
            _ = save.tick() => {
                let Some(tracker) = tracker.upgrade() else { break };
                tracker.save_checkpoint().await;
            }
        }
    }

    tracing::debug!("Session timers stopped");
}
