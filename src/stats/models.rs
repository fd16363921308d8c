//! Data models for the per-user engagement aggregate
//!
//! These structures represent the data stored in and read from a [`StatsStore`](super::StatsStore).

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Per-user aggregate. Created lazily, zero-initialized, on first access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user_id: String,

    // Additive counters (only ever moved by atomic increment)
    pub total_points: u64,
    /// Credited portal time in minutes
    pub total_portal_time: u64,
    pub meetings_total: u64,
    pub meetings_on_time: u64,
    pub meetings_early: u64,
    pub meetings_late: u64,
    pub projects_created: u64,
    pub projects_updated: u64,
    pub evaluations_submitted: u64,
    pub papers_read: u64,
    pub papers_submitted: u64,
    pub database_writes: u64,

    // Last-write-wins fields
    pub last_login_date: Option<NaiveDate>,
    pub consecutive_days: u32,
    /// Portal-time total at which the last 30-minute bonus was granted
    pub half_hour_bonus_at: u64,
    pub badges: BTreeSet<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserStats {
    /// Zero-initialized stats for a new user
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            total_points: 0,
            total_portal_time: 0,
            meetings_total: 0,
            meetings_on_time: 0,
            meetings_early: 0,
            meetings_late: 0,
            projects_created: 0,
            projects_updated: 0,
            evaluations_submitted: 0,
            papers_read: 0,
            papers_submitted: 0,
            database_writes: 0,
            last_login_date: None,
            consecutive_days: 0,
            half_hour_bonus_at: 0,
            badges: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Read an additive counter
    pub fn counter(&self, field: StatField) -> u64 {
        match field {
            StatField::TotalPoints => self.total_points,
            StatField::TotalPortalTime => self.total_portal_time,
            StatField::MeetingsTotal => self.meetings_total,
            StatField::MeetingsOnTime => self.meetings_on_time,
            StatField::MeetingsEarly => self.meetings_early,
            StatField::MeetingsLate => self.meetings_late,
            StatField::ProjectsCreated => self.projects_created,
            StatField::ProjectsUpdated => self.projects_updated,
            StatField::EvaluationsSubmitted => self.evaluations_submitted,
            StatField::PapersRead => self.papers_read,
            StatField::PapersSubmitted => self.papers_submitted,
            StatField::DatabaseWrites => self.database_writes,
        }
    }

    pub(crate) fn counter_mut(&mut self, field: StatField) -> &mut u64 {
        match field {
            StatField::TotalPoints => &mut self.total_points,
            StatField::TotalPortalTime => &mut self.total_portal_time,
            StatField::MeetingsTotal => &mut self.meetings_total,
            StatField::MeetingsOnTime => &mut self.meetings_on_time,
            StatField::MeetingsEarly => &mut self.meetings_early,
            StatField::MeetingsLate => &mut self.meetings_late,
            StatField::ProjectsCreated => &mut self.projects_created,
            StatField::ProjectsUpdated => &mut self.projects_updated,
            StatField::EvaluationsSubmitted => &mut self.evaluations_submitted,
            StatField::PapersRead => &mut self.papers_read,
            StatField::PapersSubmitted => &mut self.papers_submitted,
            StatField::DatabaseWrites => &mut self.database_writes,
        }
    }

    pub(crate) fn apply(&mut self, update: &FieldUpdate) {
        match update {
            FieldUpdate::LastLoginDate(date) => self.last_login_date = Some(*date),
            FieldUpdate::ConsecutiveDays(days) => self.consecutive_days = *days,
            FieldUpdate::HalfHourBonusAt(total) => self.half_hour_bonus_at = *total,
            FieldUpdate::MergeBadges(ids) => self.badges.extend(ids.iter().cloned()),
        }
    }
}

/// Additive counters on [`UserStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatField {
    TotalPoints,
    TotalPortalTime,
    MeetingsTotal,
    MeetingsOnTime,
    MeetingsEarly,
    MeetingsLate,
    ProjectsCreated,
    ProjectsUpdated,
    EvaluationsSubmitted,
    PapersRead,
    PapersSubmitted,
    DatabaseWrites,
}

impl StatField {
    /// Column name in the SQLite schema
    pub fn column(&self) -> &'static str {
        match self {
            Self::TotalPoints => "total_points",
            Self::TotalPortalTime => "total_portal_time",
            Self::MeetingsTotal => "meetings_total",
            Self::MeetingsOnTime => "meetings_on_time",
            Self::MeetingsEarly => "meetings_early",
            Self::MeetingsLate => "meetings_late",
            Self::ProjectsCreated => "projects_created",
            Self::ProjectsUpdated => "projects_updated",
            Self::EvaluationsSubmitted => "evaluations_submitted",
            Self::PapersRead => "papers_read",
            Self::PapersSubmitted => "papers_submitted",
            Self::DatabaseWrites => "database_writes",
        }
    }
}

/// Non-additive field writes (last-write-wins)
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    LastLoginDate(NaiveDate),
    ConsecutiveDays(u32),
    HalfHourBonusAt(u64),
    /// Set union into `badges`; never removes
    MergeBadges(Vec<String>),
}

/// A point award about to be appended to the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub points: u32,
    pub reason: String,
    pub metadata: serde_json::Value,
}

/// Immutable ledger record, one per award
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointTransaction {
    pub id: String,
    pub points: u32,
    pub reason: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Immutable record of a badge being earned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeLogEntry {
    pub badge_id: String,
    pub badge_name: String,
    pub earned_at: DateTime<Utc>,
}
