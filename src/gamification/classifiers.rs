//! Activity classifiers
//!
//! Pure functions that turn raw activity parameters into a point value, a
//! reason, and the counter the activity moves. None of them fail: bad input
//! falls back to a neutral classification so scoring can never break the
//! action that triggered it.

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::PointSettings;
use crate::stats::StatField;

/// Minutes before the scheduled start that count as joining early
pub const EARLY_THRESHOLD_MINUTES: f64 = 15.0;

/// Minutes after the scheduled start still counted as on time
pub const LATE_THRESHOLD_MINUTES: f64 = 15.0;

/// How a meeting join relates to its scheduled start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingPunctuality {
    Early,
    OnTime,
    Late,
}

impl MeetingPunctuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Early => "early",
            Self::OnTime => "on_time",
            Self::Late => "late",
        }
    }

    /// Category counter moved alongside `meetings_total`
    pub fn counter(&self) -> StatField {
        match self {
            Self::Early => StatField::MeetingsEarly,
            Self::OnTime => StatField::MeetingsOnTime,
            Self::Late => StatField::MeetingsLate,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::Early => "Joined meeting early",
            Self::OnTime => "Joined meeting on time",
            Self::Late => "Joined meeting late",
        }
    }
}

/// Result of classifying a meeting join
#[derive(Debug, Clone, PartialEq)]
pub struct MeetingClassification {
    pub punctuality: MeetingPunctuality,
    pub points: u32,
    /// scheduled - joined, in minutes; `None` when the input was unusable
    pub delta_minutes: Option<f64>,
}

/// Classify a join by how far ahead of the scheduled start it happened.
///
/// delta >= 15 is early, -15 <= delta < 15 on time, delta < -15 late.
/// On time scores highest.
pub fn classify_meeting_join(
    scheduled_at: DateTime<Utc>,
    joined_at: DateTime<Utc>,
    points: &PointSettings,
) -> MeetingClassification {
    let delta = (scheduled_at - joined_at).num_milliseconds() as f64 / 60_000.0;

    let punctuality = if delta >= EARLY_THRESHOLD_MINUTES {
        MeetingPunctuality::Early
    } else if delta >= -LATE_THRESHOLD_MINUTES {
        MeetingPunctuality::OnTime
    } else {
        MeetingPunctuality::Late
    };

    MeetingClassification {
        punctuality,
        points: meeting_points(punctuality, points),
        delta_minutes: Some(delta),
    }
}

/// Classify from RFC 3339 strings; unparsable input is treated as on time
pub fn classify_meeting_join_raw(
    scheduled_at: &str,
    joined_at: &str,
    points: &PointSettings,
) -> MeetingClassification {
    let parsed = (
        DateTime::parse_from_rfc3339(scheduled_at.trim()),
        DateTime::parse_from_rfc3339(joined_at.trim()),
    );
    match parsed {
        (Ok(scheduled), Ok(joined)) => classify_meeting_join(
            scheduled.with_timezone(&Utc),
            joined.with_timezone(&Utc),
            points,
        ),
        _ => {
            tracing::debug!(
                "Unusable meeting timestamps ({:?}, {:?}), scoring as on time",
                scheduled_at,
                joined_at
            );
            MeetingClassification {
                punctuality: MeetingPunctuality::OnTime,
                points: points.meeting_on_time,
                delta_minutes: None,
            }
        }
    }
}

fn meeting_points(punctuality: MeetingPunctuality, points: &PointSettings) -> u32 {
    match punctuality {
        MeetingPunctuality::Early => points.meeting_early,
        MeetingPunctuality::OnTime => points.meeting_on_time,
        MeetingPunctuality::Late => points.meeting_late,
    }
}

/// Outcome of classifying a login against the stored streak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyLogin {
    /// Already credited on this calendar day
    AlreadyCredited,
    Credit {
        consecutive_days: u32,
        /// `false` when the streak was reset to 1
        streak_continued: bool,
    },
}

/// Decide whether today's login earns the daily bonus and what the streak becomes
pub fn classify_daily_login(
    today: NaiveDate,
    last_login_date: Option<NaiveDate>,
    consecutive_days: u32,
) -> DailyLogin {
    match last_login_date {
        Some(last) if last == today => DailyLogin::AlreadyCredited,
        Some(last) if today.pred_opt() == Some(last) => DailyLogin::Credit {
            consecutive_days: consecutive_days.saturating_add(1),
            streak_continued: true,
        },
        _ => DailyLogin::Credit {
            consecutive_days: 1,
            streak_continued: false,
        },
    }
}

/// Discrete research activities with a flat point value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    ProjectCreated,
    ProjectUpdated,
    EvaluationSubmitted,
    PaperRead,
    PaperSubmitted,
    DatabaseWrite,
}

impl Activity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectCreated => "project_created",
            Self::ProjectUpdated => "project_updated",
            Self::EvaluationSubmitted => "evaluation_submitted",
            Self::PaperRead => "paper_read",
            Self::PaperSubmitted => "paper_submitted",
            Self::DatabaseWrite => "database_write",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "project_created" => Some(Self::ProjectCreated),
            "project_updated" => Some(Self::ProjectUpdated),
            "evaluation_submitted" => Some(Self::EvaluationSubmitted),
            "paper_read" => Some(Self::PaperRead),
            "paper_submitted" => Some(Self::PaperSubmitted),
            "database_write" => Some(Self::DatabaseWrite),
            _ => None,
        }
    }

    pub fn all() -> &'static [Activity] {
        &[
            Self::ProjectCreated,
            Self::ProjectUpdated,
            Self::EvaluationSubmitted,
            Self::PaperRead,
            Self::PaperSubmitted,
            Self::DatabaseWrite,
        ]
    }
}

/// Points, reason and counter for one activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityAward {
    pub points: u32,
    pub reason: &'static str,
    pub counter: StatField,
}

pub fn classify_activity(activity: Activity, points: &PointSettings) -> ActivityAward {
    let (value, reason, counter) = match activity {
        Activity::ProjectCreated => (points.project_created, "Project created", StatField::ProjectsCreated),
        Activity::ProjectUpdated => (points.project_updated, "Project updated", StatField::ProjectsUpdated),
        Activity::EvaluationSubmitted => (
            points.evaluation_submitted,
            "Evaluation submitted",
            StatField::EvaluationsSubmitted,
        ),
        Activity::PaperRead => (points.paper_read, "Paper read", StatField::PapersRead),
        Activity::PaperSubmitted => (points.paper_submitted, "Paper submitted", StatField::PapersSubmitted),
        Activity::DatabaseWrite => (points.database_write, "Database entry added", StatField::DatabaseWrites),
    };
    ActivityAward {
        points: value,
        reason,
        counter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn scheduled() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 10, 14, 0, 0).unwrap()
    }

    fn classify_at(delta_minutes: i64) -> MeetingClassification {
        let joined = scheduled() - Duration::minutes(delta_minutes);
        classify_meeting_join(scheduled(), joined, &PointSettings::default())
    }

    #[test]
    fn test_meeting_boundaries() {
        assert_eq!(classify_at(15).punctuality, MeetingPunctuality::Early);
        assert_eq!(classify_at(14).punctuality, MeetingPunctuality::OnTime);
        assert_eq!(classify_at(0).punctuality, MeetingPunctuality::OnTime);
        assert_eq!(classify_at(-15).punctuality, MeetingPunctuality::OnTime);
        assert_eq!(classify_at(-16).punctuality, MeetingPunctuality::Late);
    }

    #[test]
    fn test_on_time_outscores_early() {
        assert_eq!(classify_at(30).points, 30);
        assert_eq!(classify_at(0).points, 50);
        assert_eq!(classify_at(-45).points, 20);
    }

    #[test]
    fn test_fractional_minutes_past_threshold_are_late() {
        let joined = scheduled() + Duration::seconds(15 * 60 + 30);
        let result = classify_meeting_join(scheduled(), joined, &PointSettings::default());
        assert_eq!(result.punctuality, MeetingPunctuality::Late);
    }

    #[test]
    fn test_invalid_timestamps_fall_back_to_on_time() {
        let points = PointSettings::default();
        let result = classify_meeting_join_raw("not a date", "2024-04-10T14:00:00Z", &points);
        assert_eq!(result.punctuality, MeetingPunctuality::OnTime);
        assert_eq!(result.points, 50);
        assert_eq!(result.delta_minutes, None);

        let parsed = classify_meeting_join_raw(
            "2024-04-10T14:00:00Z",
            "2024-04-10T13:30:00+00:00",
            &points,
        );
        assert_eq!(parsed.punctuality, MeetingPunctuality::Early);
    }

    #[test]
    fn test_daily_login_streak() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let next = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let skipped = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        assert_eq!(
            classify_daily_login(day, None, 0),
            DailyLogin::Credit {
                consecutive_days: 1,
                streak_continued: false
            }
        );
        assert_eq!(
            classify_daily_login(next, Some(day), 1),
            DailyLogin::Credit {
                consecutive_days: 2,
                streak_continued: true
            }
        );
        assert_eq!(
            classify_daily_login(skipped, Some(day), 2),
            DailyLogin::Credit {
                consecutive_days: 1,
                streak_continued: false
            }
        );
        assert_eq!(classify_daily_login(day, Some(day), 3), DailyLogin::AlreadyCredited);
    }

    #[test]
    fn test_activity_round_trip_and_counters() {
        let points = PointSettings::default();
        let award = classify_activity(Activity::EvaluationSubmitted, &points);
        assert_eq!(award.counter, StatField::EvaluationsSubmitted);
        assert_eq!(award.points, points.evaluation_submitted);
        assert_eq!(Activity::from_str("paper_read"), Some(Activity::PaperRead));
        assert_eq!(Activity::from_str("meeting"), None);
    }
}
