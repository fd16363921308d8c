//! Gamification system: points, badges, streaks, and activity classification
//!
//! Activity events flow through [`GamificationEngine`], get classified, and are
//! credited by the [`PointsLedger`], which re-evaluates badges after each award.

pub mod badges;
mod classifiers;
mod engine;
mod ledger;

pub use badges::{Badge, BadgeCategory, BadgeEngine, BadgeId, BADGES};
pub use classifiers::{
    classify_activity, classify_daily_login, classify_meeting_join, classify_meeting_join_raw,
    Activity, ActivityAward, DailyLogin, MeetingClassification, MeetingPunctuality,
    EARLY_THRESHOLD_MINUTES, LATE_THRESHOLD_MINUTES,
};
pub use engine::{EarnedBadge, GamificationEngine};
pub use ledger::{AwardReceipt, PointsLedger};
