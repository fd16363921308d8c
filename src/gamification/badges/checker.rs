//! Badge checking logic

use super::definitions::{Badge, BADGES};
use crate::stats::UserStats;

/// Badges satisfied by `stats` that the user does not hold yet.
///
/// Membership is checked before the condition so held badges are never
/// re-evaluated. One pass can return several badges.
pub fn newly_earned(stats: &UserStats) -> Vec<&'static Badge> {
    BADGES
        .iter()
        .filter(|badge| !stats.badges.contains(badge.id.as_str()))
        .filter(|badge| badge.is_satisfied(stats))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamification::badges::BadgeId;
    use chrono::Utc;

    fn ids(badges: &[&'static Badge]) -> Vec<BadgeId> {
        badges.iter().map(|b| b.id).collect()
    }

    #[test]
    fn test_fresh_user_has_nothing_to_earn() {
        let stats = UserStats::new("alice", Utc::now());
        assert!(newly_earned(&stats).is_empty());
    }

    #[test]
    fn test_one_snapshot_unlocks_several_badges() {
        let mut stats = UserStats::new("alice", Utc::now());
        stats.projects_created = 5;
        stats.total_points = 120;

        let earned = ids(&newly_earned(&stats));
        assert_eq!(
            earned,
            vec![BadgeId::FirstProject, BadgeId::ProjectBuilder, BadgeId::Points100]
        );
    }

    #[test]
    fn test_held_badges_are_skipped() {
        let mut stats = UserStats::new("alice", Utc::now());
        stats.meetings_total = 1;
        stats.badges.insert(BadgeId::FirstMeeting.as_str().to_string());

        assert!(newly_earned(&stats).is_empty());
    }

    #[test]
    fn test_streak_badge_thresholds() {
        let mut stats = UserStats::new("alice", Utc::now());
        stats.consecutive_days = 6;
        assert!(newly_earned(&stats).is_empty());

        stats.consecutive_days = 7;
        assert_eq!(ids(&newly_earned(&stats)), vec![BadgeId::Streak7]);
    }
}
