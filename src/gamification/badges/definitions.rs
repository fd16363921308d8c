//! Badge definitions and metadata
//!
//! All badges are defined here with their unlock conditions. Conditions only
//! read counters that never decrease, so a badge once earned stays earned.

use crate::stats::UserStats;

/// Unique identifier for each badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BadgeId {
    // Portal engagement
    PortalNewcomer,
    PortalRegular,
    PortalResident,

    // Meeting participation
    FirstMeeting,
    MeetingRegular,
    Punctual,
    EarlyBird,

    // Research activity
    FirstProject,
    ProjectBuilder,
    FirstEvaluation,
    Evaluator,
    Bookworm,
    Published,

    // Points milestones
    Points100,
    Points500,
    Points1000,

    // Consistency
    Streak7,
    Streak30,
}

impl BadgeId {
    /// Get the string ID for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PortalNewcomer => "portal_newcomer",
            Self::PortalRegular => "portal_regular",
            Self::PortalResident => "portal_resident",
            Self::FirstMeeting => "first_meeting",
            Self::MeetingRegular => "meeting_regular",
            Self::Punctual => "punctual",
            Self::EarlyBird => "early_bird",
            Self::FirstProject => "first_project",
            Self::ProjectBuilder => "project_builder",
            Self::FirstEvaluation => "first_evaluation",
            Self::Evaluator => "evaluator",
            Self::Bookworm => "bookworm",
            Self::Published => "published",
            Self::Points100 => "points_100",
            Self::Points500 => "points_500",
            Self::Points1000 => "points_1000",
            Self::Streak7 => "streak_7",
            Self::Streak30 => "streak_30",
        }
    }

    /// Parse from a stored string
    pub fn from_str(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|id| id.as_str() == s)
    }

    /// Get all badge IDs
    pub fn all() -> &'static [BadgeId] {
        &[
            Self::PortalNewcomer,
            Self::PortalRegular,
            Self::PortalResident,
            Self::FirstMeeting,
            Self::MeetingRegular,
            Self::Punctual,
            Self::EarlyBird,
            Self::FirstProject,
            Self::ProjectBuilder,
            Self::FirstEvaluation,
            Self::Evaluator,
            Self::Bookworm,
            Self::Published,
            Self::Points100,
            Self::Points500,
            Self::Points1000,
            Self::Streak7,
            Self::Streak30,
        ]
    }
}

/// Badge category for grouping on the badge wall
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeCategory {
    Portal,
    Meeting,
    Research,
    Points,
    Consistency,
}

impl BadgeCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Portal => "Portal Engagement",
            Self::Meeting => "Meeting Participation",
            Self::Research => "Research Activity",
            Self::Points => "Points Milestones",
            Self::Consistency => "Consistency",
        }
    }
}

/// Badge definition with all metadata
#[derive(Debug, Clone)]
pub struct Badge {
    pub id: BadgeId,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub category: BadgeCategory,
    pub condition: fn(&UserStats) -> bool,
}

impl Badge {
    /// Get badge definition by ID
    pub fn get(id: BadgeId) -> Option<&'static Badge> {
        BADGES.iter().find(|b| b.id == id)
    }

    /// Get total number of badges
    pub fn total_count() -> usize {
        BADGES.len()
    }

    pub fn is_satisfied(&self, stats: &UserStats) -> bool {
        (self.condition)(stats)
    }
}

/// All badge definitions
pub static BADGES: &[Badge] = &[
    // === PORTAL ENGAGEMENT ===
    Badge {
        id: BadgeId::PortalNewcomer,
        name: "Settling In",
        description: "Spend one hour active in the portal",
        icon: "🕐",
        category: BadgeCategory::Portal,
        condition: |s| s.total_portal_time >= 60,
    },
    Badge {
        id: BadgeId::PortalRegular,
        name: "Regular",
        description: "Spend ten hours active in the portal",
        icon: "🏠",
        category: BadgeCategory::Portal,
        condition: |s| s.total_portal_time >= 600,
    },
    Badge {
        id: BadgeId::PortalResident,
        name: "Resident Scholar",
        description: "Spend fifty hours active in the portal",
        icon: "🏛️",
        category: BadgeCategory::Portal,
        condition: |s| s.total_portal_time >= 3000,
    },
    // === MEETING PARTICIPATION ===
    Badge {
        id: BadgeId::FirstMeeting,
        name: "First Meeting",
        description: "Join your first meeting",
        icon: "🤝",
        category: BadgeCategory::Meeting,
        condition: |s| s.meetings_total >= 1,
    },
    Badge {
        id: BadgeId::MeetingRegular,
        name: "Meeting Regular",
        description: "Join 10 meetings",
        icon: "📅",
        category: BadgeCategory::Meeting,
        condition: |s| s.meetings_total >= 10,
    },
    Badge {
        id: BadgeId::Punctual,
        name: "Punctual",
        description: "Join 5 meetings on time",
        icon: "⏰",
        category: BadgeCategory::Meeting,
        condition: |s| s.meetings_on_time >= 5,
    },
    Badge {
        id: BadgeId::EarlyBird,
        name: "Early Bird",
        description: "Join 5 meetings early",
        icon: "🐦",
        category: BadgeCategory::Meeting,
        condition: |s| s.meetings_early >= 5,
    },
    // === RESEARCH ACTIVITY ===
    Badge {
        id: BadgeId::FirstProject,
        name: "Project Founder",
        description: "Create your first project",
        icon: "🚀",
        category: BadgeCategory::Research,
        condition: |s| s.projects_created >= 1,
    },
    Badge {
        id: BadgeId::ProjectBuilder,
        name: "Project Builder",
        description: "Create 5 projects",
        icon: "🏗️",
        category: BadgeCategory::Research,
        condition: |s| s.projects_created >= 5,
    },
    Badge {
        id: BadgeId::FirstEvaluation,
        name: "First Review",
        description: "Submit your first evaluation",
        icon: "📝",
        category: BadgeCategory::Research,
        condition: |s| s.evaluations_submitted >= 1,
    },
    Badge {
        id: BadgeId::Evaluator,
        name: "Evaluator",
        description: "Submit 10 evaluations",
        icon: "🔍",
        category: BadgeCategory::Research,
        condition: |s| s.evaluations_submitted >= 10,
    },
    Badge {
        id: BadgeId::Bookworm,
        name: "Bookworm",
        description: "Read 10 papers",
        icon: "📚",
        category: BadgeCategory::Research,
        condition: |s| s.papers_read >= 10,
    },
    Badge {
        id: BadgeId::Published,
        name: "Published",
        description: "Submit your first paper",
        icon: "📄",
        category: BadgeCategory::Research,
        condition: |s| s.papers_submitted >= 1,
    },
    // === POINTS MILESTONES ===
    Badge {
        id: BadgeId::Points100,
        name: "Centurion",
        description: "Earn 100 points",
        icon: "💯",
        category: BadgeCategory::Points,
        condition: |s| s.total_points >= 100,
    },
    Badge {
        id: BadgeId::Points500,
        name: "High Achiever",
        description: "Earn 500 points",
        icon: "🏅",
        category: BadgeCategory::Points,
        condition: |s| s.total_points >= 500,
    },
    Badge {
        id: BadgeId::Points1000,
        name: "Legend",
        description: "Earn 1000 points",
        icon: "🏆",
        category: BadgeCategory::Points,
        condition: |s| s.total_points >= 1000,
    },
    // === CONSISTENCY ===
    Badge {
        id: BadgeId::Streak7,
        name: "Week Warrior",
        description: "Log in 7 days in a row",
        icon: "🔥",
        category: BadgeCategory::Consistency,
        condition: |s| s.consecutive_days >= 7,
    },
    Badge {
        id: BadgeId::Streak30,
        name: "Monthly Master",
        description: "Log in 30 days in a row",
        icon: "👑",
        category: BadgeCategory::Consistency,
        condition: |s| s.consecutive_days >= 30,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_covers_every_id_once() {
        assert_eq!(Badge::total_count(), 18);
        assert_eq!(BadgeId::all().len(), 18);

        let ids: HashSet<&str> = BADGES.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids.len(), BADGES.len());
        for id in BadgeId::all() {
            assert!(Badge::get(*id).is_some(), "missing definition for {:?}", id);
            assert_eq!(BadgeId::from_str(id.as_str()), Some(*id));
        }
    }

    #[test]
    fn test_unknown_id_does_not_parse() {
        assert_eq!(BadgeId::from_str("speed_demon"), None);
    }
}
