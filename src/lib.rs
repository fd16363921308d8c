//! Portal engagement - points, badges, and streaks for a research portal
//!
//! Activity events (meeting joins, daily logins, research actions) are
//! classified and credited to a per-user aggregate. A session tracker credits
//! continuous portal time in whole blocks and recovers uncredited time from a
//! local checkpoint after an ungraceful exit.
//!
//! ## Entry points
//!
//! 1. [`GamificationEngine`]: `track_*` activity events and read models.
//!
//! 2. [`SessionTracker`]: per-login portal-time tracking, built from an engine.

pub mod clock;
pub mod config;
pub mod error;
pub mod gamification;
pub mod identity;
pub mod session;
pub mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{EngagementError, Result};
pub use gamification::{GamificationEngine, PointsLedger};
pub use identity::{AuthContext, StaticIdentity};
pub use session::{SessionTracker, TrackerState};
pub use stats::{StatsStore, UserStats};
