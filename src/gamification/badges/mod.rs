//! Achievement badges: static catalog and evaluation

mod checker;
mod definitions;
mod engine;

pub use checker::newly_earned;
pub use definitions::{Badge, BadgeCategory, BadgeId, BADGES};
pub use engine::BadgeEngine;
