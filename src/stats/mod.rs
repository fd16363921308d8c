//! Per-user engagement aggregate and its store
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │  PointsLedger   │     │   BadgeEngine   │
//! │ (award points)  │     │ (badge rules)   │
//! └────────┬────────┘     └────────┬────────┘
//!          │                       │
//!          └───────────┬───────────┘
//!                      ▼
//!              dyn StatsStore
//!        (SQLite file or in-memory map)
//! ```
//!
//! Every mutation is either an atomic increment of an additive counter or a
//! last-write-wins field set; the aggregate is never overwritten whole.

mod db;
mod memory;
mod models;
mod store;

pub use db::SqliteStatsStore;
pub use memory::MemoryStatsStore;
pub use models::{
    BadgeLogEntry, FieldUpdate, NewTransaction, PointTransaction, StatField, UserStats,
};
pub use store::StatsStore;
