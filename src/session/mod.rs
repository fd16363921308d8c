//! Active-time session tracking with crash recovery

mod checkpoint;
mod tracker;

pub use checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, SessionCheckpoint};
pub use tracker::{Credit, SessionTracker, TrackerState};
