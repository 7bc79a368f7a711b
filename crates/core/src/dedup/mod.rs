//! Duplicate clustering and cleanup.

mod cluster;
mod sweep;

pub use cluster::{elect, removable, settled};
pub use sweep::{DedupSweeper, SweepError, SweepReport};
