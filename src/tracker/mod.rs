//! # tracker
//! The access processors. Given a program counter, an address range and a
//! direction, a tracker updates the metadata cells covering the range and
//! runs its per-byte detection logic:
//!
//! - [`coverage::CoverageTracker`] marks a monotonic "ever touched" bit per
//!   byte, direction-agnostic, with word-at-a-time bulk marking.
//! - [`write::WriteTracker`] runs the write-after-write state machine per
//!   byte and escalates saturated addresses into the finding table.
//!
//! Both trackers mutate cells without locks or atomics. Two threads
//! touching the same cell can lose one of the updates, and a multi-field
//! cell can be observed mid-update; this bounded inaccuracy is the
//! documented cost of keeping the per-access path free of synchronization.
pub mod coverage;
pub mod write;

pub use coverage::CoverageTracker;
pub use write::WriteTracker;

use crate::GuestAddr;

/// One access processor. Multiple application threads may call
/// `range_access` concurrently; implementations must not lock on the
/// per-cell path.
pub trait Tracker: Send + Sync {
    fn range_access(&self, pc: GuestAddr, addr: GuestAddr, len: usize, is_write: bool);
}
