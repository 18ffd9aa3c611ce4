//! # shadowtrack
//! `shadowtrack` is a shadow-memory access-tracking runtime. For every byte
//! of the monitored process's address space it keeps an out-of-band metadata
//! cell reachable through a fixed affine address mapping, and uses those
//! cells to detect one of two behavioral patterns:
//!
//! - repeated unread overwrites of the same byte ("write-after-write"), or
//! - accumulated touched-range coverage for fragmentation analysis.
//!
//! The crate is split along the seams of the engine:
//!
//! - [`layout`] - the application-to-shadow address mapping and the legal
//!   application regions.
//! - [`mmap`] - the OS reservation seam used to back the shadow window.
//! - [`shadow`] - the metadata store, one fixed-size cell per monitored byte.
//! - [`tracker`] - the access processors (coverage and write-after-write).
//! - [`findings`] - the fixed-capacity aggregation table for detections.
//! - [`report`] - the shutdown report emitter.
//! - [`options`] - the process-wide options string.
//! - [`hooks`] - the capability interface the interception layer calls into.
//! - [`host`] - the process-wide runtime lifecycle (`initialize`,
//!   `process_access` and friends, `finalize`).
//!
//! Metadata cells are deliberately accessed without locks or atomics;
//! concurrent accesses to the same cell race and the resulting lost updates
//! are an accepted bounded-inaccuracy trade-off. See the [`tracker`] module
//! for the precise windows.
#[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
compile_error!("shadowtrack supports Linux x86_64 only");

pub mod findings;
pub mod hooks;
pub mod host;
pub mod layout;
pub mod mmap;
pub mod options;
pub mod report;
pub mod shadow;
pub mod tracker;

/// An address in the monitored program.
pub type GuestAddr = usize;

pub use host::{
    finalize, initialize, process_access, process_range_access, process_unaligned_access,
};
