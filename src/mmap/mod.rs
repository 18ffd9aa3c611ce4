//! # mmap
//! The operating-system seam used to back the shadow window. The store
//! initializer only ever needs fixed-address, lazily-committed reservations
//! plus a couple of advisory hints, so that is the whole trait surface.
use core::fmt::Debug;

use crate::GuestAddr;

pub mod libc;

pub use libc::LibcMmap;

/// One reservation of backing memory for part of the shadow window.
///
/// `reserve_fixed` must place the reservation at exactly the requested
/// address: the shadow mapping is a fixed-offset function, not a
/// relocatable one, so a reservation anywhere else is useless and must be
/// reported as an error. The reservation is released when the value is
/// dropped.
pub trait Mmap: Sized + Send + Sync {
    type Error: Debug;

    /// Reserve `len` bytes at exactly `addr`, demand-paged, without
    /// charging the full range up front.
    fn reserve_fixed(addr: GuestAddr, len: usize) -> Result<Self, Self::Error>;

    /// Hint that the range should be excluded from core dumps. Advisory,
    /// failure is reported but not fatal.
    fn dont_dump(&self) -> Result<(), Self::Error>;

    /// Hint that the range should not be backed by huge pages. Advisory.
    fn no_huge_pages(&self) -> Result<(), Self::Error>;

    fn addr(&self) -> GuestAddr;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
