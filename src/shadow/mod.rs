//! # shadow
//! The metadata store: one fixed-size cell per monitored application byte,
//! reachable only through the address mapping in [`crate::layout`], never
//! allocated individually and always part of a contiguous backing range.
//!
//! Cells are plain, unsynchronized memory. Concurrent accesses to the same
//! cell race; lost updates and torn reads of multi-bit fields are an
//! accepted trade-off for avoiding a lock or atomic instruction on every
//! monitored byte access.
use core::marker::PhantomData;

use log::{debug, warn};
use thiserror::Error;

use crate::{
    layout::{AppRegion, ShadowLayout},
    mmap::Mmap,
    GuestAddr,
};

pub mod dense;

pub use dense::DenseShadow;

/// Access to the backing cells of the metadata store.
///
/// Contract: the cells of consecutive application cells within one region
/// are contiguous in memory, so the trackers may advance the returned
/// pointer instead of remapping every byte. Mutation through the returned
/// pointer is unsynchronized by design.
pub trait ShadowMap: Send + Sync {
    /// Pointer to the shadow cell covering `addr`.
    fn cell(&self, addr: GuestAddr) -> *mut u8;
}

/// The process-wide metadata store, backed by demand-paged reservations at
/// the fixed addresses mandated by the layout.
///
/// Construction reserves the image of every application region, hints the
/// OS away from huge pages and out of core dumps, and validates the
/// mapping invariants once. It must run before any monitored access and
/// before interceptors are installed; single-threaded initialization is a
/// documented precondition, not a checked one.
#[derive(Debug)]
pub struct GuestShadow<M: Mmap, L: ShadowLayout> {
    reservations: Vec<M>,
    _phantom: PhantomData<L>,
}

#[derive(Error, Debug)]
pub enum GuestShadowError<M: Mmap> {
    #[error("failed to reserve shadow window at {0:#x}: {1:?}")]
    FailedToReserve(GuestAddr, M::Error),
}

impl<M: Mmap, L: ShadowLayout> GuestShadow<M, L> {
    pub fn new() -> Result<GuestShadow<M, L>, GuestShadowError<M>> {
        let mut reservations: Vec<M> = Vec::new();
        for (i, region) in L::APP_REGIONS.iter().enumerate() {
            let (start, end) = L::shadow_region(region);
            debug!(
                "shadow window #{i}: {start:#x}-{end:#x} ({}GB)",
                (end - start) >> 30
            );
            // The vsyscall page folds into the library region's window, so
            // its image is already reserved.
            if reservations
                .iter()
                .any(|m| start >= m.addr() && end <= m.addr() + m.len())
            {
                debug!("shadow window #{i} nested in an earlier window");
                Self::sanity_check(region);
                continue;
            }
            let reservation = M::reserve_fixed(start, end - start)
                .map_err(|e| GuestShadowError::FailedToReserve(start, e))?;
            if let Err(e) = reservation.dont_dump() {
                warn!("failed to exclude shadow window from core dumps: {e:?}");
            }
            if let Err(e) = reservation.no_huge_pages() {
                warn!("failed to disable huge pages for shadow window: {e:?}");
            }
            reservations.push(reservation);
            Self::sanity_check(region);
        }
        Ok(GuestShadow {
            reservations,
            _phantom: PhantomData,
        })
    }

    /// Startup validation of the mapping invariants for one region. A
    /// violation means a platform/ABI mismatch, so it aborts rather than
    /// returning an error. Never called on the hot path.
    fn sanity_check(region: &AppRegion) {
        assert!(L::is_app(region.start));
        assert!(!L::is_app(region.start.wrapping_sub(1)));
        assert!(L::is_app(region.end - 1));
        assert!(!L::is_app(region.end));
        assert!(!L::is_shadow(region.start));
        assert!(!L::is_shadow(region.end - 1));
        assert!(L::is_shadow(L::app_to_shadow(region.start)));
        assert!(L::is_shadow(L::app_to_shadow(region.end - 1)));
        assert!(!L::is_shadow(L::app_to_shadow(L::app_to_shadow(
            region.start
        ))));
        assert!(!L::is_shadow(L::app_to_shadow(L::app_to_shadow(
            region.end - 1
        ))));
    }

    pub fn reservations(&self) -> &[M] {
        &self.reservations
    }
}

impl<M: Mmap, L: ShadowLayout> ShadowMap for GuestShadow<M, L> {
    #[inline]
    fn cell(&self, addr: GuestAddr) -> *mut u8 {
        L::app_to_shadow(addr) as *mut u8
    }
}
