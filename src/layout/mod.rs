//! # layout
//! This module defines the application regions a monitored process may
//! legitimately touch and the affine mapping from an application address to
//! the shadow cell describing it. The mapping is a constant transform per
//! platform: fold the high bits with a mask, add the shadow window offset
//! and scale down by the cell ratio. It is branch-light, inlinable and
//! needs no bounds check on the hot path; the bounds hold by construction
//! and are validated once at startup by [`crate::shadow::GuestShadow`].
use crate::GuestAddr;

/// A half-open `[start, end)` range of legal application memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppRegion {
    pub start: GuestAddr,
    pub end: GuestAddr,
}

impl AppRegion {
    pub const fn new(start: GuestAddr, end: GuestAddr) -> AppRegion {
        AppRegion { start, end }
    }

    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub const fn contains(&self, addr: GuestAddr) -> bool {
        addr >= self.start && addr < self.end
    }
}

/// Application memory on Linux x86_64 falls into these four regions
/// (ignoring the corner case of PIE with a non-zero `PT_LOAD` base):
/// non-PIE executable plus heap, the PIE load region, libraries plus stack,
/// and the fixed vsyscall page.
///
/// The regions are static per platform and never change at runtime.
pub const APP_REGIONS: [AppRegion; 4] = [
    AppRegion::new(0x0000_0000_0000_0000, 0x0000_0100_0000_0000),
    AppRegion::new(0x0000_5500_0000_0000, 0x0000_5700_0000_0000),
    AppRegion::new(0x0000_7f00_0000_0000, 0x0000_8000_0000_0000),
    AppRegion::new(0xffff_ffff_ff60_0000, 0xffff_ffff_ff60_1000),
];

/// Folds all application regions into one contiguous window.
pub const SHADOW_MASK: GuestAddr = 0x0000_0fff_ffff_ffff;

/// Base of the reserved shadow window, chosen so that the images of all
/// application regions are disjoint from the regions themselves and so that
/// the mapping applied twice never lands back inside the shadow window
/// (a wild access into shadow memory cannot corrupt shadow memory).
pub const SHADOW_OFFSET: GuestAddr = 0x0000_1200_0000_0000;

/// The address mapping, parameterized over the cell-to-byte ratio.
///
/// `unmap(map(a))` recovers the first application byte covered by the cell
/// of `a`, so the round trip is exact at cell granularity (and exact per
/// byte when `SHADOW_SCALE` is zero).
pub trait ShadowLayout: Send + Sync + 'static {
    /// log2 of application bytes per shadow cell byte.
    const SHADOW_SCALE: u32;
    const SHADOW_MASK: GuestAddr = SHADOW_MASK;
    const SHADOW_OFFSET: GuestAddr = SHADOW_OFFSET;
    const APP_REGIONS: &'static [AppRegion] = &APP_REGIONS;

    /// Application bytes covered by one shadow cell byte.
    const CELL_RATIO: usize = 1 << Self::SHADOW_SCALE;

    #[inline]
    fn app_to_shadow(addr: GuestAddr) -> GuestAddr {
        ((addr & Self::SHADOW_MASK) + (Self::SHADOW_OFFSET << Self::SHADOW_SCALE))
            >> Self::SHADOW_SCALE
    }

    /// Inverse of [`Self::app_to_shadow`] at cell granularity. Returns
    /// `None` for addresses outside every region's image. Not used on the
    /// hot path.
    fn shadow_to_app(shadow: GuestAddr) -> Option<GuestAddr> {
        for region in Self::APP_REGIONS {
            let (start, end) = Self::shadow_region(region);
            if shadow >= start && shadow < end {
                let delta = (shadow - Self::app_to_shadow(region.start)) << Self::SHADOW_SCALE;
                return Some(region.start + delta);
            }
        }
        None
    }

    /// The image of an application region. The end is computed from the
    /// last in-range address; passing the open end itself through the map
    /// would fold it into the wrong window.
    #[inline]
    fn shadow_region(region: &AppRegion) -> (GuestAddr, GuestAddr) {
        (
            Self::app_to_shadow(region.start),
            Self::app_to_shadow(region.end - 1) + 1,
        )
    }

    #[inline]
    fn is_app(addr: GuestAddr) -> bool {
        Self::APP_REGIONS.iter().any(|r| r.contains(addr))
    }

    /// Debug and startup assertions only, never on the hot path.
    fn is_shadow(addr: GuestAddr) -> bool {
        Self::APP_REGIONS.iter().any(|r| {
            let (start, end) = Self::shadow_region(r);
            addr >= start && addr < end
        })
    }
}

/// 1 shadow bit per application byte (8:1), for touched-range coverage.
#[derive(Debug, Clone, Copy)]
pub struct CoverageLayout;

impl ShadowLayout for CoverageLayout {
    const SHADOW_SCALE: u32 = 3;
}

/// 1 shadow byte per application byte (1:1), for per-byte access state.
#[derive(Debug, Clone, Copy)]
pub struct AccessLayout;

impl ShadowLayout for AccessLayout {
    const SHADOW_SCALE: u32 = 0;
}
