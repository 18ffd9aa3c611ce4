//! # dense
//! A relocatable metadata store over a single caller-chosen region, backed
//! by an ordinary heap allocation instead of the fixed shadow window. Used
//! by tests and by embedders that cannot claim the process-wide window;
//! the cell contract and the racy access model are identical to
//! [`crate::shadow::GuestShadow`].
use core::cell::UnsafeCell;

use crate::{layout::AppRegion, shadow::ShadowMap, GuestAddr};

#[derive(Debug)]
pub struct DenseShadow {
    region: AppRegion,
    scale: u32,
    cells: UnsafeCell<Box<[u8]>>,
}

// Cells are raced on deliberately; the container itself is never resized
// or reallocated after construction.
unsafe impl Sync for DenseShadow {}

impl DenseShadow {
    /// Cover `region` with zeroed cells, one per `1 << scale` application
    /// bytes. `region.start` must be aligned to the cell ratio.
    pub fn new(region: AppRegion, scale: u32) -> DenseShadow {
        assert!(!region.is_empty());
        assert_eq!(region.start & ((1 << scale) - 1), 0);
        let len = (region.len() + (1 << scale) - 1) >> scale;
        DenseShadow {
            region,
            scale,
            cells: UnsafeCell::new(vec![0u8; len].into_boxed_slice()),
        }
    }

    pub fn region(&self) -> AppRegion {
        self.region
    }

    /// Current value of the cell covering `addr`.
    pub fn value_at(&self, addr: GuestAddr) -> u8 {
        unsafe { *self.cell(addr) }
    }
}

impl ShadowMap for DenseShadow {
    #[inline]
    fn cell(&self, addr: GuestAddr) -> *mut u8 {
        debug_assert!(self.region.contains(addr));
        let index = (addr - self.region.start) >> self.scale;
        unsafe { (*self.cells.get()).as_mut_ptr().add(index) }
    }
}
