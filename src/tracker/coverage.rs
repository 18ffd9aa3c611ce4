//! # coverage
//! The coverage access processor: one shadow bit per application byte,
//! set once a byte is touched by any access of any direction, never
//! cleared. Intended for fragmentation analysis over the life of the
//! process, so marking is monotonic and idempotent.
use core::ptr::write_unaligned;

use log::trace;

use crate::{hooks::RangeAccess, shadow::ShadowMap, tracker::Tracker, GuestAddr};

/// Application bytes covered by one shadow cell byte.
const CELL_BITS: usize = 8;

#[derive(Debug)]
pub struct CoverageTracker<S: ShadowMap> {
    shadow: S,
}

impl<S: ShadowMap> CoverageTracker<S> {
    pub fn new(shadow: S) -> CoverageTracker<S> {
        CoverageTracker { shadow }
    }

    pub fn shadow(&self) -> &S {
        &self.shadow
    }

    /// Mark every bit covering `[addr, addr + len)`. Three phases keep it
    /// cheap: a masked write for the unaligned head, whole-word stores for
    /// the aligned bulk, a masked write for the tail. A range that starts
    /// and ends inside one cell collapses into a single combined mask.
    pub fn mark(&self, addr: GuestAddr, mut len: usize) {
        if len == 0 {
            return;
        }
        let mut shadow = self.shadow.cell(addr);
        let head = addr % CELL_BITS;
        if head != 0 {
            let n = usize::min(CELL_BITS - head, len);
            let mask = (((1u16 << n) - 1) as u8) << head;
            // Racy |= on a shared cell; a concurrent marker may be lost.
            unsafe { *shadow |= mask };
            if head + n < CELL_BITS {
                return;
            }
            len -= n;
            shadow = unsafe { shadow.add(1) };
        }
        while len >= CELL_BITS * 4 {
            unsafe { write_unaligned(shadow as *mut u32, !0u32) };
            shadow = unsafe { shadow.add(4) };
            len -= CELL_BITS * 4;
        }
        while len >= CELL_BITS {
            unsafe { *shadow = !0u8 };
            shadow = unsafe { shadow.add(1) };
            len -= CELL_BITS;
        }
        if len > 0 {
            let mask = (1u8 << len) - 1;
            unsafe { *shadow |= mask };
        }
    }
}

impl<S: ShadowMap> Tracker for CoverageTracker<S> {
    fn range_access(&self, pc: GuestAddr, addr: GuestAddr, len: usize, is_write: bool) {
        trace!("coverage - pc: {pc:#x}, addr: {addr:#x}, len: {len:#x}, write: {is_write}");
        // Coverage is direction-agnostic.
        self.mark(addr, len);
    }
}

impl<S: ShadowMap> RangeAccess for CoverageTracker<S> {
    fn read_range(&self, pc: GuestAddr, addr: GuestAddr, len: usize) {
        self.range_access(pc, addr, len, false);
    }

    fn write_range(&self, pc: GuestAddr, addr: GuestAddr, len: usize) {
        self.range_access(pc, addr, len, true);
    }
}
