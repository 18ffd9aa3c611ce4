//! # write
//! The write-after-write access processor. Each application byte has a
//! one-byte state cell: a mode, a "context requested" flag and a small
//! saturating counter. Reads clear the danger window; a write landing on
//! an already-written byte is a write-after-write event. The in-cell
//! counter samples away the common hot-address repeats so that only
//! addresses that keep misbehaving pay for a trip to the finding table.
//!
//! Known limitation: because both the state and the counter live at a
//! fixed per-byte location, a pattern whose repeated overwrites move
//! across different addresses is undercounted. That is the cost of the
//! data-oriented approach, not a bug.
use log::{debug, trace};

use crate::{
    findings::FindingMap, hooks::RangeAccess, shadow::ShadowMap, tracker::Tracker, GuestAddr,
};

/// Access history of one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read = 0,
    WrittenOnce = 1,
    WrittenAgain = 2,
}

/// Width of the in-cell saturating counter. The default is a tuning
/// constant, not derived from first principles; anything in
/// `1..=MAX_COUNTER_BITS` fits the cell.
pub const DEFAULT_COUNTER_BITS: u32 = 5;
pub const MAX_COUNTER_BITS: u32 = 5;

/// One shadow cell: mode in bits 0..2, context-requested in bit 2, the
/// counter in bits 3..8. Packed into a single byte so the store stays at
/// a 1:1 ratio with application memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessState(u8);

impl AccessState {
    const MODE_MASK: u8 = 0b11;
    const CONTEXT_BIT: u8 = 1 << 2;
    const COUNTER_SHIFT: u32 = 3;

    pub fn from_raw(raw: u8) -> AccessState {
        AccessState(raw)
    }

    pub fn raw(self) -> u8 {
        self.0
    }

    pub fn mode(self) -> Mode {
        match self.0 & Self::MODE_MASK {
            0 => Mode::Read,
            1 => Mode::WrittenOnce,
            _ => Mode::WrittenAgain,
        }
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.0 = (self.0 & !Self::MODE_MASK) | mode as u8;
    }

    pub fn context_requested(self) -> bool {
        self.0 & Self::CONTEXT_BIT != 0
    }

    pub fn set_context_requested(&mut self, requested: bool) {
        if requested {
            self.0 |= Self::CONTEXT_BIT;
        } else {
            self.0 &= !Self::CONTEXT_BIT;
        }
    }

    pub fn counter(self) -> u8 {
        self.0 >> Self::COUNTER_SHIFT
    }

    pub fn set_counter(&mut self, value: u8) {
        self.0 = (self.0 & ((1 << Self::COUNTER_SHIFT) - 1)) | (value << Self::COUNTER_SHIFT);
    }
}

#[derive(Debug)]
pub struct WriteTracker<S: ShadowMap> {
    shadow: S,
    findings: FindingMap,
    counter_max: u8,
}

impl<S: ShadowMap> WriteTracker<S> {
    pub fn new(shadow: S) -> WriteTracker<S> {
        WriteTracker {
            shadow,
            findings: FindingMap::new(),
            counter_max: ((1u32 << DEFAULT_COUNTER_BITS) - 1) as u8,
        }
    }

    /// `counter_bits` is clamped to `1..=MAX_COUNTER_BITS`; `buckets`
    /// sizes the finding table.
    pub fn with_counter_bits(shadow: S, counter_bits: u32, buckets: usize) -> WriteTracker<S> {
        let bits = counter_bits.clamp(1, MAX_COUNTER_BITS);
        WriteTracker {
            shadow,
            findings: FindingMap::with_buckets(buckets),
            counter_max: ((1u32 << bits) - 1) as u8,
        }
    }

    pub fn shadow(&self) -> &S {
        &self.shadow
    }

    pub fn findings(&self) -> &FindingMap {
        &self.findings
    }

    pub fn counter_max(&self) -> u8 {
        self.counter_max
    }

    /// A write landed on a byte that was already in a written mode. While
    /// the in-cell counter has headroom this stays a cheap local
    /// increment; once it saturates, the address has earned an entry in
    /// the finding table.
    fn record_overwrite(&self, pc: GuestAddr, addr: GuestAddr, state: &mut AccessState) {
        if state.counter() < self.counter_max {
            state.set_counter(state.counter() + 1);
            return;
        }
        let mut handle = self.findings.entry(addr);
        if handle.created() {
            handle.count = u64::from(self.counter_max) + 1;
            handle.second_pc = pc;
            // The PC of the write that ended the pattern is known now; the
            // PC of the first conflicting write is only learned from a
            // future read-then-write at this address.
            state.set_context_requested(true);
            debug!("new write-after-write at {addr:#x}, pc {pc:#x}");
        } else {
            handle.count += 1;
            handle.second_pc = pc;
            debug!("write-after-write repeat at {addr:#x}: count {}", handle.count);
        }
    }

    fn backfill_first_pc(&self, pc: GuestAddr, addr: GuestAddr) {
        if let Some(mut handle) = self.findings.get(addr) {
            handle.first_pc = Some(pc);
        }
    }
}

impl<S: ShadowMap> Tracker for WriteTracker<S> {
    /// Per-byte iteration; no bulk-word shortcut, because the transition
    /// depends on direction and prior state.
    fn range_access(&self, pc: GuestAddr, start: GuestAddr, len: usize, is_write: bool) {
        trace!(
            "waw - pc: {pc:#x}, addr: {start:#x}, len: {len:#x}, write: {is_write}"
        );
        for i in 0..len {
            let addr = start + i;
            let cell = self.shadow.cell(addr);
            // Unsynchronized read-modify-write: a concurrent access to the
            // same byte can be lost or observed torn across the mode,
            // flag and counter fields. Accepted by design.
            let mut state = AccessState(unsafe { *cell });
            if !is_write {
                state.set_mode(Mode::Read);
            } else if state.mode() == Mode::Read {
                state.set_mode(Mode::WrittenOnce);
                if state.context_requested() {
                    self.backfill_first_pc(pc, addr);
                    state.set_context_requested(false);
                }
            } else {
                if state.mode() == Mode::WrittenOnce {
                    state.set_mode(Mode::WrittenAgain);
                }
                self.record_overwrite(pc, addr, &mut state);
            }
            unsafe { *cell = state.raw() };
        }
    }
}

impl<S: ShadowMap> RangeAccess for WriteTracker<S> {
    fn read_range(&self, pc: GuestAddr, addr: GuestAddr, len: usize) {
        self.range_access(pc, addr, len, false);
    }

    fn write_range(&self, pc: GuestAddr, addr: GuestAddr, len: usize) {
        self.range_access(pc, addr, len, true);
    }
}
