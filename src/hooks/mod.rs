//! # hooks
//! The capability interface the interception layer calls into. How the
//! interceptors are installed is out of scope; each intercepted library or
//! system call merely computes an address range and forwards it here as a
//! read or a write. The helpers below translate the common higher-level
//! operation categories into range accesses, one helper per category.
use log::trace;

use crate::GuestAddr;

/// Range-granular access reporting. Both trackers implement it by
/// forwarding into their `range_access` with the direction filled in.
pub trait RangeAccess: Send + Sync {
    fn read_range(&self, pc: GuestAddr, addr: GuestAddr, len: usize);
    fn write_range(&self, pc: GuestAddr, addr: GuestAddr, len: usize);
}

/// memcpy/memmove-style: `n` bytes read from `src`, written to `dst`.
pub fn copy<R: RangeAccess + ?Sized>(
    ranges: &R,
    pc: GuestAddr,
    dst: GuestAddr,
    src: GuestAddr,
    n: usize,
) {
    trace!("copy - pc: {pc:#x}, dst: {dst:#x}, src: {src:#x}, n: {n:#x}");
    if n == 0 {
        return;
    }
    ranges.read_range(pc, src, n);
    ranges.write_range(pc, dst, n);
}

/// memset-style: `n` bytes written to `dst`.
pub fn set<R: RangeAccess + ?Sized>(ranges: &R, pc: GuestAddr, dst: GuestAddr, n: usize) {
    trace!("set - pc: {pc:#x}, dst: {dst:#x}, n: {n:#x}");
    if n == 0 {
        return;
    }
    ranges.write_range(pc, dst, n);
}

/// memcmp/strcmp-style: `n` bytes read from both operands.
pub fn compare<R: RangeAccess + ?Sized>(
    ranges: &R,
    pc: GuestAddr,
    a: GuestAddr,
    b: GuestAddr,
    n: usize,
) {
    trace!("compare - pc: {pc:#x}, a: {a:#x}, b: {b:#x}, n: {n:#x}");
    if n == 0 {
        return;
    }
    ranges.read_range(pc, a, n);
    ranges.read_range(pc, b, n);
}

/// strlen/memchr-style: the scanned prefix of `n` bytes is read.
pub fn scan<R: RangeAccess + ?Sized>(ranges: &R, pc: GuestAddr, addr: GuestAddr, n: usize) {
    trace!("scan - pc: {pc:#x}, addr: {addr:#x}, n: {n:#x}");
    if n == 0 {
        return;
    }
    ranges.read_range(pc, addr, n);
}

/// read(2)/mmap-fill-style: the kernel or device wrote `n` bytes into
/// memory at `dst`.
pub fn transfer_in<R: RangeAccess + ?Sized>(ranges: &R, pc: GuestAddr, dst: GuestAddr, n: usize) {
    trace!("transfer_in - pc: {pc:#x}, dst: {dst:#x}, n: {n:#x}");
    if n == 0 {
        return;
    }
    ranges.write_range(pc, dst, n);
}

/// write(2)-style: `n` bytes at `src` were read out of memory.
pub fn transfer_out<R: RangeAccess + ?Sized>(ranges: &R, pc: GuestAddr, src: GuestAddr, n: usize) {
    trace!("transfer_out - pc: {pc:#x}, src: {src:#x}, n: {n:#x}");
    if n == 0 {
        return;
    }
    ranges.read_range(pc, src, n);
}
