//! # libc
//! `Mmap` implementation on top of `libc::mmap` and `libc::madvise`.
use core::ffi::c_void;

use log::trace;
use thiserror::Error;

use crate::{mmap::Mmap, GuestAddr};

#[derive(Debug)]
pub struct LibcMmap {
    addr: GuestAddr,
    len: usize,
}

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum LibcMmapError {
    #[error("mmap failed - addr: {0:#x}, len: {1:#x}, errno: {2}")]
    FailedToMap(GuestAddr, usize, i32),
    #[error("mapping landed at {1:#x}, requested {0:#x}")]
    WrongAddress(GuestAddr, GuestAddr),
    #[error("madvise failed - addr: {0:#x}, len: {1:#x}, advice: {2}, errno: {3}")]
    FailedToAdvise(GuestAddr, usize, i32, i32),
}

impl LibcMmap {
    fn advise(&self, advice: i32) -> Result<(), LibcMmapError> {
        let ret = unsafe { libc::madvise(self.addr as *mut c_void, self.len, advice) };
        if ret != 0 {
            return Err(LibcMmapError::FailedToAdvise(
                self.addr,
                self.len,
                advice,
                errno(),
            ));
        }
        Ok(())
    }
}

fn errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

impl Mmap for LibcMmap {
    type Error = LibcMmapError;

    fn reserve_fixed(addr: GuestAddr, len: usize) -> Result<LibcMmap, LibcMmapError> {
        trace!("reserve_fixed - addr: {addr:#x}, len: {len:#x}");
        let map = unsafe {
            libc::mmap(
                addr as *mut c_void,
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE
                    | libc::MAP_ANONYMOUS
                    | libc::MAP_NORESERVE
                    | libc::MAP_FIXED_NOREPLACE,
                -1,
                0,
            )
        };
        if map == libc::MAP_FAILED {
            return Err(LibcMmapError::FailedToMap(addr, len, errno()));
        }
        // Pre-4.17 kernels treat MAP_FIXED_NOREPLACE as a hint and may
        // place the mapping elsewhere instead of failing.
        if map as GuestAddr != addr {
            unsafe { libc::munmap(map, len) };
            return Err(LibcMmapError::WrongAddress(addr, map as GuestAddr));
        }
        Ok(LibcMmap { addr, len })
    }

    fn dont_dump(&self) -> Result<(), LibcMmapError> {
        self.advise(libc::MADV_DONTDUMP)
    }

    fn no_huge_pages(&self) -> Result<(), LibcMmapError> {
        self.advise(libc::MADV_NOHUGEPAGE)
    }

    fn addr(&self) -> GuestAddr {
        self.addr
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl Drop for LibcMmap {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.addr as *mut c_void, self.len);
        }
    }
}
