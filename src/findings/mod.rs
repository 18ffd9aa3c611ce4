//! # findings
//! The aggregation table for detected write-after-write patterns. The
//! table is keyed by application address, sized once at construction and
//! never rehashed; collisions chain within a bucket, so a pathological
//! program touching more distinct hot addresses than the table was sized
//! for still gets correct lookups, just longer chains. It only sees the
//! rarer, pre-filtered events, so a brief blocking lock per bucket is
//! acceptable here where it would not be on the per-byte path.
use core::{
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicUsize, Ordering},
};
use ahash::RandomState;
use spin::{Mutex, MutexGuard};

use crate::GuestAddr;

/// Detailed context for one detected write-after-write address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finding {
    /// Total write-after-write events observed at this address.
    pub count: u64,
    /// PC of the first of the two conflicting writes. Only learned
    /// retroactively, once the address is written again after a read, so
    /// it stays `None` if that never happens.
    pub first_pc: Option<GuestAddr>,
    /// PC of the write that triggered the detection.
    pub second_pc: GuestAddr,
}

impl Finding {
    const fn new() -> Finding {
        Finding {
            count: 0,
            first_pc: None,
            second_pc: 0,
        }
    }
}

/// Default bucket count. A tuning constant, not derived from first
/// principles; chains absorb any overflow.
pub const DEFAULT_BUCKETS: usize = 31051;

type Chain = Vec<(GuestAddr, Finding)>;

#[derive(Debug)]
pub struct FindingMap {
    buckets: Box<[Mutex<Chain>]>,
    len: AtomicUsize,
    hasher: RandomState,
}

impl FindingMap {
    pub fn new() -> FindingMap {
        FindingMap::with_buckets(DEFAULT_BUCKETS)
    }

    pub fn with_buckets(buckets: usize) -> FindingMap {
        assert!(buckets > 0);
        FindingMap {
            buckets: (0..buckets).map(|_| Mutex::new(Vec::new())).collect(),
            len: AtomicUsize::new(0),
            hasher: RandomState::new(),
        }
    }

    fn chain(&self, addr: GuestAddr) -> MutexGuard<'_, Chain> {
        let index = self.hasher.hash_one(addr) as usize % self.buckets.len();
        self.buckets[index].lock()
    }

    /// Look up `addr`, creating a fresh entry if none exists. The handle
    /// reports whether the entry was created so callers can tell "new"
    /// from "repeat" without a second lookup.
    pub fn entry(&self, addr: GuestAddr) -> FindingHandle<'_> {
        let mut chain = self.chain(addr);
        let (index, created) = match chain.iter().position(|(a, _)| *a == addr) {
            Some(index) => (index, false),
            None => {
                chain.push((addr, Finding::new()));
                self.len.fetch_add(1, Ordering::Relaxed);
                (chain.len() - 1, true)
            }
        };
        FindingHandle {
            chain,
            index,
            created,
        }
    }

    /// Look up an existing entry only.
    pub fn get(&self, addr: GuestAddr) -> Option<FindingHandle<'_>> {
        let chain = self.chain(addr);
        chain
            .iter()
            .position(|(a, _)| *a == addr)
            .map(|index| FindingHandle {
                chain,
                index,
                created: false,
            })
    }

    /// Remove the entry for `addr`, reporting whether it existed.
    pub fn remove(&self, addr: GuestAddr) -> bool {
        let mut chain = self.chain(addr);
        match chain.iter().position(|(a, _)| *a == addr) {
            Some(index) => {
                chain.swap_remove(index);
                self.len.fetch_sub(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Approximate entry count; exact once all writers have quiesced.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every entry in bucket order. The order is unspecified and
    /// stable only within one run (the hasher is seeded per map).
    pub fn for_each(&self, mut f: impl FnMut(GuestAddr, &Finding)) {
        for bucket in self.buckets.iter() {
            let chain = bucket.lock();
            for (addr, finding) in chain.iter() {
                f(*addr, finding);
            }
        }
    }
}

impl Default for FindingMap {
    fn default() -> FindingMap {
        FindingMap::new()
    }
}

/// Scoped access to one entry. Holds the bucket lock and releases it on
/// every exit path when the handle is dropped.
#[derive(Debug)]
pub struct FindingHandle<'a> {
    chain: MutexGuard<'a, Chain>,
    index: usize,
    created: bool,
}

impl FindingHandle<'_> {
    /// Whether this handle created the entry it refers to.
    pub fn created(&self) -> bool {
        self.created
    }

    pub fn addr(&self) -> GuestAddr {
        self.chain[self.index].0
    }
}

impl Deref for FindingHandle<'_> {
    type Target = Finding;

    fn deref(&self) -> &Finding {
        &self.chain[self.index].1
    }
}

impl DerefMut for FindingHandle<'_> {
    fn deref_mut(&mut self) -> &mut Finding {
        &mut self.chain[self.index].1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_reports_creation() {
        let map = FindingMap::with_buckets(8);
        {
            let handle = map.entry(0x1000);
            assert!(handle.created());
            assert_eq!(handle.count, 0);
            assert_eq!(handle.first_pc, None);
        }
        let handle = map.entry(0x1000);
        assert!(!handle.created());
        assert_eq!(handle.addr(), 0x1000);
    }

    #[test]
    fn test_get_and_remove() {
        let map = FindingMap::with_buckets(8);
        assert!(map.get(0x2000).is_none());
        map.entry(0x2000).count = 7;
        assert_eq!(map.get(0x2000).unwrap().count, 7);
        assert_eq!(map.len(), 1);
        assert!(map.remove(0x2000));
        assert!(!map.remove(0x2000));
        assert!(map.get(0x2000).is_none());
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn test_single_bucket_chains() {
        let map = FindingMap::with_buckets(1);
        for i in 0..32 {
            map.entry(0x4000 + i * 8).count = i as u64;
        }
        assert_eq!(map.len(), 32);
        for i in 0..32 {
            assert_eq!(map.get(0x4000 + i * 8).unwrap().count, i as u64);
        }
    }

    #[test]
    fn test_for_each_visits_all() {
        let map = FindingMap::with_buckets(4);
        for addr in [0x10, 0x20, 0x30] {
            map.entry(addr).second_pc = addr + 1;
        }
        let mut seen = Vec::new();
        map.for_each(|addr, finding| {
            assert_eq!(finding.second_pc, addr + 1);
            seen.push(addr);
        });
        seen.sort_unstable();
        assert_eq!(seen, vec![0x10, 0x20, 0x30]);
    }

    #[test]
    fn test_concurrent_increments() {
        use std::sync::Arc;

        let map = Arc::new(FindingMap::with_buckets(4));
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let map = Arc::clone(&map);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        map.entry(0xabc0).count += 1;
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(map.get(0xabc0).unwrap().count, 4000);
    }
}
