mod tests {
    use shadowtrack::{
        layout::AppRegion,
        shadow::DenseShadow,
        tracker::{
            write::{AccessState, Mode},
            Tracker, WriteTracker,
        },
        GuestAddr,
    };

    const REGION: AppRegion = AppRegion::new(0x1000, 0x2000);
    const COUNTER_BITS: u32 = 2;
    const K: u64 = (1 << COUNTER_BITS) - 1;

    fn tracker() -> WriteTracker<DenseShadow> {
        WriteTracker::with_counter_bits(DenseShadow::new(REGION, 0), COUNTER_BITS, 16)
    }

    fn state(tracker: &WriteTracker<DenseShadow>, addr: GuestAddr) -> AccessState {
        AccessState::from_raw(tracker.shadow().value_at(addr))
    }

    fn write(tracker: &WriteTracker<DenseShadow>, pc: GuestAddr, addr: GuestAddr, len: usize) {
        tracker.range_access(pc, addr, len, true);
    }

    fn read(tracker: &WriteTracker<DenseShadow>, pc: GuestAddr, addr: GuestAddr, len: usize) {
        tracker.range_access(pc, addr, len, false);
    }

    #[test]
    fn test_state_machine_transitions() {
        let tracker = tracker();
        let x = 0x1100;
        assert_eq!(state(&tracker, x).mode(), Mode::Read);

        write(&tracker, 0x10, x, 1);
        assert_eq!(state(&tracker, x).mode(), Mode::WrittenOnce);

        write(&tracker, 0x11, x, 1);
        assert_eq!(state(&tracker, x).mode(), Mode::WrittenAgain);
        assert_eq!(state(&tracker, x).counter(), 1);

        // Any read resets the mode, whatever it was; the counter is a
        // long-term sampling budget and survives.
        read(&tracker, 0x12, x, 1);
        assert_eq!(state(&tracker, x).mode(), Mode::Read);
        assert_eq!(state(&tracker, x).counter(), 1);

        write(&tracker, 0x13, x, 1);
        assert_eq!(state(&tracker, x).mode(), Mode::WrittenOnce);
    }

    #[test]
    fn test_counter_saturates_before_escalation() {
        let tracker = tracker();
        let x = 0x1200;
        write(&tracker, 0x20, x, 1);
        for i in 0..K {
            write(&tracker, 0x21 + i as GuestAddr, x, 1);
        }
        // K write-after-write events fit in the counter; no finding yet.
        assert_eq!(state(&tracker, x).counter() as u64, K);
        assert!(tracker.findings().is_empty());

        // The K+1st escalates and seeds the count with everything the
        // counter absorbed.
        write(&tracker, 0x99, x, 1);
        let finding = tracker.findings().get(x).unwrap();
        assert_eq!(finding.count, K + 1);
        assert_eq!(finding.second_pc, 0x99);
        assert_eq!(finding.first_pc, None);
        assert!(state(&tracker, x).context_requested());
    }

    #[test]
    fn test_aggregator_counts_every_event() {
        let tracker = tracker();
        let x = 0x1300;
        write(&tracker, 0x30, x, 1);
        for i in 0..K + 2 {
            write(&tracker, 0x31 + i as GuestAddr, x, 1);
        }
        assert_eq!(tracker.findings().len(), 1);
        assert_eq!(tracker.findings().get(x).unwrap().count, K + 2);
    }

    #[test]
    fn test_read_clears_danger_window() {
        // write, read, write: not a defect.
        let tracker = tracker();
        let x = 0x1400;
        write(&tracker, 0x40, x, 4);
        read(&tracker, 0x41, x, 4);
        write(&tracker, 0x42, x, 4);
        assert!(tracker.findings().is_empty());
        for addr in x..x + 4 {
            assert_eq!(state(&tracker, addr).mode(), Mode::WrittenOnce);
        }
    }

    #[test]
    fn test_repeated_single_byte_writes() {
        let tracker = tracker();
        let x = 0x1500;
        let pcs: Vec<GuestAddr> = (0..K + 5).map(|i| 0x5000 + i as GuestAddr).collect();
        for pc in &pcs {
            write(&tracker, *pc, x, 1);
        }
        // K+5 writes with no reads: the first arms the state machine, the
        // counter soaks up K events, and the remaining 4 all reach the
        // table.
        assert_eq!(tracker.findings().len(), 1);
        let finding = tracker.findings().get(x).unwrap();
        assert_eq!(finding.count, K + 4);
        assert_eq!(finding.second_pc, *pcs.last().unwrap());
        assert_eq!(finding.first_pc, None);
    }

    #[test]
    fn test_first_pc_backfilled_after_read() {
        let tracker = tracker();
        let x = 0x1600;
        write(&tracker, 0x60, x, 1);
        for i in 0..=K {
            write(&tracker, 0x61 + i as GuestAddr, x, 1);
        }
        assert!(state(&tracker, x).context_requested());
        assert_eq!(tracker.findings().get(x).unwrap().first_pc, None);

        // The next read-then-write at this address reveals which write
        // opens the repeating pattern.
        read(&tracker, 0x70, x, 1);
        write(&tracker, 0x999, x, 1);
        assert!(!state(&tracker, x).context_requested());
        assert_eq!(tracker.findings().get(x).unwrap().first_pc, Some(0x999));

        // Later escalations keep the backfilled PC.
        write(&tracker, 0xaaa, x, 1);
        let finding = tracker.findings().get(x).unwrap();
        assert_eq!(finding.first_pc, Some(0x999));
        assert_eq!(finding.second_pc, 0xaaa);
    }

    #[test]
    fn test_multi_byte_range_tracks_per_byte() {
        let tracker = tracker();
        let x = 0x1700;
        write(&tracker, 0x80, x, 4);
        write(&tracker, 0x81, x, 4);
        // One write-after-write event per byte, all still sampled by the
        // in-cell counters.
        for addr in x..x + 4 {
            assert_eq!(state(&tracker, addr).mode(), Mode::WrittenAgain);
            assert_eq!(state(&tracker, addr).counter(), 1);
        }
        assert!(tracker.findings().is_empty());
        assert_eq!(state(&tracker, x + 4).counter(), 0);
    }

    #[test]
    fn test_distinct_addresses_get_distinct_findings() {
        let tracker = tracker();
        for x in [0x1800, 0x1900] {
            write(&tracker, 0x90, x, 1);
            for i in 0..=K {
                write(&tracker, 0x91 + i as GuestAddr, x, 1);
            }
        }
        assert_eq!(tracker.findings().len(), 2);
        assert!(tracker.findings().get(0x1800).is_some());
        assert!(tracker.findings().get(0x1900).is_some());
        assert!(tracker.findings().get(0x1a00).is_none());
    }
}
