mod tests {
    use shadowtrack::{
        layout::{AccessLayout, CoverageLayout, ShadowLayout, APP_REGIONS},
        GuestAddr,
    };

    fn samples(start: GuestAddr, end: GuestAddr) -> Vec<GuestAddr> {
        vec![
            start,
            start + 1,
            start + 8,
            start + (end - start) / 2,
            end - 8,
            end - 1,
        ]
    }

    #[test]
    fn test_round_trip_access_layout() {
        // 1:1 cells invert exactly, byte for byte. The vsyscall page is
        // excluded: its image aliases the library region's window (see
        // test_vsyscall_image_nested).
        for region in &APP_REGIONS[..3] {
            for addr in samples(region.start, region.end) {
                let shadow = AccessLayout::app_to_shadow(addr);
                assert_eq!(AccessLayout::shadow_to_app(shadow), Some(addr));
            }
        }
    }

    #[test]
    fn test_round_trip_coverage_layout() {
        // 8:1 cells invert to the first application byte of the cell.
        for region in &APP_REGIONS[..3] {
            for addr in samples(region.start, region.end) {
                let shadow = CoverageLayout::app_to_shadow(addr);
                assert_eq!(CoverageLayout::shadow_to_app(shadow), Some(addr & !7));
            }
        }
    }

    #[test]
    fn test_images_outside_app_regions() {
        for region in APP_REGIONS.iter() {
            for addr in samples(region.start, region.end) {
                assert!(AccessLayout::is_app(addr));
                assert!(!AccessLayout::is_app(AccessLayout::app_to_shadow(addr)));
                assert!(!CoverageLayout::is_app(CoverageLayout::app_to_shadow(addr)));
            }
        }
    }

    #[test]
    fn test_images_disjoint() {
        // The first three regions map to pairwise disjoint windows.
        for (i, a) in APP_REGIONS[..3].iter().enumerate() {
            for b in APP_REGIONS[..3].iter().skip(i + 1) {
                let (a_start, a_end) = AccessLayout::shadow_region(a);
                let (b_start, b_end) = AccessLayout::shadow_region(b);
                assert!(a_end <= b_start || b_end <= a_start);
                let (a_start, a_end) = CoverageLayout::shadow_region(a);
                let (b_start, b_end) = CoverageLayout::shadow_region(b);
                assert!(a_end <= b_start || b_end <= a_start);
            }
        }
    }

    #[test]
    fn test_vsyscall_image_nested() {
        // The vsyscall page's low bits fold into the library region's
        // window, so its image nests inside that region's image. This is
        // inherited from the mapping constants and documented: the one
        // 4KiB page aliases, everything else is injective.
        let (lib_start, lib_end) = AccessLayout::shadow_region(&APP_REGIONS[2]);
        let (vsys_start, vsys_end) = AccessLayout::shadow_region(&APP_REGIONS[3]);
        assert!(vsys_start >= lib_start && vsys_end <= lib_end);
    }

    #[test]
    fn test_no_self_aliasing() {
        // A wild access into the shadow window must never land back in
        // the shadow window, or the monitored program could corrupt the
        // engine's own cells.
        for region in APP_REGIONS.iter() {
            for addr in samples(region.start, region.end) {
                let shadow = AccessLayout::app_to_shadow(addr);
                assert!(AccessLayout::is_shadow(shadow));
                assert!(!AccessLayout::is_shadow(AccessLayout::app_to_shadow(shadow)));
                let shadow = CoverageLayout::app_to_shadow(addr);
                assert!(CoverageLayout::is_shadow(shadow));
                assert!(!CoverageLayout::is_shadow(CoverageLayout::app_to_shadow(
                    shadow
                )));
            }
        }
    }

    #[test]
    fn test_region_boundaries() {
        for region in APP_REGIONS.iter() {
            assert!(AccessLayout::is_app(region.start));
            assert!(AccessLayout::is_app(region.end - 1));
            assert!(!AccessLayout::is_app(region.start.wrapping_sub(1)));
            assert!(!AccessLayout::is_app(region.end));
        }
    }

    #[test]
    fn test_shadow_to_app_outside_images() {
        assert_eq!(AccessLayout::shadow_to_app(0x50), None);
        assert_eq!(AccessLayout::shadow_to_app(0x0000_5500_0000_0000), None);
        assert_eq!(CoverageLayout::shadow_to_app(usize::MAX), None);
    }
}
