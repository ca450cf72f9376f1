// tests/progress_properties.rs

use proptest::prelude::*;
use shelfjobs::progress::{remap_percent, ProgressStore};

proptest! {
    #[test]
    fn ratio_matches_floor_formula(current in 0i64..10_000, total in 1i64..10_000) {
        let store = ProgressStore::new();
        store.set_progress_ratio("Library.Scan", current, total);
        let expected = (current * 100 / total) as i32;
        prop_assert_eq!(store.get_progress("Library.Scan"), Some(expected));
    }

    #[test]
    fn non_positive_totals_yield_zero(
        current in -100i64..100,
        total in -100i64..=0,
        item in 0i64..=100,
    ) {
        let store = ProgressStore::new();
        store.set_progress_ratio("a.b", current, total);
        prop_assert_eq!(store.get_progress("a.b"), Some(0));
        store.set_progress_items("a.b", current, total, item);
        prop_assert_eq!(store.get_progress("a.b"), Some(0));
    }

    #[test]
    fn weighted_items_stay_in_range_and_grow(
        total in 1i64..50,
        raw_current in 0i64..50,
        item in 0i64..=100,
    ) {
        let current = raw_current % total;
        let store = ProgressStore::new();

        store.set_progress_items("Cloud.Sync", current, total, item);
        let pct = store.get_progress("Cloud.Sync").unwrap();
        prop_assert!((0..=100).contains(&pct));
        prop_assert_eq!(pct as i64, (current * 100 + item) / total);

        // Finishing the item never moves the bar backwards.
        store.set_progress_items("Cloud.Sync", current, total, 100);
        prop_assert!(store.get_progress("Cloud.Sync").unwrap() >= pct);
    }

    #[test]
    fn remapped_percent_stays_in_its_band(pct in 0i32..=100, base in 0i32..50, span in 0i32..=50) {
        let mapped = remap_percent(pct, base, span);
        prop_assert!(mapped >= base);
        prop_assert!(mapped <= base + span);
    }
}
