//! Property tests for calendar month arithmetic.

use openrisk_core::Month;
use proptest::prelude::*;

proptest! {
    #[test]
    fn index_round_trips(x in -1_000_000i64..1_000_000) {
        let m = Month::from_index(x);
        prop_assert_eq!(Month::new(m.year(), m.month()).unwrap().index(), x);
    }

    #[test]
    fn text_round_trips(year in 0i64..=9999, month in 1u32..=12) {
        let m = Month::new(year, month).unwrap();
        let parsed: Month = m.to_string().parse().unwrap();
        prop_assert_eq!(parsed, m);
    }

    #[test]
    fn sequence_is_contiguous(start in 20_000i64..30_000, len in 0i64..120) {
        let a = Month::from_index(start);
        let b = a.offset(len - 1);
        let seq = Month::sequence(a, b);
        prop_assert_eq!(seq.len() as i64, len.max(0));
        for pair in seq.windows(2) {
            prop_assert_eq!(pair[0].months_until(pair[1]), 1);
        }
    }
}

#[test]
fn sequence_across_new_year() {
    let seq: Vec<String> = Month::sequence("2023-11".parse().unwrap(), "2024-02".parse().unwrap())
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(seq, ["2023-11", "2023-12", "2024-01", "2024-02"]);
}
