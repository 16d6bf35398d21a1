//! Property tests for windowing, composites and scoring.

use std::collections::BTreeSet;

use openrisk_core::config::CompositeCombinator;
use openrisk_core::Month;
use openrisk_signals::labels::soft_from_score;
use openrisk_signals::scoring::{confidence, ConfidenceInputs};
use openrisk_signals::window::{candidate_ends, composite_flags, k_of_n_flags};
use proptest::prelude::*;

fn true_indices(flags: &[bool]) -> BTreeSet<usize> {
    flags
        .iter()
        .enumerate()
        .filter_map(|(i, f)| f.then_some(i))
        .collect()
}

proptest! {
    #[test]
    fn lowering_k_never_removes_candidates(
        flags in prop::collection::vec(any::<bool>(), 0..40),
        n in 1usize..8,
        k_seed in 0usize..8,
    ) {
        let k = k_seed % n + 1;
        let strict = true_indices(&k_of_n_flags(&flags, k, n));
        for lower in 1..k {
            let relaxed = true_indices(&k_of_n_flags(&flags, lower, n));
            prop_assert!(strict.is_subset(&relaxed));
        }
    }

    #[test]
    fn widening_n_never_removes_candidates(
        flags in prop::collection::vec(any::<bool>(), 0..40),
        k in 1usize..5,
        extra in 0usize..5,
    ) {
        let n = k + extra;
        let narrow = true_indices(&k_of_n_flags(&flags, k, n));
        let wide = true_indices(&k_of_n_flags(&flags, k, n + 1));
        prop_assert!(narrow.is_subset(&wide));
    }

    #[test]
    fn all_true_sequence_fires_from_n_minus_one(len in 1usize..30, n_seed in 0usize..30, k_seed in 0usize..30) {
        let n = n_seed % len + 1;
        let k = k_seed % n + 1;
        let ends = candidate_ends(&vec![true; len], k, n);
        for i in (n - 1)..len {
            prop_assert!(ends.contains(&i));
        }
    }

    #[test]
    fn m_of_n_composite_counts_active_signals(
        active in prop::collection::vec(prop::collection::vec(any::<bool>(), 6), 1..5),
        m_seed in 0usize..5,
    ) {
        let start: Month = "2024-01".parse().unwrap();
        let periods = Month::sequence(start, start.offset(5));
        let fired: Vec<BTreeSet<Month>> = active
            .iter()
            .map(|row| periods.iter().zip(row).filter(|(_, on)| **on).map(|(m, _)| *m).collect())
            .collect();
        let refs: Vec<&BTreeSet<Month>> = fired.iter().collect();
        let m = m_seed % refs.len() + 1;

        let flags = composite_flags(&periods, &refs, CompositeCombinator::MOfN { m });
        for (i, flag) in flags.iter().enumerate() {
            let count = active.iter().filter(|row| row[i]).count();
            prop_assert_eq!(*flag, count >= m);
        }
    }

    #[test]
    fn confidence_bounded_and_non_increasing_in_uncertainty(
        base in 0.0f64..=1.0,
        raw in 0.0f64..=1.0,
        coverage in 0.0f64..=1.0,
        low in 0.0f64..100.0,
        delta in 0.0f64..100.0,
    ) {
        let at = |u: f64| confidence(ConfidenceInputs {
            base,
            raw_ratio: raw,
            window_coverage: coverage,
            forecast_uncertainty: u,
        });
        let a = at(low);
        let b = at(low + delta);
        prop_assert!((0.0..=1.0).contains(&a));
        prop_assert!((0.0..=1.0).contains(&at(f64::INFINITY)));
        prop_assert!(b <= a);
    }

    #[test]
    fn soft_score_is_monotonic(score in 0.0f64..500.0, delta in 0.001f64..100.0, scale in 1.0f64..200.0) {
        let a = soft_from_score(score, scale);
        let b = soft_from_score(score + delta, scale);
        prop_assert!((0.0..=1.0).contains(&a));
        prop_assert!(b >= a);
    }
}
