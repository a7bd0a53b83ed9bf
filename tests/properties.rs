//! Property-based tests over random document collections

mod common;

use common::{Reference, build};
use pfp_dap::BuildConfig;
use pfp_dap::index::MAX_LCP;
use proptest::prelude::*;
use tempfile::tempdir;

fn documents() -> impl Strategy<Value = Vec<Vec<u8>>> {
    let doc = prop::collection::vec(prop::sample::select(b"ACGT".to_vec()), 1..60);
    prop::collection::vec(doc, 1..5)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// BWT, LCP and run samples equal the sorted-suffix reference
    #[test]
    fn prop_bwt_and_lcp_match(docs in documents(), window in 2usize..6, modulus in 1u64..9) {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("idx");
        let (boundaries, stats, files) = build(&docs, window, modulus, &prefix, &BuildConfig::default());
        let reference = Reference::new(&boundaries);

        prop_assert_eq!(files.bwt(), reference.bwt.clone());
        prop_assert_eq!(files.lcp(), reference.lcp.clone());
        prop_assert_eq!(stats.total_len as usize, reference.len());

        let starts: Vec<(u64, u64)> = (0..reference.len())
            .filter(|&i| reference.is_start(i))
            .map(|i| (i as u64, reference.sa[i] as u64))
            .collect();
        prop_assert_eq!(files.start_samples(), starts);
    }

    /// Every boundary profile equals the best match on either side, and no
    /// entry exceeds the cap
    #[test]
    fn prop_profiles_match(docs in documents(), window in 2usize..5, modulus in 1u64..6) {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("idx");
        let (boundaries, _, files) = build(&docs, window, modulus, &prefix, &BuildConfig::default());
        let reference = Reference::new(&boundaries);

        let ends: Vec<usize> = (0..reference.len()).filter(|&i| reference.is_end(i)).collect();
        let profiles = files.end_profiles();
        prop_assert_eq!(profiles.len(), ends.len());
        for (entry, &i) in profiles.iter().zip(&ends) {
            prop_assert_eq!(&entry.values, &reference.profile(i));
            prop_assert!(entry.values.iter().all(|&v| v <= MAX_LCP));
        }
    }
}
