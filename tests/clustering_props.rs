use news_threads::cluster::{adaptive_threshold, Dbscan};
use proptest::prelude::*;
use std::collections::HashSet;

// Strategy: small batches of short vectors with a few recurring directions
fn arb_vectors() -> impl Strategy<Value = Vec<Vec<f32>>> {
    prop::collection::vec(prop::collection::vec(-2.0f32..2.0, 4), 0..60)
}

proptest! {
    #[test]
    fn test_every_index_assigned_once(vectors in arb_vectors(), eps in 0.5f32..1.0, min_pts in 0usize..8) {
        let dbscan = Dbscan::new(&vectors, eps, min_pts);

        let mut seen: Vec<usize> = dbscan.assignments().iter().map(|a| a.index).collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..vectors.len()).collect::<Vec<_>>());

        let ids: HashSet<usize> = dbscan.assignments().iter().map(|a| a.cluster_id).collect();
        prop_assert!(ids.iter().all(|&id| id >= 1));
        prop_assert_eq!(ids.len(), dbscan.size());
    }

    #[test]
    fn test_first_member_has_max_weight(vectors in arb_vectors(), eps in 0.5f32..1.0) {
        let dbscan = Dbscan::new(&vectors, eps, 4);

        let groups = dbscan.groups();
        prop_assert_eq!(groups.len(), dbscan.size());
        for group in groups {
            let first = group[0].weight;
            prop_assert!(group.iter().all(|a| a.weight <= first));
            prop_assert!(group.iter().all(|a| a.cluster_id == group[0].cluster_id));
        }
    }

    #[test]
    fn test_threshold_monotone(eps in 0.0f32..1.0, n in 0usize..10_000, step in 1usize..500) {
        prop_assert!(adaptive_threshold(eps, n) <= adaptive_threshold(eps, n + step));
    }
}
