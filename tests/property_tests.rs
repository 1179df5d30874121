use std::collections::BTreeSet;

use hclus::cluster::{ClusterDistance, HierarchicalMiner, Linkage};
use hclus::{Cluster, Dataset};
use proptest::prelude::*;

fn datasets() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (1usize..4).prop_flat_map(|d| {
        prop::collection::vec(prop::collection::vec(-10.0f64..10.0, d), 2..12)
    })
}

fn linkages() -> impl Strategy<Value = Linkage> {
    prop_oneof![Just(Linkage::Single), Just(Linkage::Average)]
}

fn members(c: &Cluster) -> BTreeSet<usize> {
    c.iter().collect()
}

proptest! {
    #[test]
    fn prop_level_sizes(rows in datasets(), linkage in linkages(), depth_seed in 0usize..64) {
        let n = rows.len();
        let depth = 1 + depth_seed % n;
        let data = Dataset::from_rows(rows).unwrap();

        let mut miner = HierarchicalMiner::new(depth).unwrap();
        miner.mine(&data, &linkage).unwrap();

        let d = miner.dendrogram();
        for level in 0..depth {
            let set = d.cluster_set(level).unwrap();
            prop_assert_eq!(set.len(), n - level);
        }
        for c in d.cluster_set(0).unwrap().iter() {
            prop_assert_eq!(c.size(), 1);
        }
    }

    #[test]
    fn prop_merge_is_union(rows in datasets(), linkage in linkages()) {
        let n = rows.len();
        let data = Dataset::from_rows(rows).unwrap();
        let mut miner = HierarchicalMiner::new(n).unwrap();
        miner.mine(&data, &linkage).unwrap();
        let d = miner.dendrogram();

        for level in 1..n {
            let before: Vec<_> = d.cluster_set(level - 1).unwrap().iter().map(members).collect();
            let after: Vec<_> = d.cluster_set(level).unwrap().iter().map(members).collect();

            // Exactly one new cluster, equal to the union of exactly two old ones.
            let new: Vec<_> = after.iter().filter(|c| !before.contains(c)).collect();
            prop_assert_eq!(new.len(), 1);
            let gone: Vec<_> = before.iter().filter(|c| !after.contains(c)).collect();
            prop_assert_eq!(gone.len(), 2);
            let union: BTreeSet<usize> = gone[0].union(gone[1]).copied().collect();
            prop_assert_eq!(&union, new[0]);

            // Every index appears exactly once per level.
            let mut all: Vec<usize> = after.iter().flatten().copied().collect();
            all.sort_unstable();
            prop_assert_eq!(all, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn prop_linkage_symmetric(rows in datasets(), split in 1usize..11) {
        let n = rows.len();
        let split = 1 + split % (n - 1);
        let data = Dataset::from_rows(rows).unwrap();
        let a: Cluster = (0..split).collect();
        let b: Cluster = (split..n).collect();

        for linkage in [Linkage::Single, Linkage::Average] {
            let ab = linkage.distance(&a, &b, &data);
            let ba = linkage.distance(&b, &a, &data);
            prop_assert!(ab >= 0.0);
            prop_assert!((ab - ba).abs() <= 1e-9 * ab.max(1.0), "{} vs {}", ab, ba);
        }
    }

    #[test]
    fn prop_deterministic(rows in datasets(), linkage in linkages()) {
        let n = rows.len();
        let data = Dataset::from_rows(rows).unwrap();
        let mut first = HierarchicalMiner::new(n).unwrap();
        let mut second = HierarchicalMiner::new(n).unwrap();
        first.mine(&data, &linkage).unwrap();
        second.mine(&data, &linkage).unwrap();
        prop_assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn prop_snapshot_round_trip(rows in datasets(), linkage in linkages()) {
        let n = rows.len();
        let data = Dataset::from_rows(rows).unwrap();
        let mut miner = HierarchicalMiner::new(n).unwrap();
        miner.mine(&data, &linkage).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.bin");
        miner.save(&path).unwrap();
        let restored = HierarchicalMiner::load(&path).unwrap();
        prop_assert_eq!(restored.to_string(), miner.to_string());
        prop_assert_eq!(
            restored.with_data(&data).to_string(),
            miner.with_data(&data).to_string()
        );
    }
}

#[test]
fn equal_distances_merge_in_scan_order() {
    // Points on a square: (0,1), (0,2), (1,3), (2,3) are all at squared distance 1.
    let rows = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]];
    let data = Dataset::from_rows(rows).unwrap();
    let mut miner = HierarchicalMiner::new(3).unwrap();
    miner.mine(&data, &Linkage::Single).unwrap();

    let level1: Vec<Vec<usize>> = miner
        .dendrogram()
        .cluster_set(1)
        .unwrap()
        .iter()
        .map(|c| c.iter().collect())
        .collect();
    assert_eq!(level1, vec![vec![0, 1], vec![2], vec![3]]);

    // {0,1}-{2} and {0,1}-{3} and {2}-{3} all tie at 1; the first scanned pair wins.
    let level2: Vec<Vec<usize>> = miner
        .dendrogram()
        .cluster_set(2)
        .unwrap()
        .iter()
        .map(|c| c.iter().collect())
        .collect();
    assert_eq!(level2, vec![vec![0, 1, 2], vec![3]]);
}
