//! Agglomerative (bottom-up) hierarchical clustering.
//!
//! ## The algorithm
//!
//! Start with every example in its own cluster. At each step, find the two closest
//! clusters and merge them. Recording the clusters after every step yields a
//! dendrogram: level 0 has `n` singletons, level `L` has `n - L` clusters.
//!
//! ```text
//! level0: {0} {1} {2} {3}
//! level1: {0,1} {2} {3}
//! level2: {0,1} {2,3}
//! ```
//!
//! "Closest" is defined by a [`Linkage`] over pairwise example distances:
//!
//! - **Single link**: distance of the closest member pair. Tends to chain.
//! - **Average link**: mean over all member pairs. More compact clusters.
//!
//! Example distance is the *squared* Euclidean distance; no square root is taken.
//!
//! ## Determinism
//!
//! Candidate pairs `(i, j)` with `i < j` are scanned in ascending `i`, then ascending
//! `j`. Among pairs at the minimal distance, the first one scanned is merged. Identical
//! inputs always produce identical merge sequences.
//!
//! ## Complexity
//!
//! - **Time**: each level scans O(k²) cluster pairs at O(|a|·|b|) per pair, for
//!   `depth` levels. No point-distance cache is kept between levels.
//! - **Space**: one cluster set per level; untouched clusters are shared between levels.
//!
//! ## Usage
//!
//! ```rust
//! use hclus::cluster::{HierarchicalMiner, Linkage};
//! use hclus::data::Dataset;
//!
//! let data = Dataset::from_rows(vec![vec![0.0], vec![1.0], vec![5.0], vec![6.0]]).unwrap();
//!
//! let mut miner = HierarchicalMiner::new(3).unwrap();
//! miner.mine(&data, &Linkage::Single).unwrap();
//!
//! let top = miner.dendrogram().cluster_set(2).unwrap();
//! assert_eq!(top.len(), 2);
//! assert_eq!(top.get(0).unwrap().to_string(), "0,1");
//! assert_eq!(top.get(1).unwrap().to_string(), "2,3");
//! ```

mod dendrogram;
mod group;
mod level;
mod linkage;
mod miner;
mod render;
mod snapshot;
mod traits;
mod util;

pub use dendrogram::Dendrogram;
pub use group::Cluster;
pub use level::{ClosestPair, ClusterSet};
pub use linkage::Linkage;
pub use miner::HierarchicalMiner;
pub use render::WithData;
pub use traits::ClusterDistance;
pub use util::squared_euclidean;
