use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::render::{Render, WithData};
use super::traits::ClusterDistance;
use super::Cluster;
use crate::data::Dataset;
use crate::error::{Error, Result};

/// The pair of clusters a merge step selected.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClosestPair {
    /// Position of the first cluster (always the smaller position).
    pub first: usize,
    /// Position of the second cluster.
    pub second: usize,
    /// Linkage distance between them.
    pub distance: f64,
}

/// All clusters at one dendrogram level.
///
/// A fixed-capacity arena of clusters addressed by position; `len()` slots are
/// populated, from position 0 upwards. Clusters are shared by reference between a
/// level and the level merged from it, so untouched clusters are never copied.
#[derive(Clone, Debug)]
pub struct ClusterSet {
    slots: Vec<Arc<Cluster>>,
    capacity: usize,
}

impl ClusterSet {
    /// Create an empty set able to hold `capacity` clusters.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of clusters.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of populated clusters.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if no cluster has been added.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Append `cluster` into the next free slot.
    ///
    /// Adding the very same cluster instance twice is a no-op; distinct clusters with
    /// equal members are both kept. Fails with [`Error::CapacityExceeded`] when full.
    pub fn add(&mut self, cluster: Arc<Cluster>) -> Result<()> {
        if self.slots.iter().any(|c| Arc::ptr_eq(c, &cluster)) {
            return Ok(());
        }
        if self.slots.len() >= self.capacity {
            return Err(Error::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.slots.push(cluster);
        Ok(())
    }

    /// Cluster at position `i`.
    pub fn get(&self, i: usize) -> Option<&Cluster> {
        self.slots.get(i).map(Arc::as_ref)
    }

    /// Populated clusters in positional order.
    pub fn iter(&self) -> impl Iterator<Item = &Cluster> + '_ {
        self.slots.iter().map(Arc::as_ref)
    }

    /// Find the closest pair of clusters under `distance`.
    ///
    /// Pairs are scanned with `i < j`, ascending `i` then ascending `j`; on ties the
    /// first pair scanned wins.
    pub fn closest_pair<D: ClusterDistance + ?Sized>(
        &self,
        distance: &D,
        data: &Dataset,
    ) -> Result<ClosestPair> {
        let n = self.slots.len();
        if n < 2 {
            return Err(Error::NotEnoughClusters { count: n });
        }

        let mut best: Option<ClosestPair> = None;
        for i in 0..n {
            for j in (i + 1)..n {
                let d = distance.distance(&self.slots[i], &self.slots[j], data);
                if best.map_or(true, |b| d < b.distance) {
                    best = Some(ClosestPair {
                        first: i,
                        second: j,
                        distance: d,
                    });
                }
            }
        }
        // n >= 2 guarantees at least one pair was scanned.
        best.ok_or(Error::NotEnoughClusters { count: n })
    }

    /// Merge the two closest clusters into a new set with one fewer cluster.
    ///
    /// `self` is left untouched. In the new set the merged cluster takes the position of
    /// the lower of the two merged clusters; every other cluster keeps its relative order.
    pub fn merge_closest_clusters<D: ClusterDistance + ?Sized>(
        &self,
        distance: &D,
        data: &Dataset,
    ) -> Result<ClusterSet> {
        let pair = self.closest_pair(distance, data)?;
        trace!(
            first = pair.first,
            second = pair.second,
            distance = pair.distance,
            "merging closest clusters"
        );
        self.merge_pair(pair.first, pair.second)
    }

    fn merge_pair(&self, first: usize, second: usize) -> Result<ClusterSet> {
        let merged = Arc::new(self.slots[first].merge(&self.slots[second]));
        let mut out = ClusterSet::new(self.slots.len() - 1);
        for (i, cluster) in self.slots.iter().enumerate() {
            if i == first {
                out.add(Arc::clone(&merged))?;
            } else if i != second {
                out.add(Arc::clone(cluster))?;
            }
        }
        Ok(out)
    }

    /// Render each cluster's members as example vectors from `data`.
    pub fn with_data<'a>(&'a self, data: &'a Dataset) -> WithData<'a, Self> {
        WithData { value: self, data }
    }
}

impl PartialEq for ClusterSet {
    fn eq(&self, other: &Self) -> bool {
        self.capacity == other.capacity
            && self.slots.len() == other.slots.len()
            && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl Render for ClusterSet {
    fn render(&self, f: &mut fmt::Formatter<'_>, data: Option<&Dataset>) -> fmt::Result {
        for (i, c) in self.slots.iter().enumerate() {
            write!(f, "cluster{i}:")?;
            c.render(f, data)?;
            f.write_str("\n")?;
        }
        Ok(())
    }
}

impl fmt::Display for ClusterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, None)
    }
}
