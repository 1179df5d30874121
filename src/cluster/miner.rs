use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::render::{Render, WithData};
use super::snapshot;
use super::traits::ClusterDistance;
use super::{Cluster, ClusterSet, Dendrogram};
use crate::data::Dataset;
use crate::error::{Error, Result};

/// Agglomerative clustering engine owning one [`Dendrogram`].
///
/// Built empty with a fixed depth, filled by a single [`mine`](Self::mine) pass, and
/// optionally saved to or restored from a snapshot file.
#[derive(Clone, Debug, PartialEq)]
pub struct HierarchicalMiner {
    dendrogram: Dendrogram,
}

impl HierarchicalMiner {
    /// Create a miner that will build `depth` levels.
    ///
    /// Fails with [`Error::InvalidDepth`] when `depth` is 0.
    pub fn new(depth: usize) -> Result<Self> {
        if depth == 0 {
            return Err(Error::InvalidDepth { depth: 0 });
        }
        Ok(Self {
            dendrogram: Dendrogram::new(depth),
        })
    }

    /// Create a miner from a signed depth as received on the wire.
    pub fn with_depth(depth: i32) -> Result<Self> {
        let depth = usize::try_from(depth).map_err(|_| Error::InvalidDepth {
            depth: i64::from(depth),
        })?;
        Self::new(depth)
    }

    pub(crate) fn from_dendrogram(dendrogram: Dendrogram) -> Self {
        Self { dendrogram }
    }

    /// Number of levels this miner builds.
    pub fn depth(&self) -> usize {
        self.dendrogram.depth()
    }

    /// The dendrogram built so far.
    pub fn dendrogram(&self) -> &Dendrogram {
        &self.dendrogram
    }

    /// Build the dendrogram for `data`.
    ///
    /// Level 0 puts every example in its own cluster; each following level merges the
    /// two closest clusters of the previous one. Fails with
    /// [`Error::NotEnoughClusters`] when `depth` exceeds the number of examples, since
    /// the last reachable level holds a single cluster.
    pub fn mine<D: ClusterDistance + ?Sized>(
        &mut self,
        data: &Dataset,
        distance: &D,
    ) -> Result<()> {
        let n = data.number_of_examples();
        let mut base = ClusterSet::new(n);
        for i in 0..n {
            base.add(Arc::new(Cluster::singleton(i)))?;
        }
        self.dendrogram.set_cluster_set(0, base);

        for level in 1..self.dendrogram.depth() {
            let Some(previous) = self.dendrogram.cluster_set(level - 1) else {
                break;
            };
            let next = previous.merge_closest_clusters(distance, data)?;
            debug!(level, clusters = next.len(), "built dendrogram level");
            self.dendrogram.set_cluster_set(level, next);
        }
        Ok(())
    }

    /// Write the whole dendrogram to `path` as a versioned snapshot.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        snapshot::save(&self.dendrogram, path.as_ref())
    }

    /// Restore a miner from a snapshot written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        snapshot::load(path.as_ref()).map(Self::from_dendrogram)
    }

    /// Render every level with members shown as example vectors from `data`.
    pub fn with_data<'a>(&'a self, data: &'a Dataset) -> WithData<'a, Self> {
        WithData { value: self, data }
    }
}

impl Render for HierarchicalMiner {
    fn render(&self, f: &mut fmt::Formatter<'_>, data: Option<&Dataset>) -> fmt::Result {
        self.dendrogram.render(f, data)
    }
}

impl fmt::Display for HierarchicalMiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, None)
    }
}
