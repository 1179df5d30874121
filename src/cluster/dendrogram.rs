use std::fmt;

use super::render::{Render, WithData};
use super::ClusterSet;
use crate::data::Dataset;

/// Merge history: one [`ClusterSet`] slot per depth level.
///
/// Level 0 holds one singleton per example; level `L` holds `n - L` clusters. Slots the
/// miner never reached stay empty. This type only stores levels; ordering is up to
/// the miner.
#[derive(Clone, Debug, PartialEq)]
pub struct Dendrogram {
    levels: Vec<Option<ClusterSet>>,
}

impl Dendrogram {
    /// Dendrogram with `depth` empty levels.
    pub fn new(depth: usize) -> Self {
        Self {
            levels: vec![None; depth],
        }
    }

    /// Number of level slots.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Store `set` at `level`. Returns `false` (and stores nothing) if `level >= depth`.
    pub fn set_cluster_set(&mut self, level: usize, set: ClusterSet) -> bool {
        match self.levels.get_mut(level) {
            Some(slot) => {
                *slot = Some(set);
                true
            }
            None => false,
        }
    }

    /// Cluster set at `level`, if that level was built.
    pub fn cluster_set(&self, level: usize) -> Option<&ClusterSet> {
        self.levels.get(level).and_then(Option::as_ref)
    }

    /// All level slots, shallowest first.
    pub fn levels(&self) -> &[Option<ClusterSet>] {
        &self.levels
    }

    /// Largest example index referenced by any level.
    pub fn max_index(&self) -> Option<usize> {
        self.levels
            .iter()
            .flatten()
            .flat_map(ClusterSet::iter)
            .filter_map(|c| c.max_index())
            .max()
    }

    /// Render every level with members shown as example vectors from `data`.
    pub fn with_data<'a>(&'a self, data: &'a Dataset) -> WithData<'a, Self> {
        WithData { value: self, data }
    }
}

impl Render for Dendrogram {
    fn render(&self, f: &mut fmt::Formatter<'_>, data: Option<&Dataset>) -> fmt::Result {
        for (i, level) in self.levels.iter().enumerate() {
            match level {
                Some(set) => {
                    writeln!(f, "level{i}:")?;
                    set.render(f, data)?;
                    f.write_str("\n")?;
                }
                None => writeln!(f, "level{i}: null")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Dendrogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, None)
    }
}
