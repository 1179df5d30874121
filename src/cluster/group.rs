use std::collections::BTreeSet;
use std::fmt;

use super::render::{Render, WithData};
use crate::data::Dataset;

/// A set of dataset indices grouped together.
///
/// Members are deduplicated and iterate in ascending order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cluster {
    members: BTreeSet<usize>,
}

impl Cluster {
    /// Create an empty cluster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster holding only `index`.
    pub fn singleton(index: usize) -> Self {
        let mut c = Self::new();
        c.add(index);
        c
    }

    /// Insert `index`. Returns `false` if it was already a member.
    pub fn add(&mut self, index: usize) -> bool {
        self.members.insert(index)
    }

    /// Number of members.
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// True if the cluster has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `index` is a member.
    pub fn contains(&self, index: usize) -> bool {
        self.members.contains(&index)
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }

    /// Largest member index, if any.
    pub fn max_index(&self) -> Option<usize> {
        self.members.last().copied()
    }

    /// New cluster holding the union of `self` and `other`. Neither operand changes.
    pub fn merge(&self, other: &Cluster) -> Cluster {
        Cluster {
            members: self.members.union(&other.members).copied().collect(),
        }
    }

    /// Render members as their example vectors from `data`.
    pub fn with_data<'a>(&'a self, data: &'a Dataset) -> WithData<'a, Self> {
        WithData { value: self, data }
    }
}

impl FromIterator<usize> for Cluster {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}

impl Render for Cluster {
    fn render(&self, f: &mut fmt::Formatter<'_>, data: Option<&Dataset>) -> fmt::Result {
        match data {
            None => {
                for (i, id) in self.members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{id}")?;
                }
            }
            Some(data) => {
                for &id in &self.members {
                    match data.example(id) {
                        Some(e) => write!(f, "<{e}>")?,
                        None => f.write_str("<?>")?,
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, None)
    }
}
