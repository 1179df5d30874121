use std::fmt;

use crate::data::Dataset;

/// Text rendering shared by clusters, cluster sets and dendrograms.
///
/// With `data` absent, clusters print as comma-joined indices; with it, each member
/// prints as its bracketed example vector.
pub trait Render {
    fn render(&self, f: &mut fmt::Formatter<'_>, data: Option<&Dataset>) -> fmt::Result;
}

/// Display adapter that renders a value against a dataset.
///
/// Returned by the `with_data` methods on [`Cluster`](super::Cluster),
/// [`ClusterSet`](super::ClusterSet), [`Dendrogram`](super::Dendrogram) and
/// [`HierarchicalMiner`](super::HierarchicalMiner).
pub struct WithData<'a, T: ?Sized> {
    pub(crate) value: &'a T,
    pub(crate) data: &'a Dataset,
}

impl<T: Render + ?Sized> fmt::Display for WithData<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.render(f, Some(self.data))
    }
}
