use super::Cluster;
use crate::data::Dataset;

/// Common interface for inter-cluster distances.
///
/// Implementations must be symmetric in `a` and `b` and non-negative. Both clusters
/// are expected to be non-empty and to hold valid positions in `data`.
pub trait ClusterDistance {
    /// Distance between clusters `a` and `b`, computed from pairwise example distances.
    fn distance(&self, a: &Cluster, b: &Cluster, data: &Dataset) -> f64;
}

impl<D: ClusterDistance + ?Sized> ClusterDistance for &D {
    fn distance(&self, a: &Cluster, b: &Cluster, data: &Dataset) -> f64 {
        (**self).distance(a, b, data)
    }
}
