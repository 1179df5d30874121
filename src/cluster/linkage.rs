//! Linkage criteria for agglomerative clustering.
//!
//! Both criteria are built on the squared Euclidean distance between examples.
//! Reported distances are therefore squared, not true, Euclidean distances.
//!
//! | Linkage | Cluster distance | Cost per pair |
//! |---------|------------------|---------------|
//! | Single  | min over member pairs | O(\|a\|·\|b\|) |
//! | Average | mean over member pairs | O(\|a\|·\|b\|) |

use std::fmt;

use super::traits::ClusterDistance;
use super::Cluster;
use crate::data::Dataset;
use crate::error::{Error, Result};

/// Linkage criterion, selected on the wire by an integer code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Linkage {
    /// Single linkage: minimum pairwise distance.
    Single,
    /// Average linkage: arithmetic mean of all pairwise distances.
    Average,
}

impl Linkage {
    /// Map a wire code (1 = single-link, 2 = average-link).
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            1 => Ok(Self::Single),
            2 => Ok(Self::Average),
            other => Err(Error::UnknownLinkage(other)),
        }
    }

    /// Wire code of this linkage.
    pub fn code(self) -> i32 {
        match self {
            Self::Single => 1,
            Self::Average => 2,
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Single => "single-link",
            Self::Average => "average-link",
        })
    }
}

impl ClusterDistance for Linkage {
    fn distance(&self, a: &Cluster, b: &Cluster, data: &Dataset) -> f64 {
        match self {
            Self::Single => single_link(a, b, data),
            Self::Average => average_link(a, b, data),
        }
    }
}

fn single_link(a: &Cluster, b: &Cluster, data: &Dataset) -> f64 {
    let mut min = f64::INFINITY;
    for i in a.iter() {
        for j in b.iter() {
            let d = data.distance(i, j);
            if d < min {
                min = d;
            }
        }
    }
    min
}

fn average_link(a: &Cluster, b: &Cluster, data: &Dataset) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for i in a.iter() {
        for j in b.iter() {
            sum += data.distance(i, j);
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
