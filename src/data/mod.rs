//! Numeric examples and the datasets they form.
//!
//! A [`Dataset`] is an ordered, immutable list of fixed-length [`Example`] vectors,
//! addressed by position. Clusters refer to examples only through these positions.
//!
//! Datasets come from a [`DatasetSource`]; this crate ships a CSV-directory source
//! and an in-memory source.

mod source;

use std::fmt;

use crate::cluster::squared_euclidean;
use crate::error::{Error, Result};

pub use source::{CsvDirectorySource, DatasetSource, IngestError, MemorySource};

/// One data record: a fixed-length vector of reals.
#[derive(Clone, Debug, PartialEq)]
pub struct Example {
    values: Vec<f64>,
}

impl Example {
    /// Wrap a vector of values.
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Number of coordinates.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the example has no coordinates.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Coordinates as a slice.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Squared Euclidean distance to `other` (no square root is taken).
    pub fn distance(&self, other: &Example) -> f64 {
        squared_euclidean(&self.values, &other.values)
    }
}

impl From<Vec<f64>> for Example {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl fmt::Display for Example {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            // `{:?}` keeps the fractional part on integral values ("1.0", not "1").
            write!(f, "{v:?}")?;
        }
        f.write_str("]")
    }
}

/// An ordered collection of examples sharing one dimensionality.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    examples: Vec<Example>,
}

impl Dataset {
    /// Build a dataset from raw rows.
    ///
    /// Fails with [`Error::EmptyInput`] when `rows` is empty and with
    /// [`Error::DimensionMismatch`] when rows differ in length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(Error::EmptyInput);
        };
        let d = first.len();
        for row in rows.iter().skip(1) {
            if row.len() != d {
                return Err(Error::DimensionMismatch {
                    expected: d,
                    found: row.len(),
                });
            }
        }
        Ok(Self {
            examples: rows.into_iter().map(Example::new).collect(),
        })
    }

    /// Number of examples (`n`).
    pub fn number_of_examples(&self) -> usize {
        self.examples.len()
    }

    /// Example at position `index`, if any.
    pub fn example(&self, index: usize) -> Option<&Example> {
        self.examples.get(index)
    }

    /// All examples in order.
    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    /// Squared distance between the examples at `a` and `b`.
    ///
    /// Both indices must be valid positions; clusters built by the miner always are.
    #[inline]
    pub fn distance(&self, a: usize, b: usize) -> f64 {
        self.examples[a].distance(&self.examples[b])
    }

    /// Upper-triangular matrix of squared distances.
    ///
    /// Entry `[i][j]` holds the distance for `i < j`; the diagonal and lower triangle are 0.
    pub fn distance_matrix(&self) -> Vec<Vec<f64>> {
        let n = self.examples.len();
        let mut out = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                out[i][j] = self.distance(i, j);
            }
        }
        out
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.examples.iter().enumerate() {
            writeln!(f, "Example {i}: {e}")?;
        }
        Ok(())
    }
}
