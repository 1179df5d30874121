use thiserror::Error;

use crate::data::IngestError;

/// Errors returned by the clustering engine, its persistence layer, and configuration loading.
#[derive(Debug, Error)]
pub enum Error {
    /// Input slice is empty.
    #[error("empty input")]
    EmptyInput,

    /// Points in a dataset have inconsistent dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// Dendrogram depth must be strictly positive.
    #[error("invalid depth {depth}: must be greater than zero")]
    InvalidDepth {
        /// Requested depth.
        depth: i64,
    },

    /// A merge was requested on a level holding fewer than two clusters.
    #[error("cannot merge: level holds {count} cluster(s), at least 2 are required")]
    NotEnoughClusters {
        /// Number of populated clusters at the level.
        count: usize,
    },

    /// A cluster was added to a full cluster set.
    #[error("cluster set is full (capacity {capacity})")]
    CapacityExceeded {
        /// Fixed capacity of the set.
        capacity: usize,
    },

    /// Distance code that maps to no linkage strategy.
    #[error("unknown distance type {0}: expected 1 (single-link) or 2 (average-link)")]
    UnknownLinkage(i32),

    /// Underlying filesystem failure while saving or loading a snapshot.
    #[error("snapshot I/O failed for {path}: {source}")]
    Io {
        /// Path being read or written.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Snapshot body could not be encoded or decoded.
    #[error("snapshot codec failed: {0}")]
    SnapshotCodec(String),

    /// File does not start with the snapshot magic bytes.
    #[error("not a dendrogram snapshot (bad magic bytes)")]
    SnapshotMagic,

    /// Snapshot was written by an unsupported format version.
    #[error("unsupported snapshot version {found} (expected {expected})")]
    SnapshotVersion {
        /// Version found in the file.
        found: u8,
        /// Version this build reads.
        expected: u8,
    },

    /// Stored checksum does not match the file contents.
    #[error("snapshot checksum mismatch: stored={stored:#x}, computed={computed:#x}")]
    SnapshotChecksum {
        /// Checksum read from the file footer.
        stored: u64,
        /// Checksum computed over the file contents.
        computed: u64,
    },

    /// Snapshot decoded but describes an impossible dendrogram.
    #[error("corrupt snapshot: {0}")]
    SnapshotCorrupt(String),

    /// Dataset could not be ingested.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Configuration file is missing, unreadable, or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
