//! Hierarchical clustering server.
//!
//! `hclus` builds agglomerative dendrograms over numeric datasets and serves them over a
//! framed TCP session protocol.
//!
//! - [`cluster`]: clusters, cluster sets, dendrograms, single/average linkage, and the
//!   [`HierarchicalMiner`] with snapshot persistence
//! - [`data`]: examples, datasets, and the [`DatasetSource`] ingestion interface
//! - [`server`]: wire framing, the per-connection session state machine, the
//!   connection acceptor, and a typed client
//! - [`config`]: TOML configuration

#![forbid(unsafe_code)]

pub mod cluster;
pub mod config;
pub mod data;
pub mod error;
pub mod server;

pub use cluster::{
    Cluster, ClusterDistance, ClusterSet, Dendrogram, HierarchicalMiner, Linkage,
};
pub use config::Config;
pub use data::{CsvDirectorySource, Dataset, DatasetSource, Example, IngestError, MemorySource};
pub use error::{Error, Result};
pub use server::{Client, ClientError, Server};
