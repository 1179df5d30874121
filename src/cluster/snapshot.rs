//! On-disk dendrogram snapshots.
//!
//! File format:
//! - Header: magic bytes `HCLS`, version `u8`
//! - Body: bincode-serialized [`SnapshotBody`]
//! - Footer: xxhash64 checksum (little-endian) of all preceding bytes

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{Cluster, ClusterSet, Dendrogram};
use crate::error::{Error, Result};

const SNAPSHOT_MAGIC: [u8; 4] = *b"HCLS";
const SNAPSHOT_VERSION: u8 = 1;
const HEADER_LEN: usize = 5;
const CHECKSUM_LEN: usize = 8;

/// Every level, every cluster, as ascending member indices.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotBody {
    depth: u32,
    levels: Vec<Option<Vec<Vec<u32>>>>,
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        Error::SnapshotCodec(format!("value {value} does not fit the snapshot format"))
    })
}

impl SnapshotBody {
    fn from_dendrogram(dendrogram: &Dendrogram) -> Result<Self> {
        let mut levels = Vec::with_capacity(dendrogram.depth());
        for level in dendrogram.levels() {
            let encoded = match level {
                None => None,
                Some(set) => Some(
                    set.iter()
                        .map(|c| c.iter().map(to_u32).collect::<Result<Vec<_>>>())
                        .collect::<Result<Vec<_>>>()?,
                ),
            };
            levels.push(encoded);
        }
        Ok(Self {
            depth: to_u32(dendrogram.depth())?,
            levels,
        })
    }

    fn into_dendrogram(self) -> Result<Dendrogram> {
        if self.depth == 0 {
            return Err(Error::SnapshotCorrupt("depth is zero".into()));
        }
        if self.levels.len() != self.depth as usize {
            return Err(Error::SnapshotCorrupt(format!(
                "depth {} but {} levels stored",
                self.depth,
                self.levels.len()
            )));
        }
        if self.levels[0].is_none() && self.levels.iter().any(Option::is_some) {
            return Err(Error::SnapshotCorrupt("level 0 missing".into()));
        }

        let mut dendrogram = Dendrogram::new(self.levels.len());
        for (level, clusters) in self.levels.into_iter().enumerate() {
            let Some(clusters) = clusters else {
                continue;
            };
            let mut set = ClusterSet::new(clusters.len());
            for members in clusters {
                if members.is_empty() {
                    return Err(Error::SnapshotCorrupt(format!("empty cluster at level {level}")));
                }
                let cluster: Cluster = members.into_iter().map(|m| m as usize).collect();
                set.add(Arc::new(cluster))?;
            }
            dendrogram.set_cluster_set(level, set);
        }
        Ok(dendrogram)
    }
}

/// Encode `dendrogram` into snapshot bytes.
pub(crate) fn encode(dendrogram: &Dendrogram) -> Result<Vec<u8>> {
    let body = SnapshotBody::from_dendrogram(dendrogram)?;
    let body_bytes = bincode::serialize(&body)
        .map_err(|e| Error::SnapshotCodec(format!("bincode serialization failed: {e}")))?;

    let mut data = Vec::with_capacity(HEADER_LEN + body_bytes.len() + CHECKSUM_LEN);
    data.extend_from_slice(&SNAPSHOT_MAGIC);
    data.push(SNAPSHOT_VERSION);
    data.extend_from_slice(&body_bytes);

    let checksum = xxhash_rust::xxh64::xxh64(&data, 0);
    data.extend_from_slice(&checksum.to_le_bytes());
    Ok(data)
}

/// Decode snapshot bytes produced by [`encode`].
pub(crate) fn decode(data: &[u8]) -> Result<Dendrogram> {
    if data.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(Error::SnapshotCorrupt("file too small".into()));
    }

    let checksum_offset = data.len() - CHECKSUM_LEN;
    let mut footer = [0u8; CHECKSUM_LEN];
    footer.copy_from_slice(&data[checksum_offset..]);
    let stored = u64::from_le_bytes(footer);
    let computed = xxhash_rust::xxh64::xxh64(&data[..checksum_offset], 0);
    if stored != computed {
        return Err(Error::SnapshotChecksum { stored, computed });
    }

    if data[..4] != SNAPSHOT_MAGIC {
        return Err(Error::SnapshotMagic);
    }
    let version = data[4];
    if version != SNAPSHOT_VERSION {
        return Err(Error::SnapshotVersion {
            found: version,
            expected: SNAPSHOT_VERSION,
        });
    }

    let body: SnapshotBody = bincode::deserialize(&data[HEADER_LEN..checksum_offset])
        .map_err(|e| Error::SnapshotCodec(format!("bincode deserialization failed: {e}")))?;
    body.into_dendrogram()
}

/// Write `dendrogram` to `path` through a temporary file and a rename.
pub(crate) fn save(dendrogram: &Dendrogram, path: &Path) -> Result<()> {
    let data = encode(dendrogram)?;

    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = Path::new(&temp);

    std::fs::write(temp, &data).map_err(|source| {
        error!(path = %temp.display(), %source, "snapshot write failed");
        Error::Io {
            path: temp.display().to_string(),
            source,
        }
    })?;
    std::fs::rename(temp, path).map_err(|source| {
        error!(path = %path.display(), %source, "snapshot rename failed");
        Error::Io {
            path: path.display().to_string(),
            source,
        }
    })?;

    debug!(path = %path.display(), bytes = data.len(), "saved dendrogram snapshot");
    Ok(())
}

/// Read a dendrogram from `path`.
pub(crate) fn load(path: &Path) -> Result<Dendrogram> {
    let data = std::fs::read(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    let dendrogram = decode(&data)?;
    debug!(path = %path.display(), depth = dendrogram.depth(), "loaded dendrogram snapshot");
    Ok(dendrogram)
}
