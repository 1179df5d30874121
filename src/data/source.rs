use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim};
use thiserror::Error;
use tracing::debug;

use super::Dataset;

/// Ways loading a table into a [`Dataset`] can fail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// No table with this name exists.
    #[error("table '{table}' does not exist")]
    NotFound {
        /// Requested table.
        table: String,
    },

    /// Table exists but holds no rows.
    #[error("table '{table}' is empty")]
    Empty {
        /// Requested table.
        table: String,
    },

    /// A column holds a value that is not a real number.
    #[error("table '{table}' has a non-numeric attribute in column '{column}'")]
    NonNumericAttribute {
        /// Requested table.
        table: String,
        /// Offending column.
        column: String,
    },

    /// The backing store could not be reached.
    #[error("cannot reach the data store: {message}")]
    ConnectionFailure {
        /// Human-readable cause.
        message: String,
    },
}

/// Something that can turn a table name into a [`Dataset`].
///
/// One source is shared by every session, so implementations must be thread-safe.
pub trait DatasetSource: Send + Sync {
    /// Load every row of `table` as one example.
    fn load_dataset(&self, table: &str) -> Result<Dataset, IngestError>;
}

/// Tables stored as `<root>/<table>.csv`.
///
/// The first line names the columns; each following non-blank line is one example.
/// Fields may be quoted and surrounding whitespace is ignored.
#[derive(Clone, Debug)]
pub struct CsvDirectorySource {
    root: PathBuf,
}

impl CsvDirectorySource {
    /// Serve tables from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the table files.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn is_table_name(table: &str) -> bool {
    !table.is_empty() && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl DatasetSource for CsvDirectorySource {
    fn load_dataset(&self, table: &str) -> Result<Dataset, IngestError> {
        if !self.root.is_dir() {
            return Err(IngestError::ConnectionFailure {
                message: format!("data directory {} is not available", self.root.display()),
            });
        }
        if !is_table_name(table) {
            return Err(IngestError::NotFound {
                table: table.to_string(),
            });
        }

        let path = self.root.join(format!("{table}.csv"));
        let text = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => IngestError::NotFound {
                table: table.to_string(),
            },
            _ => IngestError::ConnectionFailure {
                message: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let rows = parse_table(table, &text)?;
        debug!(table, rows = rows.len(), path = %path.display(), "loaded csv table");
        Dataset::from_rows(rows).map_err(|_| IngestError::Empty {
            table: table.to_string(),
        })
    }
}

fn parse_table(table: &str, text: &str) -> Result<Vec<Vec<f64>>, IngestError> {
    let malformed = |e: csv::Error| IngestError::ConnectionFailure {
        message: format!("table '{table}' is not valid csv: {e}"),
    };
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());
    let columns = rdr.headers().map_err(malformed)?.clone();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(malformed)?;
        let mut row = Vec::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let value = record
                .get(i)
                .and_then(|c| c.parse::<f64>().ok())
                .filter(|v| v.is_finite());
            match value {
                Some(v) => row.push(v),
                None => {
                    return Err(IngestError::NonNumericAttribute {
                        table: table.to_string(),
                        column: column.to_string(),
                    })
                }
            }
        }
        if record.len() > columns.len() {
            return Err(IngestError::NonNumericAttribute {
                table: table.to_string(),
                column: format!("#{}", columns.len() + 1),
            });
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(IngestError::Empty {
            table: table.to_string(),
        });
    }
    Ok(rows)
}

/// Tables held in memory, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    tables: HashMap<String, Vec<Vec<f64>>>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a table.
    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<Vec<f64>>) -> Self {
        self.tables.insert(name.into(), rows);
        self
    }
}

impl DatasetSource for MemorySource {
    fn load_dataset(&self, table: &str) -> Result<Dataset, IngestError> {
        let rows = self.tables.get(table).ok_or_else(|| IngestError::NotFound {
            table: table.to_string(),
        })?;
        if rows.is_empty() {
            return Err(IngestError::Empty {
                table: table.to_string(),
            });
        }
        Dataset::from_rows(rows.clone()).map_err(|_| IngestError::NonNumericAttribute {
            table: table.to_string(),
            column: "<ragged row>".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_with(files: &[(&str, &str)]) -> (tempfile::TempDir, CsvDirectorySource) {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            std::fs::write(dir.path().join(name), body).unwrap();
        }
        let source = CsvDirectorySource::new(dir.path());
        (dir, source)
    }

    #[test]
    fn loads_numeric_table() {
        let (_dir, source) = source_with(&[("points.csv", "x,y\n0,0\n1.5,2\n\n3,4\n")]);
        let data = source.load_dataset("points").unwrap();
        assert_eq!(data.number_of_examples(), 3);
        assert_eq!(data.example(1).unwrap().values(), &[1.5, 2.0]);
    }

    #[test]
    fn quoted_cells_are_unquoted() {
        let (_dir, source) = source_with(&[("q.csv", "\"x\",\"y\"\n\"1.5\",\"2\"\n3, 4\n")]);
        let data = source.load_dataset("q").unwrap();
        assert_eq!(data.number_of_examples(), 2);
        assert_eq!(data.example(0).unwrap().values(), &[1.5, 2.0]);
        assert_eq!(data.example(1).unwrap().values(), &[3.0, 4.0]);
    }

    #[test]
    fn short_and_long_rows_name_a_column() {
        let (_dir, source) = source_with(&[("s.csv", "a,b\n1\n"), ("l.csv", "a,b\n1,2,3\n")]);
        assert_eq!(
            source.load_dataset("s"),
            Err(IngestError::NonNumericAttribute {
                table: "s".into(),
                column: "b".into()
            })
        );
        assert_eq!(
            source.load_dataset("l"),
            Err(IngestError::NonNumericAttribute {
                table: "l".into(),
                column: "#3".into()
            })
        );
    }

    #[test]
    fn missing_table_is_not_found() {
        let (_dir, source) = source_with(&[]);
        assert_eq!(
            source.load_dataset("nope"),
            Err(IngestError::NotFound {
                table: "nope".into()
            })
        );
    }

    #[test]
    fn path_like_names_are_not_found() {
        let (_dir, source) = source_with(&[("t.csv", "a\n1\n")]);
        assert!(matches!(
            source.load_dataset("../t"),
            Err(IngestError::NotFound { .. })
        ));
    }

    #[test]
    fn header_only_table_is_empty() {
        let (_dir, source) = source_with(&[("t.csv", "a,b\n")]);
        assert!(matches!(
            source.load_dataset("t"),
            Err(IngestError::Empty { .. })
        ));
    }

    #[test]
    fn text_cell_names_its_column() {
        let (_dir, source) = source_with(&[("t.csv", "a,label\n1,red\n")]);
        assert_eq!(
            source.load_dataset("t"),
            Err(IngestError::NonNumericAttribute {
                table: "t".into(),
                column: "label".into()
            })
        );
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let (_dir, source) = source_with(&[("t.csv", "a,b\n1,NaN\n")]);
        assert_eq!(
            source.load_dataset("t"),
            Err(IngestError::NonNumericAttribute {
                table: "t".into(),
                column: "b".into()
            })
        );
    }

    #[test]
    fn missing_root_is_connection_failure() {
        let source = CsvDirectorySource::new("/definitely/not/here");
        assert!(matches!(
            source.load_dataset("t"),
            Err(IngestError::ConnectionFailure { .. })
        ));
    }

    #[test]
    fn memory_source_round_trips_rows() {
        let source = MemorySource::new()
            .with_table("t", vec![vec![1.0], vec![2.0]])
            .with_table("empty", vec![]);
        assert_eq!(source.load_dataset("t").unwrap().number_of_examples(), 2);
        assert!(matches!(
            source.load_dataset("empty"),
            Err(IngestError::Empty { .. })
        ));
        assert!(matches!(
            source.load_dataset("other"),
            Err(IngestError::NotFound { .. })
        ));
    }
}
