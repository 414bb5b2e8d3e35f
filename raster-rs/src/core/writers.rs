//! Data writers for clustering results.
//!
//! - CSV with one label per input point (`x,y,label`)
//! - CSV with one row per cluster member (`cluster,x,y`)

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use thiserror::Error;

use crate::processors::clustering::ClusterRow;
use crate::processors::projection::Point;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Mismatched array lengths.
    #[error("array length mismatch: points has {points_len} elements, labels has {labels_len} elements")]
    LengthMismatch { points_len: usize, labels_len: usize },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Creates a CSV writer over a buffered file at `path`.
fn create_csv_writer(path: &Path) -> Result<csv::Writer<BufWriter<File>>> {
    ensure_parent_dirs(path)?;
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(csv::Writer::from_writer(BufWriter::new(file)))
}

/// Write labeled points to CSV.
///
/// Creates a CSV file with headers "x,y,label", one row per point, in input
/// order. Outliers carry label `-1`.
///
/// # Errors
///
/// Returns an error if:
/// - `points` and `labels` have different lengths
/// - Parent directories cannot be created
/// - File cannot be created or written to
///
/// # Example
///
/// ```no_run
/// use raster::core::writers::write_labels_csv;
/// use raster::processors::projection::Point;
/// use std::path::Path;
///
/// let points = vec![Point::new(1.0, 2.0), Point::new(4.0, 5.0)];
/// let labels = vec![0i32, -1];
/// write_labels_csv(Path::new("labels.csv"), &points, &labels).unwrap();
/// ```
pub fn write_labels_csv(path: &Path, points: &[Point], labels: &[i32]) -> Result<()> {
    if points.len() != labels.len() {
        return Err(WriteError::LengthMismatch {
            points_len: points.len(),
            labels_len: labels.len(),
        });
    }

    let mut csv_writer = create_csv_writer(path)?;
    let path_str = path.display().to_string();

    csv_writer
        .write_record(["x", "y", "label"])
        .map_err(|e| WriteError::CsvError {
            path: path_str.clone(),
            source: e,
        })?;

    for (p, label) in points.iter().zip(labels.iter()) {
        csv_writer
            .write_record(&[p.x.to_string(), p.y.to_string(), label.to_string()])
            .map_err(|e| WriteError::CsvError {
                path: path_str.clone(),
                source: e,
            })?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}

/// Write a cluster table to CSV.
///
/// Creates a CSV file with headers "cluster,x,y" and one row per entry of
/// `rows`.
pub fn write_clusters_csv(path: &Path, rows: &[ClusterRow]) -> Result<()> {
    let mut csv_writer = create_csv_writer(path)?;
    let path_str = path.display().to_string();

    if rows.is_empty() {
        // serialize() only emits the header alongside the first row
        csv_writer
            .write_record(["cluster", "x", "y"])
            .map_err(|e| WriteError::CsvError {
                path: path_str.clone(),
                source: e,
            })?;
    }

    for row in rows {
        csv_writer.serialize(row).map_err(|e| WriteError::CsvError {
            path: path_str.clone(),
            source: e,
        })?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_write_labels_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        let points = vec![Point::new(1.5, 2.0), Point::new(4.0, -5.25)];
        let labels = vec![0i32, -1];

        write_labels_csv(&path, &points, &labels).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines, vec!["x,y,label", "1.5,2,0", "4,-5.25,-1"]);
    }

    #[test]
    fn test_write_labels_csv_length_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        let points = vec![Point::new(1.0, 2.0)];
        let labels = vec![0i32, 1];

        match write_labels_csv(&path, &points, &labels) {
            Err(WriteError::LengthMismatch {
                points_len,
                labels_len,
            }) => {
                assert_eq!(points_len, 1);
                assert_eq!(labels_len, 2);
            }
            other => panic!("Expected LengthMismatch error, got {:?}", other),
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_write_clusters_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clusters.csv");
        let rows = vec![
            ClusterRow { cluster: 0, x: 0.1, y: 0.2 },
            ClusterRow { cluster: 1, x: -3.0, y: 4.5 },
        ];

        write_clusters_csv(&path, &rows).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["cluster,x,y", "0,0.1,0.2", "1,-3.0,4.5"]);
    }

    #[test]
    fn test_write_clusters_csv_empty_has_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("clusters.csv");

        write_clusters_csv(&path, &[]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim_end(), "cluster,x,y");
    }
}
