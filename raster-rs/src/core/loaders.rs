//! Data loaders for 2D point CSV files.
//!
//! Two layouts are accepted:
//! - headerless files with two numeric columns per row (e.g. `10.42,1080.360`)
//! - files with a header row, where columns named `x` and `y` are used if
//!   both are present and the first two columns otherwise

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;

use crate::processors::projection::Point;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error on line {line}: {message}")]
    ParseError { line: u64, message: String },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Load 2D points from a CSV file.
///
/// # Arguments
///
/// * `path` - Path to the CSV file
/// * `has_headers` - Whether the first row names the columns
///
/// # Returns
///
/// Points in file order, so labels computed later stay index-aligned with the
/// rows of the file. A file without data rows yields no points.
///
/// # Errors
///
/// Returns an error if the file cannot be read, or a row has fewer than two
/// columns or a non-numeric coordinate.
pub fn load_points_csv<P: AsRef<Path>>(path: P, has_headers: bool) -> Result<Vec<Point>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let (x_idx, y_idx) = if has_headers {
        let headers = reader.headers()?;
        let col_map: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_lowercase(), i))
            .collect();
        match (col_map.get("x"), col_map.get("y")) {
            (Some(&x), Some(&y)) => (x, y),
            _ => (0, 1),
        }
    } else {
        (0, 1)
    };

    let mut points = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());

        let x = parse_field(&record, x_idx, line)?;
        let y = parse_field(&record, y_idx, line)?;
        points.push(Point::new(x, y));
    }

    log::debug!("loaded {} points from {}", points.len(), path.display());
    Ok(points)
}

fn parse_field(record: &StringRecord, idx: usize, line: u64) -> Result<f64> {
    let raw = record.get(idx).ok_or_else(|| LoaderError::ParseError {
        line,
        message: format!("missing column {}", idx),
    })?;
    raw.parse().map_err(|_| LoaderError::ParseError {
        line,
        message: format!("invalid coordinate '{}'", raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_headerless() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "10.42,1080.360").unwrap();
        writeln!(file, "-1.5, 2.25").unwrap();
        file.flush().unwrap();

        let points = load_points_csv(file.path(), false)?;
        assert_eq!(points, vec![Point::new(10.42, 1080.36), Point::new(-1.5, 2.25)]);

        Ok(())
    }

    #[test]
    fn test_load_with_named_headers() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,Y,X").unwrap();
        writeln!(file, "1,2.0,3.0").unwrap();
        writeln!(file, "2,4.0,5.0").unwrap();
        file.flush().unwrap();

        let points = load_points_csv(file.path(), true)?;
        assert_eq!(points, vec![Point::new(3.0, 2.0), Point::new(5.0, 4.0)]);

        Ok(())
    }

    #[test]
    fn test_load_headers_fall_back_to_first_columns() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "lat,lon").unwrap();
        writeln!(file, "50.1,1.2").unwrap();
        file.flush().unwrap();

        let points = load_points_csv(file.path(), true)?;
        assert_eq!(points, vec![Point::new(50.1, 1.2)]);

        Ok(())
    }

    #[test]
    fn test_load_rejects_bad_value() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1.0,2.0").unwrap();
        writeln!(file, "abc,2.0").unwrap();
        file.flush().unwrap();

        match load_points_csv(file.path(), false) {
            Err(LoaderError::ParseError { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_short_row() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1.0").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            load_points_csv(file.path(), false),
            Err(LoaderError::ParseError { .. })
        ));
    }

    #[test]
    fn test_load_headers_need_both_names() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,x").unwrap();
        writeln!(file, "7,3.0").unwrap();
        file.flush().unwrap();

        let points = load_points_csv(file.path(), true)?;
        assert_eq!(points, vec![Point::new(7.0, 3.0)]);

        Ok(())
    }

    #[test]
    fn test_load_empty_file() -> Result<()> {
        let file = NamedTempFile::new().unwrap();
        assert_eq!(load_points_csv(file.path(), false)?, Vec::<Point>::new());

        Ok(())
    }

    #[test]
    fn test_load_header_only_file() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "x,y").unwrap();
        file.flush().unwrap();

        assert_eq!(load_points_csv(file.path(), true)?, Vec::<Point>::new());

        Ok(())
    }
}
