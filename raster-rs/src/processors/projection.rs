//! Projection: quantizing points into grid tiles and keeping the dense ones.
//!
//! Every point is mapped to the tile `(floor(x * scalar), floor(y * scalar))`
//! where `scalar = 10^precision`. Observations are accumulated per tile under a
//! [`Retention`] policy, and only tiles holding at least `threshold`
//! observations survive.
//!
//! Two policies are provided:
//! - [`Counts`] keeps a counter per tile (RASTER), memory grows with the
//!   number of distinct tiles
//! - [`Points`] keeps every point per tile (RASTER prime), memory grows with
//!   the number of points
//!
//! # Example
//!
//! ```
//! use raster::processors::projection::{map_to_tiles, Point};
//!
//! let points = vec![Point::new(1.0, 23.22), Point::new(1.05, 23.28)];
//! let (tiles, scalar) = map_to_tiles(&points, 1.0, 2).unwrap();
//! assert_eq!(scalar, 10.0);
//! assert!(tiles.contains(&(10, 232)));
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Integer grid coordinates of a tile.
pub type Tile = (i32, i32);

/// Dense tiles of the count variant.
pub type TileSet = HashSet<Tile>;

/// Dense tiles of the prime variant, with the points that fell into them.
pub type TileMap = HashMap<Tile, Vec<Point>>;

/// Errors raised while projecting or clustering points.
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("point {index} ({x}, {y}) cannot be mapped to a tile at scalar {scalar}")]
    UnrepresentableCoordinate {
        index: usize,
        x: f64,
        y: f64,
        scalar: f64,
    },

    #[error("failed to start projection workers: {0}")]
    WorkerPool(String),

    #[error("estimator has not been fitted")]
    NotFitted,
}

/// Result type for projection and clustering operations.
pub type Result<T> = std::result::Result<T, RasterError>;

/// A single 2D observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Quantize this point to its tile, or `None` if the scaled coordinates
    /// do not fit the grid.
    ///
    /// Uses mathematical floor, so `-0.05` lands in tile `-1` at scalar 10
    /// rather than being truncated toward zero.
    #[inline]
    pub fn tile(&self, scalar: f64) -> Option<Tile> {
        Some((grid_coord(self.x * scalar)?, grid_coord(self.y * scalar)?))
    }
}

/// Map a scaled coordinate to a grid index.
///
/// The accepted range stops one short of the `i32` bounds so that every
/// neighbor key of a valid tile is itself representable.
#[inline]
fn grid_coord(scaled: f64) -> Option<i32> {
    let v = scaled.floor();
    // NaN fails both comparisons
    if v > f64::from(i32::MIN) && v < f64::from(i32::MAX) {
        Some(v as i32)
    } else {
        None
    }
}

/// Multiplicative factor turning coordinates into tile indices.
#[inline]
pub fn scalar_for(precision: f64) -> f64 {
    10f64.powf(precision)
}

/// Check the projection parameters before any work starts.
pub(crate) fn check_projection_params(precision: f64, threshold: usize) -> Result<()> {
    if !precision.is_finite() || precision < 0.0 {
        return Err(RasterError::InvalidParameter {
            name: "precision",
            reason: format!("must be a finite value >= 0, got {}", precision),
        });
    }
    if !scalar_for(precision).is_finite() {
        return Err(RasterError::InvalidParameter {
            name: "precision",
            reason: format!("10^{} overflows the tile scale", precision),
        });
    }
    if threshold == 0 {
        return Err(RasterError::InvalidParameter {
            name: "threshold",
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// What a tile remembers about the points projected onto it.
pub trait Retention {
    /// Per-tile accumulator.
    type Cell: Default + Send;

    /// Record one point in a tile's cell.
    fn record(cell: &mut Self::Cell, point: Point);

    /// Fold another partial cell for the same tile into `cell`.
    fn absorb(cell: &mut Self::Cell, other: Self::Cell);

    /// Number of observations held by a cell.
    fn observations(cell: &Self::Cell) -> usize;
}

/// Keep only an observation count per tile.
#[derive(Debug, Clone, Copy)]
pub struct Counts;

impl Retention for Counts {
    type Cell = usize;

    #[inline]
    fn record(cell: &mut usize, _point: Point) {
        *cell += 1;
    }

    #[inline]
    fn absorb(cell: &mut usize, other: usize) {
        *cell += other;
    }

    #[inline]
    fn observations(cell: &usize) -> usize {
        *cell
    }
}

/// Keep every point per tile.
#[derive(Debug, Clone, Copy)]
pub struct Points;

impl Retention for Points {
    type Cell = Vec<Point>;

    #[inline]
    fn record(cell: &mut Vec<Point>, point: Point) {
        cell.push(point);
    }

    #[inline]
    fn absorb(cell: &mut Vec<Point>, mut other: Vec<Point>) {
        cell.append(&mut other);
    }

    #[inline]
    fn observations(cell: &Vec<Point>) -> usize {
        cell.len()
    }
}

/// Accumulate `points` into per-tile cells.
///
/// `offset` is the global index of `points[0]`; it only feeds error reports so
/// that a failing partition names the offending point in the full input.
pub fn tile_cells<R: Retention>(
    points: &[Point],
    scalar: f64,
    offset: usize,
) -> Result<HashMap<Tile, R::Cell>> {
    let mut cells: HashMap<Tile, R::Cell> = HashMap::new();

    for (i, p) in points.iter().enumerate() {
        let tile = p
            .tile(scalar)
            .ok_or_else(|| RasterError::UnrepresentableCoordinate {
                index: offset + i,
                x: p.x,
                y: p.y,
                scalar,
            })?;
        R::record(cells.entry(tile).or_default(), *p);
    }

    Ok(cells)
}

/// Drop every tile holding fewer than `threshold` observations.
pub fn retain_dense<R: Retention>(
    cells: HashMap<Tile, R::Cell>,
    threshold: usize,
) -> HashMap<Tile, R::Cell> {
    cells
        .into_iter()
        .filter(|(_, cell)| R::observations(cell) >= threshold)
        .collect()
}

/// Convert points into the set of dense tiles.
///
/// Returns the dense tiles and the scalar used to build them.
pub fn map_to_tiles(points: &[Point], precision: f64, threshold: usize) -> Result<(TileSet, f64)> {
    check_projection_params(precision, threshold)?;
    let scalar = scalar_for(precision);

    let counts = tile_cells::<Counts>(points, scalar, 0)?;
    let total = counts.len();
    let dense: TileSet = retain_dense::<Counts>(counts, threshold)
        .into_keys()
        .collect();
    log::debug!("projection: {} of {} tiles are dense", dense.len(), total);

    Ok((dense, scalar))
}

/// Prime version of [`map_to_tiles`]: dense tiles keep their points.
pub fn map_to_tile_points(
    points: &[Point],
    precision: f64,
    threshold: usize,
) -> Result<(TileMap, f64)> {
    check_projection_params(precision, threshold)?;
    let scalar = scalar_for(precision);

    let cells = tile_cells::<Points>(points, scalar, 0)?;
    let total = cells.len();
    let dense = retain_dense::<Points>(cells, threshold);
    log::debug!("projection (prime): {} of {} tiles are dense", dense.len(), total);

    Ok((dense, scalar))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping() {
        let points = vec![Point::new(1.0, 23.22), Point::new(1.05, 23.28)];
        let truth: TileSet = [(10, 232)].into_iter().collect();

        let (tiles, scalar) = map_to_tiles(&points, 1.0, 2).unwrap();
        assert_eq!(scalar, 10.0);
        assert_eq!(tiles, truth);
    }

    #[test]
    fn test_mapping_to_empty() {
        let points = vec![Point::new(1.0, 23.22), Point::new(1.05, 23.28)];

        let (tiles, _) = map_to_tiles(&points, 1.0, 3).unwrap();
        assert!(tiles.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let (tiles, scalar) = map_to_tiles(&[], 2.0, 1).unwrap();
        assert!(tiles.is_empty());
        assert_eq!(scalar, 100.0);

        let (tile_map, _) = map_to_tile_points(&[], 2.0, 1).unwrap();
        assert!(tile_map.is_empty());
    }

    #[test]
    fn test_negative_coordinates_use_floor() {
        let scalar = 10.0;
        assert_eq!(Point::new(-0.05, 0.05).tile(scalar), Some((-1, 0)));
        assert_eq!(Point::new(-1.0, -0.11).tile(scalar), Some((-10, -2)));
        assert_eq!(Point::new(0.0, -0.0).tile(scalar), Some((0, 0)));
    }

    #[test]
    fn test_fractional_precision() {
        let scalar = scalar_for(0.5);
        assert!((scalar - 10f64.sqrt()).abs() < 1e-12);
        assert_eq!(Point::new(1.0, 2.0).tile(scalar), Some((3, 6)));
    }

    #[test]
    fn test_unrepresentable_points() {
        assert_eq!(Point::new(f64::NAN, 0.0).tile(1.0), None);
        assert_eq!(Point::new(0.0, f64::INFINITY).tile(1.0), None);
        assert_eq!(Point::new(1e10, 0.0).tile(1.0), None);
        assert_eq!(Point::new(f64::from(i32::MAX), 0.0).tile(1.0), None);
        assert_eq!(Point::new(f64::from(i32::MIN), 0.0).tile(1.0), None);

        let points = vec![Point::new(0.0, 0.0), Point::new(f64::NAN, 1.0)];
        match map_to_tiles(&points, 1.0, 1) {
            Err(RasterError::UnrepresentableCoordinate { index, .. }) => assert_eq!(index, 1),
            other => panic!("Expected UnrepresentableCoordinate, got {:?}", other),
        }
    }

    #[test]
    fn test_threshold_boundary() {
        // 4 points in tile (0, 0), 5 points in tile (10, 10)
        let mut points = vec![Point::new(0.01, 0.02); 4];
        points.extend(vec![Point::new(1.01, 1.02); 5]);

        let (tiles, _) = map_to_tiles(&points, 1.0, 5).unwrap();
        assert!(!tiles.contains(&(0, 0)));
        assert!(tiles.contains(&(10, 10)));
        assert_eq!(tiles.len(), 1);
    }

    #[test]
    fn test_prime_keeps_points() {
        let points = vec![
            Point::new(0.11, 0.12),
            Point::new(0.15, 0.19),
            Point::new(0.55, 0.12),
        ];

        let (tile_map, _) = map_to_tile_points(&points, 1.0, 1).unwrap();
        assert_eq!(tile_map.len(), 2);
        assert_eq!(tile_map[&(1, 1)], vec![points[0], points[1]]);
        assert_eq!(tile_map[&(5, 1)], vec![points[2]]);

        let (dense, _) = map_to_tile_points(&points, 1.0, 2).unwrap();
        assert_eq!(dense.len(), 1);
        assert!(dense.contains_key(&(1, 1)));
    }

    #[test]
    fn test_prime_and_count_agree_on_tiles() {
        let points: Vec<Point> = (0..200)
            .map(|i| Point::new((i % 17) as f64 * 0.013, (i % 23) as f64 * -0.021))
            .collect();

        let (tiles, s1) = map_to_tiles(&points, 2.0, 2).unwrap();
        let (tile_map, s2) = map_to_tile_points(&points, 2.0, 2).unwrap();

        assert_eq!(s1, s2);
        let prime_keys: TileSet = tile_map.keys().copied().collect();
        assert_eq!(tiles, prime_keys);
    }

    #[test]
    fn test_invalid_parameters() {
        let points = vec![Point::new(0.0, 0.0)];

        assert!(matches!(
            map_to_tiles(&points, -1.0, 1),
            Err(RasterError::InvalidParameter { name: "precision", .. })
        ));
        assert!(matches!(
            map_to_tiles(&points, f64::NAN, 1),
            Err(RasterError::InvalidParameter { name: "precision", .. })
        ));
        assert!(matches!(
            map_to_tile_points(&points, 1.0, 0),
            Err(RasterError::InvalidParameter { name: "threshold", .. })
        ));
    }

    #[test]
    fn test_precision_with_infinite_scale_rejected() {
        let points = vec![Point::new(0.0, 0.0)];

        assert!(matches!(
            map_to_tiles(&points, 400.0, 1),
            Err(RasterError::InvalidParameter { name: "precision", .. })
        ));
        assert!(matches!(
            map_to_tile_points(&points, 309.0, 1),
            Err(RasterError::InvalidParameter { name: "precision", .. })
        ));
        // largest finite scale is still accepted
        assert!(map_to_tiles(&points, 300.0, 1).is_ok());
    }
}
