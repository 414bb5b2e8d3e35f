//! Contraction Clustering (RASTER) estimator.
//!
//! Ties the phases together:
//! 1. **Projection**: points are tiled and sparse tiles dropped, sequentially
//!    or over a pool of partition workers
//! 2. **Agglomeration**: dense tiles are flood-filled into 8-connected
//!    clusters of at least `min_size` tiles
//! 3. **Labeling**: every clustered tile gets its cluster id; a point is
//!    labeled by looking up its tile, `-1` if the tile is not in a cluster
//!
//! `fit` runs all three phases once. `predict` only quantizes and looks up, so
//! new points can be labeled against an existing clustering at O(1) each.
//!
//! # Example
//!
//! ```
//! use raster::config::RasterConfig;
//! use raster::processors::clustering::{Raster, OUTLIER};
//! use raster::processors::projection::Point;
//!
//! let config = RasterConfig { precision: 0.0, threshold: 1, min_size: 2, ..Default::default() };
//! let mut raster = Raster::new(config).unwrap();
//!
//! let points = vec![Point::new(0.5, 0.5), Point::new(1.5, 0.5), Point::new(9.5, 9.5)];
//! let labels = raster.fit(&points).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_eq!(labels[2], OUTLIER);
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};

use super::agglomeration::cluster_tiles;
use super::parallel;
use super::projection::{self, scalar_for, Point, RasterError, Result, Tile, TileMap, TileSet};
use crate::config::RasterConfig;

/// Label given to points outside every cluster.
pub const OUTLIER: i32 = -1;

/// One row of the cluster report: a cluster id and a coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterRow {
    pub cluster: usize,
    pub x: f64,
    pub y: f64,
}

/// Clusters produced by agglomeration, in either retention variant.
#[derive(Debug, Clone)]
pub enum Clusters {
    /// Count variant: tile keys only.
    Tiles(Vec<TileSet>),
    /// Prime variant: tile keys with their points.
    TilePoints(Vec<TileMap>),
}

impl Clusters {
    /// Number of clusters.
    pub fn len(&self) -> usize {
        match self {
            Clusters::Tiles(c) => c.len(),
            Clusters::TilePoints(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tile keys of each cluster, in cluster id order.
    pub fn tile_sets(&self) -> Vec<TileSet> {
        match self {
            Clusters::Tiles(c) => c.clone(),
            Clusters::TilePoints(c) => c.iter().map(|m| m.keys().copied().collect()).collect(),
        }
    }

    /// Order clusters by their smallest tile so ids do not depend on hash
    /// iteration order.
    fn sort_by_min_tile(&mut self) {
        match self {
            Clusters::Tiles(c) => c.sort_by_cached_key(|s| s.iter().min().copied()),
            Clusters::TilePoints(c) => c.sort_by_cached_key(|m| m.keys().min().copied()),
        }
    }
}

/// Tile → cluster id lookup built from a finished clustering.
#[derive(Debug, Clone)]
pub struct TileLabels {
    labels: HashMap<Tile, i32>,
    scalar: f64,
    num_clusters: usize,
}

impl TileLabels {
    /// Give cluster `i` of `clusters` the id `i`.
    pub fn from_clusters(clusters: &Clusters, scalar: f64) -> Self {
        let mut labels = HashMap::new();
        match clusters {
            Clusters::Tiles(c) => {
                for (id, cluster) in c.iter().enumerate() {
                    labels.extend(cluster.iter().map(|&t| (t, id as i32)));
                }
            }
            Clusters::TilePoints(c) => {
                for (id, cluster) in c.iter().enumerate() {
                    labels.extend(cluster.keys().map(|&t| (t, id as i32)));
                }
            }
        }

        Self {
            labels,
            scalar,
            num_clusters: clusters.len(),
        }
    }

    /// Label of the tile containing `point`, or [`OUTLIER`].
    #[inline]
    pub fn label_of(&self, point: &Point) -> i32 {
        point
            .tile(self.scalar)
            .and_then(|t| self.labels.get(&t).copied())
            .unwrap_or(OUTLIER)
    }

    /// Labels for a slice of points, index-aligned.
    pub fn label_all(&self, points: &[Point]) -> Vec<i32> {
        points.iter().map(|p| self.label_of(p)).collect()
    }

    /// Scalar the lookup quantizes with.
    pub fn scalar(&self) -> f64 {
        self.scalar
    }

    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    /// Number of tiles that belong to some cluster.
    pub fn num_tiles(&self) -> usize {
        self.labels.len()
    }
}

#[derive(Debug, Clone)]
struct Fitted {
    clusters: Clusters,
    tile_labels: TileLabels,
}

/// RASTER estimator with a fit/predict interface.
#[derive(Debug, Clone)]
pub struct Raster {
    config: RasterConfig,
    fitted: Option<Fitted>,
}

impl Raster {
    /// Create an estimator, rejecting invalid parameters up front.
    pub fn new(config: RasterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fitted: None,
        })
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Cluster `points` and return one label per point ([`OUTLIER`] for
    /// points outside every cluster).
    ///
    /// Replaces any previous fit. Empty input is valid and yields no clusters.
    pub fn fit(&mut self, points: &[Point]) -> Result<Vec<i32>> {
        let RasterConfig {
            precision,
            threshold,
            min_size,
            partitions,
            retain_points,
        } = self.config;

        let (mut clusters, scalar) = if retain_points {
            let (tiles, scalar) = if partitions > 1 {
                parallel::map_to_tile_points(points, precision, threshold, partitions)?
            } else {
                projection::map_to_tile_points(points, precision, threshold)?
            };
            (Clusters::TilePoints(cluster_tiles(tiles, min_size)), scalar)
        } else {
            let (tiles, scalar) = if partitions > 1 {
                parallel::map_to_tiles(points, precision, threshold, partitions)?
            } else {
                projection::map_to_tiles(points, precision, threshold)?
            };
            (Clusters::Tiles(cluster_tiles(tiles, min_size)), scalar)
        };

        assert_eq!(
            scalar.to_bits(),
            scalar_for(precision).to_bits(),
            "projection scalar diverged from precision {}",
            precision
        );

        clusters.sort_by_min_tile();
        let tile_labels = TileLabels::from_clusters(&clusters, scalar);
        let labels = tile_labels.label_all(points);

        log::info!(
            "fit {} points: {} clusters over {} tiles, {} outliers",
            points.len(),
            clusters.len(),
            tile_labels.num_tiles(),
            labels.iter().filter(|&&l| l == OUTLIER).count()
        );

        self.fitted = Some(Fitted {
            clusters,
            tile_labels,
        });
        Ok(labels)
    }

    /// Label new points against the clusters found by [`fit`](Self::fit).
    ///
    /// Does not rerun projection or agglomeration.
    pub fn predict(&self, points: &[Point]) -> Result<Vec<i32>> {
        let fitted = self.fitted.as_ref().ok_or(RasterError::NotFitted)?;
        Ok(fitted.tile_labels.label_all(points))
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Clusters of the last fit, ordered by cluster id.
    pub fn clusters(&self) -> Option<&Clusters> {
        self.fitted.as_ref().map(|f| &f.clusters)
    }

    pub fn tile_labels(&self) -> Option<&TileLabels> {
        self.fitted.as_ref().map(|f| &f.tile_labels)
    }

    pub fn num_clusters(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.clusters.len())
    }

    /// Cluster report of the last fit.
    ///
    /// The prime variant lists every retained point. The count variant has no
    /// points left, so it lists the lower-left corner of each clustered tile.
    /// Rows are grouped by cluster id; within a cluster tiles are in key order.
    pub fn cluster_table(&self) -> Result<Vec<ClusterRow>> {
        let fitted = self.fitted.as_ref().ok_or(RasterError::NotFitted)?;
        let scalar = fitted.tile_labels.scalar();
        let mut rows = Vec::new();

        match &fitted.clusters {
            Clusters::Tiles(clusters) => {
                for (id, cluster) in clusters.iter().enumerate() {
                    let mut tiles: Vec<Tile> = cluster.iter().copied().collect();
                    tiles.sort_unstable();
                    rows.extend(tiles.into_iter().map(|(x, y)| ClusterRow {
                        cluster: id,
                        x: f64::from(x) / scalar,
                        y: f64::from(y) / scalar,
                    }));
                }
            }
            Clusters::TilePoints(clusters) => {
                for (id, cluster) in clusters.iter().enumerate() {
                    let mut tiles: Vec<(&Tile, &Vec<Point>)> = cluster.iter().collect();
                    tiles.sort_unstable_by_key(|(t, _)| **t);
                    for (_, points) in tiles {
                        rows.extend(points.iter().map(|p| ClusterRow {
                            cluster: id,
                            x: p.x,
                            y: p.y,
                        }));
                    }
                }
            }
        }

        Ok(rows)
    }
}

/// Files and labels produced by [`process_csv_clustering`].
#[derive(Debug, Clone)]
pub struct ClusteringOutput {
    pub labels_csv: PathBuf,
    pub clusters_csv: PathBuf,
    pub labels: Vec<i32>,
    pub num_clusters: usize,
}

/// Process a point CSV: load, cluster, and save labels and the cluster table.
///
/// # Arguments
///
/// * `csv_path` - Path to input CSV file
/// * `output_dir` - Output directory (defaults to the input's parent directory)
/// * `config` - RASTER parameters
/// * `has_headers` - Whether the input CSV has a header row
///
/// Writes `<stem>_raster_labels.csv` (`x,y,label` per input point) and
/// `<stem>_raster_clusters.csv` (`cluster,x,y`).
///
/// # Errors
///
/// Returns error if the configuration is invalid, or loading, clustering or
/// writing fails.
pub fn process_csv_clustering(
    csv_path: &Path,
    output_dir: Option<&Path>,
    config: &RasterConfig,
    has_headers: bool,
) -> AnyResult<ClusteringOutput> {
    use crate::core::loaders::load_points_csv;
    use crate::core::writers::{write_clusters_csv, write_labels_csv};

    let mut raster = Raster::new(config.clone())?;

    let points = load_points_csv(csv_path, has_headers)
        .with_context(|| format!("Failed to load points from {}", csv_path.display()))?;
    let file_name = csv_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    log::info!("{}: loaded {} points", file_name, points.len());

    let labels = raster
        .fit(&points)
        .with_context(|| format!("Failed to cluster {}", csv_path.display()))?;

    let mut label_counts: HashMap<i32, usize> = HashMap::new();
    for &label in &labels {
        *label_counts.entry(label).or_insert(0) += 1;
    }
    log::debug!("{}: points per label {:?}", file_name, label_counts);

    let out_dir = output_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| csv_path.parent().unwrap_or(Path::new(".")).to_path_buf());
    let stem = csv_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");

    let labels_csv = out_dir.join(format!("{}_raster_labels.csv", stem));
    write_labels_csv(&labels_csv, &points, &labels)?;
    log::info!("Labels CSV -> {}", labels_csv.display());

    let clusters_csv = out_dir.join(format!("{}_raster_clusters.csv", stem));
    write_clusters_csv(&clusters_csv, &raster.cluster_table()?)?;
    log::info!("Clusters CSV -> {}", clusters_csv.display());

    Ok(ClusteringOutput {
        labels_csv,
        clusters_csv,
        labels,
        num_clusters: raster.num_clusters(),
    })
}
