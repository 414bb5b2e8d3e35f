//! Contraction Clustering (RASTER) for large 2D point sets.
//!
//! This crate provides tools for:
//! - Projecting points onto a sparse grid of tiles and keeping the dense ones,
//!   sequentially or across a pool of partition workers
//! - Agglomerating dense tiles into 8-connected clusters
//! - Labeling points by cluster, with `-1` for outliers (fit/predict)
//! - Loading point CSVs, writing label and cluster tables, plotting results
//!
//! # Example
//!
//! ```no_run
//! use raster::{core::loaders::load_points_csv, Raster, RasterConfig};
//!
//! let points = load_points_csv("points.csv", false).unwrap();
//! let mut raster = Raster::new(RasterConfig::default()).unwrap();
//! let labels = raster.fit(&points).unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod visualization;

pub use config::{InputConfig, PipelineConfig, PlotConfig, RasterConfig};
pub use processors::clustering::{Raster, OUTLIER};
pub use processors::projection::{Point, RasterError, Tile};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
