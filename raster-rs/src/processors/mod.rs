//! RASTER processing phases.

pub mod agglomeration;
pub mod clustering;
pub mod parallel;
pub mod projection;

// Re-export key types for convenience
pub use agglomeration::{cluster_tiles, TileStore};
pub use clustering::{
    process_csv_clustering, ClusterRow, ClusteringOutput, Clusters, Raster, TileLabels, OUTLIER,
};
pub use projection::{
    map_to_tile_points, map_to_tiles, Point, RasterError, Tile, TileMap, TileSet,
};
