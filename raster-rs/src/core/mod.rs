//! File I/O for points and clustering results.

pub mod loaders;
pub mod writers;

pub use loaders::{load_points_csv, LoaderError};
pub use writers::{write_clusters_csv, write_labels_csv, WriteError};
