//! Configuration types for the RASTER pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::processors::projection::{check_projection_params, RasterError};

/// Errors raised while reading or writing a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Invalid(#[from] RasterError),
}

/// Parameters of the RASTER algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterConfig {
    /// Decimal digits kept when tiling; `scalar = 10^precision`
    #[serde(default = "default_precision")]
    pub precision: f64,

    /// Minimum observations for a tile to be dense
    #[serde(default = "default_threshold")]
    pub threshold: usize,

    /// Minimum number of tiles in a cluster
    #[serde(default = "default_min_size")]
    pub min_size: usize,

    /// Number of projection workers (1 = sequential)
    #[serde(default = "default_partitions")]
    pub partitions: usize,

    /// Keep the points of each tile (RASTER prime)
    #[serde(default)]
    pub retain_points: bool,
}

fn default_precision() -> f64 {
    3.5
}

fn default_threshold() -> usize {
    5
}

fn default_min_size() -> usize {
    4
}

fn default_partitions() -> usize {
    1
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            precision: default_precision(),
            threshold: default_threshold(),
            min_size: default_min_size(),
            partitions: default_partitions(),
            retain_points: false,
        }
    }
}

impl RasterConfig {
    /// Reject parameters outside their valid range before any data is touched.
    pub fn validate(&self) -> Result<(), RasterError> {
        check_projection_params(self.precision, self.threshold)?;
        if self.min_size == 0 {
            return Err(RasterError::InvalidParameter {
                name: "min_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.partitions == 0 {
            return Err(RasterError::InvalidParameter {
                name: "partitions",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration for reading point files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    /// Whether the first CSV row is a header
    #[serde(default)]
    pub has_headers: bool,
}

/// Configuration for plotting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Maximum points drawn (subsamples if exceeded)
    #[serde(default = "default_plot_max_points")]
    pub max_points: usize,
}

fn default_plot_max_points() -> usize {
    1_000_000
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            max_points: default_plot_max_points(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub raster: RasterConfig,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub plot: PlotConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file and validate it.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        config.raster.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
