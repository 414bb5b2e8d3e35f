//! Visualization of clustering results.
//!
//! Renders labeled points as a 2D scatter plot (PNG) using plotters, one color
//! per cluster and gray for outliers. Axis text is not drawn, so no font
//! backend is needed.

use std::path::Path;

use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::processors::clustering::OUTLIER;
use crate::processors::projection::Point;

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("No points to plot")]
    EmptyInput,

    #[error("length mismatch: {points} points, {labels} labels")]
    LengthMismatch { points: usize, labels: usize },
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Default plot width in pixels.
const DEFAULT_WIDTH: u32 = 1920;

/// Default plot height in pixels.
const DEFAULT_HEIGHT: u32 = 1080;

/// Color palette for cluster visualization.
const CLUSTER_COLORS: &[(u8, u8, u8)] = &[
    (228, 26, 28),   // Red
    (55, 126, 184),  // Blue
    (77, 175, 74),   // Green
    (152, 78, 163),  // Purple
    (255, 127, 0),   // Orange
    (166, 86, 40),   // Brown
    (247, 129, 191), // Pink
    (0, 206, 209),   // Turquoise
    (138, 43, 226),  // Blue Violet
    (50, 205, 50),   // Lime Green
    (255, 20, 147),  // Deep Pink
    (0, 191, 255),   // Deep Sky Blue
    (255, 215, 0),   // Gold
];

/// Outlier color (light gray) for points with label -1.
const OUTLIER_COLOR: (u8, u8, u8) = (200, 200, 200);

/// Color assigned to a label.
fn label_color(label: i32) -> RGBColor {
    let (r, g, b) = if label == OUTLIER || label < 0 {
        OUTLIER_COLOR
    } else {
        CLUSTER_COLORS[label as usize % CLUSTER_COLORS.len()]
    };
    RGBColor(r, g, b)
}

/// Plot labeled points as a PNG scatter plot.
///
/// # Arguments
///
/// * `output_path` - Path to save the PNG image
/// * `points` - Points to draw
/// * `labels` - Cluster label per point, index-aligned with `points`
/// * `max_points` - Maximum number of points to plot (subsamples by stride if exceeded)
///
/// Outliers are drawn first so clusters stay visible on top of them.
pub fn plot_labeled_points(
    output_path: &Path,
    points: &[Point],
    labels: &[i32],
    max_points: usize,
) -> Result<()> {
    if points.is_empty() {
        return Err(VisualizationError::EmptyInput);
    }
    if points.len() != labels.len() {
        return Err(VisualizationError::LengthMismatch {
            points: points.len(),
            labels: labels.len(),
        });
    }

    let n = points.len();
    let step = if n > max_points.max(1) { n.div_ceil(max_points.max(1)) } else { 1 };

    let mut sampled: Vec<(f64, f64, i32)> = (0..n)
        .step_by(step)
        .map(|i| (points[i].x, points[i].y, labels[i]))
        .collect();
    // outliers (-1) sort first
    sampled.sort_by_key(|&(_, _, label)| label);

    let (x_min, x_max, y_min, y_max) = compute_bounds(&sampled);
    let x_padding = (x_max - x_min) * 0.05;
    let y_padding = (y_max - y_min) * 0.05;

    let root = BitMapBackend::new(output_path, (DEFAULT_WIDTH, DEFAULT_HEIGHT)).into_drawing_area();

    root.fill(&WHITE)
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .build_cartesian_2d(
            (x_min - x_padding)..(x_max + x_padding),
            (y_min - y_padding)..(y_max + y_padding),
        )
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    chart
        .draw_series(
            sampled
                .iter()
                .map(|&(x, y, label)| Circle::new((x, y), 2, label_color(label).filled())),
        )
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    root.present()
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    log::info!(
        "plotted {} of {} points -> {}",
        sampled.len(),
        n,
        output_path.display()
    );
    Ok(())
}

/// Compute the bounds (min/max) for x and y coordinates, ignoring non-finite
/// values.
fn compute_bounds(points: &[(f64, f64, i32)]) -> (f64, f64, f64, f64) {
    let mut x_min = f64::MAX;
    let mut x_max = f64::MIN;
    let mut y_min = f64::MAX;
    let mut y_max = f64::MIN;

    for &(x, y, _) in points {
        if x.is_finite() {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
        }
        if y.is_finite() {
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }

    if x_min > x_max {
        x_min = 0.0;
        x_max = 0.0;
    }
    if y_min > y_max {
        y_min = 0.0;
        y_max = 0.0;
    }
    if (x_max - x_min).abs() < f64::EPSILON {
        x_min -= 1.0;
        x_max += 1.0;
    }
    if (y_max - y_min).abs() < f64::EPSILON {
        y_min -= 1.0;
        y_max += 1.0;
    }

    (x_min, x_max, y_min, y_max)
}
