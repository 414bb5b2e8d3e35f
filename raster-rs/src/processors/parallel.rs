//! Parallel projection.
//!
//! The input is cut into `partitions` contiguous index ranges. A dedicated
//! `rayon` pool with one thread per partition runs one spawned task per range,
//! each reading the shared input slice without copying it and writing its
//! partial tile map into its own slot. A thread that finishes early may pick up
//! a task still waiting in the pool. Once the scope has joined every task, the
//! partial maps are merged on the calling thread and the usual threshold filter
//! is applied.
//!
//! Counts are summed and point lists concatenated, both order-independent, so
//! the dense tiles are identical to the sequential
//! [`projection::map_to_tiles`](super::projection::map_to_tiles) for any
//! number of partitions.

use std::collections::HashMap;
use std::ops::Range;

use rayon::ThreadPoolBuilder;

use super::projection::{
    check_projection_params, retain_dense, scalar_for, tile_cells, Counts, Point, Points,
    RasterError, Result, Retention, Tile, TileMap, TileSet,
};

/// Split `0..len` into `parts` contiguous ranges.
///
/// Every range holds `len / parts` indices except the last, which also takes
/// the remainder. When `len < parts` the leading ranges are empty.
pub fn partition_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    let chunk = len / parts;

    (0..parts)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == parts { len } else { start + chunk };
            start..end
        })
        .collect()
}

/// Project each partition as its own task and return one partial map per
/// range, in range order.
///
/// Fails with the error of the first failing partition.
fn project_partials<R: Retention + 'static>(
    points: &[Point],
    scalar: f64,
    partitions: usize,
) -> Result<Vec<HashMap<Tile, R::Cell>>> {
    let ranges = partition_ranges(points.len(), partitions);
    log::debug!(
        "projecting {} points over {} partitions (chunk size {})",
        points.len(),
        ranges.len(),
        points.len() / ranges.len()
    );

    let pool = ThreadPoolBuilder::new()
        .num_threads(ranges.len())
        .thread_name(|i| format!("raster-projection-{}", i))
        .build()
        .map_err(|e| RasterError::WorkerPool(e.to_string()))?;

    let mut slots: Vec<Option<Result<HashMap<Tile, R::Cell>>>> =
        ranges.iter().map(|_| None).collect();

    pool.scope(|s| {
        for (slot, range) in slots.iter_mut().zip(ranges) {
            s.spawn(move |_| {
                *slot = Some(tile_cells::<R>(&points[range.clone()], scalar, range.start));
            });
        }
    });

    // every slot is filled once the scope returns; a panicking task unwinds
    // through scope() instead
    slots.into_iter().flatten().collect()
}

/// Project all partitions and merge the partial maps.
fn project_partitioned<R: Retention + 'static>(
    points: &[Point],
    scalar: f64,
    partitions: usize,
) -> Result<HashMap<Tile, R::Cell>> {
    let partials = project_partials::<R>(points, scalar, partitions)?;
    Ok(merge_partials::<R>(partials))
}

/// Merge partial tile maps key by key.
///
/// The largest partial is used as the accumulator so the fewest entries get
/// rehashed.
fn merge_partials<R: Retention>(mut partials: Vec<HashMap<Tile, R::Cell>>) -> HashMap<Tile, R::Cell> {
    let largest = partials
        .iter()
        .enumerate()
        .max_by_key(|(_, m)| m.len())
        .map(|(i, _)| i);

    let mut merged = match largest {
        Some(i) => partials.swap_remove(i),
        None => return HashMap::new(),
    };

    for partial in partials {
        for (tile, cell) in partial {
            R::absorb(merged.entry(tile).or_default(), cell);
        }
    }

    merged
}

/// Parallel version of
/// [`projection::map_to_tiles`](super::projection::map_to_tiles).
///
/// Fails as a whole if any partition fails; no partial result is returned.
pub fn map_to_tiles(
    points: &[Point],
    precision: f64,
    threshold: usize,
    partitions: usize,
) -> Result<(TileSet, f64)> {
    check_projection_params(precision, threshold)?;
    check_partitions(partitions)?;
    let scalar = scalar_for(precision);

    let merged = project_partitioned::<Counts>(points, scalar, partitions)?;
    let dense: TileSet = retain_dense::<Counts>(merged, threshold)
        .into_keys()
        .collect();

    Ok((dense, scalar))
}

/// Parallel version of
/// [`projection::map_to_tile_points`](super::projection::map_to_tile_points).
pub fn map_to_tile_points(
    points: &[Point],
    precision: f64,
    threshold: usize,
    partitions: usize,
) -> Result<(TileMap, f64)> {
    check_projection_params(precision, threshold)?;
    check_partitions(partitions)?;
    let scalar = scalar_for(precision);

    let merged = project_partitioned::<Points>(points, scalar, partitions)?;

    Ok((retain_dense::<Points>(merged, threshold), scalar))
}

fn check_partitions(partitions: usize) -> Result<()> {
    if partitions == 0 {
        return Err(RasterError::InvalidParameter {
            name: "partitions",
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}
