//! Agglomeration: connected components over dense tiles.
//!
//! Two tiles are adjacent when their grid coordinates differ by at most one on
//! each axis (8-connectivity). Components are discovered by a flood-fill that
//! removes every tile from the working collection the moment it is reached,
//! so removal doubles as the visited mark and each tile is examined once.
//! Components smaller than `min_size` are dropped.
//!
//! The working collection is consumed entirely. Only the resulting partition
//! is meaningful; the order in which clusters are emitted is arbitrary.

use std::collections::HashMap;

use super::projection::{Tile, TileSet};

/// The 8 grid neighbors of a tile.
#[inline]
pub fn neighbors((x, y): Tile) -> [Tile; 8] {
    [
        (x + 1, y),
        (x - 1, y),
        (x, y + 1),
        (x, y - 1),
        (x + 1, y - 1),
        (x + 1, y + 1),
        (x - 1, y - 1),
        (x - 1, y + 1),
    ]
}

/// A keyed collection of dense tiles that can be consumed tile by tile.
///
/// Implemented for [`TileSet`] (count variant) and for any `HashMap<Tile, V>`
/// such as [`TileMap`](super::projection::TileMap) (prime variant).
pub trait TileStore: Default {
    /// Payload carried along with a tile.
    type Entry;

    /// Remove a tile, returning its payload if it was present.
    fn take(&mut self, tile: &Tile) -> Option<Self::Entry>;

    /// Insert a tile with its payload.
    fn put(&mut self, tile: Tile, entry: Self::Entry);

    /// Snapshot of all tile keys currently held.
    fn keys(&self) -> Vec<Tile>;

    /// Number of tiles held.
    fn len(&self) -> usize;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TileStore for TileSet {
    type Entry = ();

    #[inline]
    fn take(&mut self, tile: &Tile) -> Option<()> {
        self.remove(tile).then_some(())
    }

    #[inline]
    fn put(&mut self, tile: Tile, _entry: ()) {
        self.insert(tile);
    }

    fn keys(&self) -> Vec<Tile> {
        self.iter().copied().collect()
    }

    #[inline]
    fn len(&self) -> usize {
        TileSet::len(self)
    }
}

impl<V> TileStore for HashMap<Tile, V> {
    type Entry = V;

    #[inline]
    fn take(&mut self, tile: &Tile) -> Option<V> {
        self.remove(tile)
    }

    #[inline]
    fn put(&mut self, tile: Tile, entry: V) {
        self.insert(tile, entry);
    }

    fn keys(&self) -> Vec<Tile> {
        HashMap::keys(self).copied().collect()
    }

    #[inline]
    fn len(&self) -> usize {
        HashMap::len(self)
    }
}

/// Remove every neighbor of `tile` still in `tiles` and push it onto `frontier`.
fn pop_neighbors<S: TileStore>(tile: Tile, tiles: &mut S, frontier: &mut Vec<(Tile, S::Entry)>) {
    for n in neighbors(tile) {
        if let Some(entry) = tiles.take(&n) {
            frontier.push((n, entry));
        }
    }
}

/// Cluster dense tiles into 8-connected components of at least `min_size`
/// tiles.
///
/// `tiles` is consumed: every tile ends up either in exactly one returned
/// cluster or in a discarded undersized component.
///
/// Seeds are drawn from a snapshot of the initial keys; keys already taken by
/// an earlier flood-fill are skipped, which keeps picking the next seed O(1)
/// instead of rescanning the hash table.
pub fn cluster_tiles<S: TileStore>(tiles: S, min_size: usize) -> Vec<S> {
    let mut to_visit = tiles;
    let seeds = to_visit.keys();
    let mut clusters = Vec::new();
    let mut frontier: Vec<(Tile, S::Entry)> = Vec::new();
    let mut rejected = 0usize;

    for seed in seeds {
        let Some(entry) = to_visit.take(&seed) else {
            continue;
        };

        let mut cluster = S::default();
        cluster.put(seed, entry);
        pop_neighbors(seed, &mut to_visit, &mut frontier);

        while let Some((tile, entry)) = frontier.pop() {
            cluster.put(tile, entry);
            pop_neighbors(tile, &mut to_visit, &mut frontier);
        }

        if cluster.len() >= min_size {
            clusters.push(cluster);
        } else {
            rejected += 1;
        }
    }

    debug_assert!(to_visit.is_empty(), "agglomeration left tiles unvisited");
    log::debug!(
        "agglomeration: {} clusters kept, {} components below min_size {}",
        clusters.len(),
        rejected,
        min_size
    );

    clusters
}
