//! R-tree indexes over source cells, built once per descriptor.

use crate::common::geometry::{LonLatRect, unit_vector};
use rstar::{AABB, PointDistance, RTree, RTreeObject};

/// Relative slack on squared chord lengths under which two source centres
/// count as equally distant.
const TIE_TOLERANCE: f64 = 1.0e-9;

/// Source centre on the unit sphere. Chord length is monotonic in
/// great-circle distance, so Euclidean nearest is spherical nearest.
#[derive(Debug, Clone, Copy)]
struct CentrePoint {
    position: [f64; 3],
    /// Row-major cell over (ny, nx).
    cell: usize,
    /// Position in the configured raster order.
    raster: usize,
}

impl RTreeObject for CentrePoint {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for CentrePoint {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        self.position
            .iter()
            .zip(point)
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

pub(super) struct CentreIndex {
    tree: RTree<CentrePoint>,
}

impl CentreIndex {
    /// `centres` yields `(cell, lon, lat)` in raster order.
    pub(super) fn build(centres: impl IntoIterator<Item = (usize, f64, f64)>) -> Self {
        let points: Vec<CentrePoint> = centres
            .into_iter()
            .enumerate()
            .map(|(raster, (cell, lon, lat))| CentrePoint {
                position: unit_vector(lon, lat),
                cell,
                raster,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(points),
        }
    }

    pub(super) fn len(&self) -> usize {
        self.tree.size()
    }

    /// Closest source cell; among equally close cells the earliest in raster
    /// order.
    pub(super) fn nearest(&self, lon: f64, lat: f64) -> Option<usize> {
        let query = unit_vector(lon, lat);
        let mut hits = self.tree.nearest_neighbor_iter(&query);
        let first = hits.next()?;
        let limit = first.distance_2(&query) * (1.0 + TIE_TOLERANCE);
        let tied = hits.take_while(|hit| hit.distance_2(&query) <= limit);
        std::iter::once(first)
            .chain(tied)
            .min_by_key(|hit| hit.raster)
            .map(|hit| hit.cell)
    }
}

#[derive(Debug, Clone, Copy)]
struct CellEnvelope {
    cell: usize,
    rect: LonLatRect,
}

impl RTreeObject for CellEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        envelope_of(&self.rect)
    }
}

fn envelope_of(rect: &LonLatRect) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.west, rect.south], [rect.east, rect.north])
}

pub(super) struct RectIndex {
    tree: RTree<CellEnvelope>,
}

impl RectIndex {
    /// `rects` are row-major over the source grid.
    pub(super) fn build(rects: &[LonLatRect]) -> Self {
        let envelopes = rects
            .iter()
            .enumerate()
            .map(|(cell, rect)| CellEnvelope { cell, rect: *rect })
            .collect();
        Self {
            tree: RTree::bulk_load(envelopes),
        }
    }

    /// `(cell, overlap)` for every source cell sharing a positive area with
    /// `rect`, ordered by cell.
    pub(super) fn overlaps(&self, rect: &LonLatRect) -> Vec<(usize, LonLatRect)> {
        let mut hits: Vec<(usize, LonLatRect)> = self
            .tree
            .locate_in_envelope_intersecting(&envelope_of(rect))
            .filter_map(|candidate| {
                rect.intersection(&candidate.rect)
                    .map(|overlap| (candidate.cell, overlap))
            })
            .collect();
        hits.sort_by_key(|(cell, _)| *cell);
        hits
    }
}
