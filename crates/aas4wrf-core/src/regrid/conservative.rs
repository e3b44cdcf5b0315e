use super::index::RectIndex;
use super::{RegridDescriptor, Regridder, validate_coordinates};
use crate::common::geometry::LonLatRect;
use crate::domain::{AasError, AasResult, RegridMethod};
use crate::grid::{SourceGrid, TargetGrid};
use tracing::debug;

/// First-order area-weighted remapping over lon/lat rectangles.
///
/// The weight of source cell `s` in target cell `t` is the spherical area of
/// their overlap divided by the area of `t`. Target cells without any overlap
/// receive zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConservativeRegridder;

impl Regridder for ConservativeRegridder {
    fn method(&self) -> RegridMethod {
        RegridMethod::Conservative
    }

    fn build_descriptor(
        &self,
        source: &SourceGrid,
        target: &TargetGrid,
    ) -> AasResult<RegridDescriptor> {
        validate_coordinates("source", source.lon(), source.lat())?;
        validate_coordinates("target", target.lon(), target.lat())?;

        let source_rects = source.cell_rects().ok_or_else(|| {
            AasError::regrid(
                "REGRID.SOURCE_BOUNDS",
                format!(
                    "conservative regridding needs at least 2 source cells per axis, grid is {:?}",
                    source.shape()
                ),
            )
        })?;
        let target_rects = target.cell_rects().ok_or_else(|| {
            AasError::regrid(
                "REGRID.TARGET_BOUNDS",
                format!(
                    "template grid {:?} has no staggered coordinates \
                     and fewer than 2 cells on an axis",
                    target.shape()
                ),
            )
        })?;
        check_cells("source", &source_rects)?;
        check_cells("target", &target_rects)?;

        let index = RectIndex::build(&source_rects);
        let rows: Vec<Vec<(usize, f64)>> = target_rects
            .iter()
            .map(|target_rect| {
                let area = target_rect.area_km2();
                index
                    .overlaps(target_rect)
                    .into_iter()
                    .map(|(cell, overlap)| (cell, overlap.area_km2() / area))
                    .filter(|(_, weight)| *weight > 0.0)
                    .collect()
            })
            .collect();

        let descriptor =
            RegridDescriptor::from_rows(self.method(), source.shape(), target.shape(), rows)?;
        debug!(
            source_cells = source_rects.len(),
            target_cells = target_rects.len(),
            weights = descriptor.n_weights(),
            "built conservative descriptor"
        );
        Ok(descriptor)
    }
}

fn check_cells(grid: &str, rects: &[LonLatRect]) -> AasResult<()> {
    match rects
        .iter()
        .position(|rect| rect.is_degenerate() || !(rect.area_km2() > 0.0))
    {
        Some(cell) => Err(AasError::regrid(
            "REGRID.DEGENERATE_CELL",
            format!("{} cell {} has zero area: {:?}", grid, cell, rects[cell]),
        )),
        None => Ok(()),
    }
}
