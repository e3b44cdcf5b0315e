use super::index::CentreIndex;
use super::{RegridDescriptor, Regridder, validate_coordinates};
use crate::domain::{AasError, AasResult, RegridMethod};
use crate::grid::{SourceGrid, TargetGrid};
use tracing::debug;

/// Each target cell copies the source cell whose centre is closest on the
/// sphere. Equal distances resolve to the earlier source cell in raster order.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestS2dRegridder;

impl Regridder for NearestS2dRegridder {
    fn method(&self) -> RegridMethod {
        RegridMethod::NearestS2d
    }

    fn build_descriptor(
        &self,
        source: &SourceGrid,
        target: &TargetGrid,
    ) -> AasResult<RegridDescriptor> {
        validate_coordinates("source", source.lon(), source.lat())?;
        validate_coordinates("target", target.lon(), target.lat())?;

        let (_, source_nx) = source.shape();
        let index = CentreIndex::build(source.raster_positions().map(|(row, col)| {
            (
                row * source_nx + col,
                source.lon()[[row, col]],
                source.lat()[[row, col]],
            )
        }));

        let mut rows = Vec::with_capacity(target.n_cells());
        for (&lon, &lat) in target.lon().iter().zip(target.lat().iter()) {
            let cell = index.nearest(lon, lat).ok_or_else(|| {
                AasError::regrid("REGRID.EMPTY_SOURCE", "source grid has no cells")
            })?;
            rows.push(vec![(cell, 1.0)]);
        }

        debug!(
            source_cells = index.len(),
            target_cells = rows.len(),
            "built nearest_s2d descriptor"
        );
        RegridDescriptor::from_rows(self.method(), source.shape(), target.shape(), rows)
    }
}
