use super::RegridDescriptor;
use crate::domain::{AasResult, RegridMethod};
use crate::grid::{SourceGrid, TargetGrid};
use ndarray::{Array2, ArrayView2};

pub trait Regridder {
    fn method(&self) -> RegridMethod;

    fn build_descriptor(
        &self,
        source: &SourceGrid,
        target: &TargetGrid,
    ) -> AasResult<RegridDescriptor>;

    fn apply(
        &self,
        descriptor: &RegridDescriptor,
        field: ArrayView2<'_, f64>,
    ) -> AasResult<Array2<f64>> {
        descriptor.apply(field)
    }
}
