//! Source to target regridding.
//!
//! Both methods reduce to a sparse weight matrix built once per run and
//! applied to every (species, frame) field.

mod conservative;
mod index;
mod nearest;
mod traits;

pub use conservative::ConservativeRegridder;
pub use nearest::NearestS2dRegridder;
pub use traits::Regridder;

use crate::common::geometry::is_valid_lon_lat;
use crate::domain::{AasError, AasResult, RegridMethod};
use ndarray::{Array2, ArrayView2};

pub fn regridder_for(method: RegridMethod) -> Box<dyn Regridder> {
    match method {
        RegridMethod::NearestS2d => Box::new(NearestS2dRegridder),
        RegridMethod::Conservative => Box::new(ConservativeRegridder),
    }
}

/// Row-compressed weights: target cell `t` receives
/// `sum(weights[k] * source[sources[k]])` for `k` in `offsets[t]..offsets[t + 1]`.
/// Cells are addressed row-major over their grid shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct RegridDescriptor {
    method: RegridMethod,
    source_shape: (usize, usize),
    target_shape: (usize, usize),
    offsets: Vec<usize>,
    sources: Vec<usize>,
    weights: Vec<f64>,
}

impl RegridDescriptor {
    pub fn from_rows(
        method: RegridMethod,
        source_shape: (usize, usize),
        target_shape: (usize, usize),
        rows: Vec<Vec<(usize, f64)>>,
    ) -> AasResult<Self> {
        let n_source = source_shape.0 * source_shape.1;
        if rows.len() != target_shape.0 * target_shape.1 {
            return Err(AasError::internal(
                "SYS.DESCRIPTOR_ROWS",
                format!(
                    "{} weight rows for a {:?} target grid",
                    rows.len(),
                    target_shape
                ),
            ));
        }

        let mut offsets = Vec::with_capacity(rows.len() + 1);
        let mut sources = Vec::new();
        let mut weights = Vec::new();
        offsets.push(0);
        for row in rows {
            for (source, weight) in row {
                if source >= n_source {
                    return Err(AasError::internal(
                        "SYS.DESCRIPTOR_SOURCE",
                        format!("weight refers to source cell {} of {}", source, n_source),
                    ));
                }
                sources.push(source);
                weights.push(weight);
            }
            offsets.push(sources.len());
        }

        Ok(Self {
            method,
            source_shape,
            target_shape,
            offsets,
            sources,
            weights,
        })
    }

    pub fn method(&self) -> RegridMethod {
        self.method
    }

    pub fn source_shape(&self) -> (usize, usize) {
        self.source_shape
    }

    pub fn target_shape(&self) -> (usize, usize) {
        self.target_shape
    }

    pub fn n_weights(&self) -> usize {
        self.weights.len()
    }

    /// (source cell, weight) pairs feeding one target cell.
    pub fn row(&self, target: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.offsets[target]..self.offsets[target + 1];
        self.sources[range.clone()]
            .iter()
            .copied()
            .zip(self.weights[range].iter().copied())
    }

    pub fn apply(&self, field: ArrayView2<'_, f64>) -> AasResult<Array2<f64>> {
        if field.dim() != self.source_shape {
            return Err(AasError::regrid(
                "REGRID.FIELD_SHAPE",
                format!(
                    "field shape {:?} differs from the descriptor source shape {:?}",
                    field.dim(),
                    self.source_shape
                ),
            ));
        }

        let nx = self.source_shape.1;
        let target_nx = self.target_shape.1;
        Ok(Array2::from_shape_fn(self.target_shape, |(row, col)| {
            self.row(row * target_nx + col)
                .map(|(source, weight)| weight * field[[source / nx, source % nx]])
                .sum()
        }))
    }
}

/// Rejects NaN or out-of-range coordinates before any weight is computed.
pub(crate) fn validate_coordinates(
    grid: &str,
    lon: ArrayView2<'_, f64>,
    lat: ArrayView2<'_, f64>,
) -> AasResult<()> {
    match lon
        .indexed_iter()
        .zip(lat.iter())
        .find(|((_, x), y)| !is_valid_lon_lat(**x, **y))
    {
        Some((((row, col), x), y)) => Err(AasError::regrid(
            "REGRID.COORDINATES",
            format!(
                "{} cell ({}, {}) has invalid coordinates lon={} lat={}",
                grid, row, col, x, y
            ),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{RegridDescriptor, regridder_for, validate_coordinates};
    use crate::domain::{AasErrorCategory, RegridMethod};
    use ndarray::{Array2, array};

    #[test]
    fn descriptor_applies_sparse_weights() {
        let rows = vec![vec![(0, 0.5), (3, 0.5)], vec![], vec![(1, 1.0)]];
        let descriptor =
            RegridDescriptor::from_rows(RegridMethod::Conservative, (2, 2), (1, 3), rows)
                .expect("valid rows");
        assert_eq!(descriptor.n_weights(), 3);
        let result = descriptor
            .apply(array![[2.0, 7.0], [0.0, 4.0]].view())
            .expect("shape matches");
        assert_eq!(result, array![[3.0, 0.0, 7.0]]);
    }

    #[test]
    fn field_shape_must_match_source_shape() {
        let rows = vec![vec![(0, 1.0)]];
        let descriptor = RegridDescriptor::from_rows(RegridMethod::NearestS2d, (2, 2), (1, 1), rows)
            .expect("valid rows");
        let error = descriptor
            .apply(Array2::zeros((2, 3)).view())
            .expect_err("wrong field shape");
        assert_eq!(error.category(), AasErrorCategory::RegridError);
        assert_eq!(error.placeholder(), "REGRID.FIELD_SHAPE");

        let rows = vec![vec![(5, 1.0)]];
        let error = RegridDescriptor::from_rows(RegridMethod::NearestS2d, (1, 1), (1, 1), rows)
            .expect_err("source index out of range");
        assert_eq!(error.category(), AasErrorCategory::InternalError);
    }

    #[test]
    fn coordinates_are_validated_and_methods_dispatch() {
        let lon = array![[0.0, f64::NAN]];
        let lat = array![[0.0, 0.0]];
        let error =
            validate_coordinates("source", lon.view(), lat.view()).expect_err("NaN longitude");
        assert_eq!(error.placeholder(), "REGRID.COORDINATES");
        assert!(error.message().contains("(0, 1)"));

        for method in RegridMethod::ALL {
            assert_eq!(regridder_for(method).method(), method);
        }
    }
}
