use crate::domain::FluxConvention;
use ndarray::{Array2, ArrayView2};

/// Per-cell scaling applied to source fields before regridding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConverter {
    convention: FluxConvention,
    factor: f64,
}

impl UnitConverter {
    pub fn new(convention: FluxConvention, source_area_km2: f64, target_area_km2: f64) -> Self {
        let factor = match convention {
            FluxConvention::ArealFlux => 1.0,
            FluxConvention::AreaRatio => source_area_km2 / target_area_km2,
            FluxConvention::MolarRate => source_area_km2,
        };
        Self { convention, factor }
    }

    pub fn convention(&self) -> FluxConvention {
        self.convention
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn units(&self) -> &'static str {
        self.convention.units()
    }

    pub fn convert(&self, field: ArrayView2<'_, f64>) -> Array2<f64> {
        if self.factor == 1.0 {
            return field.to_owned();
        }
        field.mapv(|value| value * self.factor)
    }
}
