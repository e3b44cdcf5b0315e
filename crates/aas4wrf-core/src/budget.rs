//! Total emitted mass before and after regridding.

use crate::domain::FluxConvention;
use ndarray::ArrayView2;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Grams per kilotonne.
const GRAMS_PER_KTN: f64 = 1.0e9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetRow {
    pub species: String,
    /// g/mol
    pub molecular_mass: f64,
    pub source_ktn: f64,
    pub target_ktn: f64,
}

impl BudgetRow {
    pub fn relative_difference(&self) -> f64 {
        if self.source_ktn == 0.0 {
            return if self.target_ktn == 0.0 { 0.0 } else { f64::INFINITY };
        }
        (self.target_ktn - self.source_ktn) / self.source_ktn
    }
}

#[derive(Debug, Clone)]
pub struct MassBudget {
    source_area_km2: f64,
    target_area_km2: f64,
    target_is_areal: bool,
    /// species -> (molecular mass, source mol, target mol)
    totals: BTreeMap<String, (f64, f64, f64)>,
}

impl MassBudget {
    /// Only entries of `species` with a known molecular mass are tracked.
    pub fn new(
        molecular_masses: &BTreeMap<String, f64>,
        species: &[String],
        source_area_km2: f64,
        target_area_km2: f64,
        convention: FluxConvention,
    ) -> Self {
        let totals = species
            .iter()
            .filter_map(|name| {
                molecular_masses
                    .get(name)
                    .map(|mass| (name.clone(), (*mass, 0.0, 0.0)))
            })
            .collect();
        Self {
            source_area_km2,
            target_area_km2,
            target_is_areal: convention != FluxConvention::MolarRate,
            totals,
        }
    }

    pub fn tracks(&self, species: &str) -> bool {
        self.totals.contains_key(species)
    }

    /// Source field in mol km^-2 hr^-1, one hour.
    pub fn record_source(&mut self, species: &str, field: ArrayView2<'_, f64>) {
        let area = self.source_area_km2;
        if let Some(total) = self.totals.get_mut(species) {
            total.1 += field.sum() * area;
        }
    }

    /// Regridded field in output units, one hour.
    pub fn record_target(&mut self, species: &str, field: ArrayView2<'_, f64>) {
        let area = if self.target_is_areal { self.target_area_km2 } else { 1.0 };
        if let Some(total) = self.totals.get_mut(species) {
            total.2 += field.sum() * area;
        }
    }

    pub fn rows(&self) -> Vec<BudgetRow> {
        self.totals
            .iter()
            .map(|(species, (mass, source, target))| BudgetRow {
                species: species.clone(),
                molecular_mass: *mass,
                source_ktn: source * mass / GRAMS_PER_KTN,
                target_ktn: target * mass / GRAMS_PER_KTN,
            })
            .collect()
    }

    pub fn log(&self) {
        for row in self.rows() {
            info!(
                species = %row.species,
                input_ktn = row.source_ktn,
                regridded_ktn = row.target_ktn,
                "total emission"
            );
        }
    }
}
