pub mod errors;

pub use errors::{AasError, AasErrorCategory, AasResult, ExitMapping};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegridMethod {
    #[serde(rename = "nearest_s2d")]
    NearestS2d,
    #[serde(rename = "conservative")]
    Conservative,
}

impl RegridMethod {
    pub const ALL: [RegridMethod; 2] = [Self::NearestS2d, Self::Conservative];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NearestS2d => "nearest_s2d",
            Self::Conservative => "conservative",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl Display for RegridMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Mapping from the 1-based table cell index to a (row, column) position.
///
/// `RowMajor` advances along x first (index 1..=nx fills row 0), `ColumnMajor`
/// advances along y first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterOrder {
    #[default]
    RowMajor,
    ColumnMajor,
}

impl RasterOrder {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RowMajor => "row_major",
            Self::ColumnMajor => "column_major",
        }
    }

    /// Zero-based linear position to (row, col) on an `ny` x `nx` grid.
    pub const fn position(self, linear: usize, nx: usize, ny: usize) -> (usize, usize) {
        match self {
            Self::RowMajor => (linear / nx, linear % nx),
            Self::ColumnMajor => (linear % ny, linear / ny),
        }
    }

    /// Inverse of [`RasterOrder::position`].
    pub const fn linear(self, row: usize, col: usize, nx: usize, ny: usize) -> usize {
        match self {
            Self::RowMajor => row * nx + col,
            Self::ColumnMajor => col * ny + row,
        }
    }
}

impl Display for RasterOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FluxConvention {
    /// Values stay areal fluxes (mol km^-2 hr^-1), the `wrfchemi` convention.
    #[default]
    ArealFlux,
    /// Areal flux rescaled by source cell area over target cell area.
    AreaRatio,
    /// Absolute molar rate per source cell (mol hr^-1).
    MolarRate,
}

impl FluxConvention {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ArealFlux => "areal_flux",
            Self::AreaRatio => "area_ratio",
            Self::MolarRate => "molar_rate",
        }
    }

    pub const fn units(self) -> &'static str {
        match self {
            Self::ArealFlux | Self::AreaRatio => "mol km^-2 hr^-1",
            Self::MolarRate => "mol hr^-1",
        }
    }
}

impl Display for FluxConvention {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// How the output is split into files, after WRF-Chem `io_style_emissions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoStyle {
    /// One file at `output_name`.
    #[default]
    Single,
    /// A 24-hour run as `wrfchemi_dNN_00z` and `_12z` halves (`io_style_emissions = 1`).
    Split12h,
    /// One file named after the domain and start date (`io_style_emissions = 2`).
    Dated,
}

impl IoStyle {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Split12h => "split_12h",
            Self::Dated => "dated",
        }
    }
}

impl Display for IoStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}
