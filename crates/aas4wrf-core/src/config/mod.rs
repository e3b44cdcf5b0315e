//! YAML run configuration.
//!
//! The document is deserialised into loosely typed `Raw*` structs first and
//! then validated into an immutable [`Configuration`]. Validation touches no
//! file other than the configuration itself, so a bad time range is reported
//! before the emissions table or template grid are opened.

use crate::common::constants::DEFAULT_MOLECULAR_MASSES;
use crate::domain::{AasError, AasResult, FluxConvention, IoStyle, RasterOrder, RegridMethod};
use crate::temporal::{hourly_range, parse_timestamp};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(rename = "Input")]
    input: RawInput,
    #[serde(rename = "Emissions")]
    emissions: RawEmissions,
    #[serde(rename = "Regridding", alias = "Reggriding")]
    regridding: RawRegridding,
    #[serde(rename = "Output")]
    output: RawOutput,
}

#[derive(Debug, Deserialize)]
struct RawInput {
    wrfinput_file: PathBuf,
    emission_file: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawEmissions {
    nx: i64,
    ny: i64,
    cell_area: f64,
    start_date: String,
    end_date: String,
    #[serde(default)]
    header: bool,
    #[serde(default = "default_separator")]
    sep: String,
    #[serde(default)]
    col_names: Vec<String>,
    #[serde(default)]
    raster_order: RasterOrder,
    #[serde(default)]
    time_column: Option<String>,
    #[serde(default)]
    table_start: Option<String>,
    #[serde(default)]
    molecular_mass: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct RawRegridding {
    method: String,
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    output_name: PathBuf,
    #[serde(default)]
    flux_convention: FluxConvention,
    #[serde(default)]
    required_species: Vec<String>,
    #[serde(default)]
    io_style: IoStyle,
}

/// Frames in a run written as two 12-hour files.
pub const SPLIT_12H_FRAMES: usize = 24;

fn default_separator() -> String {
    ",".to_string()
}

/// Parsing options for the delimited emissions table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableOptions {
    pub delimiter: u8,
    pub has_header: bool,
    /// Column names used when the file has no header row.
    pub col_names: Vec<String>,
    /// Column holding per-row timestamps; `None` means timestamps are implied
    /// by sweep order.
    pub time_column: Option<String>,
    /// First implied timestamp; defaults to the run start.
    pub table_start: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub template_path: PathBuf,
    pub emission_path: PathBuf,
    pub output_path: PathBuf,
    pub io_style: IoStyle,
    pub nx: usize,
    pub ny: usize,
    /// Source cell area in km².
    pub cell_area_km2: f64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub table: TableOptions,
    pub raster_order: RasterOrder,
    pub method: RegridMethod,
    pub flux_convention: FluxConvention,
    pub required_species: Vec<String>,
    /// Molecular masses in g/mol keyed by species name.
    pub molecular_masses: BTreeMap<String, f64>,
}

impl Configuration {
    pub fn load(path: &Path) -> AasResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| {
            AasError::io(
                "IO.CONFIG_READ",
                format!("failed to read configuration '{}': {}", path.display(), source),
            )
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> AasResult<Self> {
        let raw: RawConfig = serde_yaml::from_str(content).map_err(|source| {
            AasError::config("CONFIG.PARSE", format!("invalid configuration document: {}", source))
        })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> AasResult<Self> {
        let RawConfig {
            input,
            emissions,
            regridding,
            output,
        } = raw;

        let nx = positive_dimension("nx", emissions.nx)?;
        let ny = positive_dimension("ny", emissions.ny)?;
        if nx.checked_mul(ny).is_none() {
            return Err(AasError::config(
                "CONFIG.GRID_SHAPE",
                format!("nx * ny overflows the cell count: {} x {}", nx, ny),
            ));
        }
        if !(emissions.cell_area.is_finite() && emissions.cell_area > 0.0) {
            return Err(AasError::config(
                "CONFIG.CELL_AREA",
                format!("cell_area must be a positive number of km², got {}", emissions.cell_area),
            ));
        }

        let method = RegridMethod::parse(&regridding.method).ok_or_else(|| {
            AasError::config(
                "CONFIG.METHOD",
                format!(
                    "unsupported regridding method '{}'; expected one of: {}",
                    regridding.method,
                    RegridMethod::ALL.map(RegridMethod::as_str).join(", ")
                ),
            )
        })?;

        let start = config_timestamp("start_date", &emissions.start_date)?;
        let end = config_timestamp("end_date", &emissions.end_date)?;
        if start > end {
            return Err(AasError::config(
                "CONFIG.TIME_ORDER",
                format!(
                    "start_date {} is after end_date {}",
                    emissions.start_date, emissions.end_date
                ),
            ));
        }
        let Some(hours) = hourly_range(start, end) else {
            return Err(AasError::config(
                "CONFIG.TIME_STEP",
                format!(
                    "range {} .. {} is not a whole number of hours",
                    emissions.start_date, emissions.end_date
                ),
            ));
        };
        if output.io_style == IoStyle::Split12h && hours.len() != SPLIT_12H_FRAMES {
            return Err(AasError::config(
                "CONFIG.IO_STYLE",
                format!(
                    "io_style split_12h needs exactly {} hourly frames, the range has {}",
                    SPLIT_12H_FRAMES,
                    hours.len()
                ),
            ));
        }

        let table_start = emissions
            .table_start
            .as_deref()
            .map(|value| config_timestamp("table_start", value))
            .transpose()?;

        let delimiter = single_byte_delimiter(&emissions.sep)?;
        if !emissions.header && emissions.col_names.is_empty() {
            return Err(AasError::config(
                "CONFIG.COL_NAMES",
                "col_names is required when the emission file has no header",
            ));
        }

        let required_species = output.required_species;
        if let Some(duplicate) = first_duplicate(&required_species) {
            return Err(AasError::config(
                "CONFIG.REQUIRED_SPECIES",
                format!("species '{}' is listed twice in required_species", duplicate),
            ));
        }

        let mut molecular_masses: BTreeMap<String, f64> = DEFAULT_MOLECULAR_MASSES
            .iter()
            .map(|(name, mass)| (name.to_string(), *mass))
            .collect();
        for (name, mass) in emissions.molecular_mass {
            if !(mass.is_finite() && mass > 0.0) {
                return Err(AasError::config(
                    "CONFIG.MOLECULAR_MASS",
                    format!("molecular mass for '{}' must be positive, got {}", name, mass),
                ));
            }
            molecular_masses.insert(name, mass);
        }

        Ok(Self {
            template_path: input.wrfinput_file,
            emission_path: input.emission_file,
            output_path: output.output_name,
            io_style: output.io_style,
            nx,
            ny,
            cell_area_km2: emissions.cell_area,
            start,
            end,
            table: TableOptions {
                delimiter,
                has_header: emissions.header,
                col_names: emissions.col_names,
                time_column: emissions.time_column,
                table_start,
            },
            raster_order: emissions.raster_order,
            method,
            flux_convention: output.flux_convention,
            required_species,
            molecular_masses,
        })
    }

    /// Cell count of the source grid; `from_raw` rejects shapes that overflow.
    pub fn n_cells(&self) -> usize {
        self.nx.saturating_mul(self.ny)
    }

    /// Hourly timestamps from start to end inclusive.
    pub fn frame_times(&self) -> Vec<NaiveDateTime> {
        hourly_range(self.start, self.end).unwrap_or_default()
    }
}

fn positive_dimension(key: &str, value: i64) -> AasResult<usize> {
    if value <= 0 {
        return Err(AasError::config(
            "CONFIG.GRID_SHAPE",
            format!("{} must be a positive integer, got {}", key, value),
        ));
    }
    usize::try_from(value).map_err(|_| {
        AasError::config("CONFIG.GRID_SHAPE", format!("{} is too large: {}", key, value))
    })
}

fn first_duplicate(names: &[String]) -> Option<&String> {
    let mut seen = HashSet::new();
    names.iter().find(|name| !seen.insert(name.as_str()))
}

fn config_timestamp(key: &str, value: &str) -> AasResult<NaiveDateTime> {
    parse_timestamp(value).ok_or_else(|| {
        AasError::config(
            "CONFIG.TIME_FORMAT",
            format!("{} '{}' does not match the '%Y-%m-%d %H:%M' format", key, value),
        )
    })
}

fn single_byte_delimiter(sep: &str) -> AasResult<u8> {
    match sep.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(AasError::config(
            "CONFIG.SEPARATOR",
            format!("sep must be a single ASCII character, got {:?}", sep),
        )),
    }
}
