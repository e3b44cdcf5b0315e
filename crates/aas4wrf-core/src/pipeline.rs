//! End-to-end run: table → source grid → alignment → template → regrid →
//! dataset → output files.

use crate::budget::{BudgetRow, MassBudget};
use crate::common::constants::{RADM2_SORGAM_SPECIES, WRF_DATE_FORMAT};
use crate::config::Configuration;
use crate::domain::{AasError, AasResult, FluxConvention, RegridMethod};
use crate::emissions::{EmissionsTable, read_emissions_table};
use crate::grid::SourceGrid;
use crate::io::{DatasetWriter, GridTemplateReader, NetcdfDatasetWriter, NetcdfTemplateReader};
use crate::output::{DatasetAssembler, OutputFile, plan_output_files, zero_dataset};
use crate::regrid::regridder_for;
use crate::temporal::{align_frames, hourly_range};
use crate::units::UnitConverter;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Written files in write order.
    pub outputs: Vec<PathBuf>,
    /// `None` for zero-emission files.
    pub method: Option<RegridMethod>,
    pub flux_convention: FluxConvention,
    pub start: String,
    pub end: String,
    pub frames: usize,
    /// (south_north, west_east)
    pub grid_shape: (usize, usize),
    pub species: Vec<String>,
    pub zero_filled: Vec<String>,
    pub budget: Vec<BudgetRow>,
}

impl RunSummary {
    pub fn render_human(&self) -> String {
        let mut text = String::new();
        for output in &self.outputs {
            let _ = writeln!(text, "Output:   {}", output.display());
        }
        let _ = writeln!(
            text,
            "Method:   {}",
            self.method.map_or("none (zero emissions)", RegridMethod::as_str)
        );
        let _ = writeln!(text, "Period:   {} .. {} ({} frames)", self.start, self.end, self.frames);
        let _ = writeln!(text, "Grid:     {} x {}", self.grid_shape.0, self.grid_shape.1);
        let _ = writeln!(text, "Species:  {}", self.species.len());
        if !self.zero_filled.is_empty() {
            let _ = writeln!(text, "Zero-filled: {}", self.zero_filled.join(", "));
        }
        if !self.budget.is_empty() {
            let _ = writeln!(text, "Total emission (kTn): input -> regridded");
            for row in &self.budget {
                let _ = writeln!(
                    text,
                    "  {:<8} {:>12.2} -> {:>12.2}",
                    row.species, row.source_ktn, row.target_ktn
                );
            }
        }
        text
    }
}

/// Loads the configuration and runs with the NetCDF collaborators.
pub fn run_from_config_path(path: &Path) -> AasResult<RunSummary> {
    let config = Configuration::load(path)?;
    info!(config = %path.display(), method = %config.method, "loaded configuration");
    run_with(&config, &NetcdfTemplateReader, &NetcdfDatasetWriter)
}

pub fn run_with(
    config: &Configuration,
    reader: &dyn GridTemplateReader,
    writer: &dyn DatasetWriter,
) -> AasResult<RunSummary> {
    let table = read_emissions_table(config)?;
    let source = SourceGrid::build(
        table.cells(),
        config.nx,
        config.ny,
        config.raster_order,
        config.cell_area_km2,
    )?;
    let alignment = align_frames(config.start, config.end, table.frame_times())?;
    info!(frames = alignment.len(), "aligned table frames to the run period");

    let target = reader.read_template(&config.template_path)?;
    let regridder = regridder_for(config.method);
    let descriptor = regridder.build_descriptor(&source, &target)?;
    info!(
        method = %config.method,
        weights = descriptor.n_weights(),
        "built regridding descriptor"
    );

    let plan = output_species(&config.required_species, &table);
    let species: Vec<String> = plan.iter().map(|(name, _)| name.clone()).collect();
    let zero_filled: Vec<String> = plan
        .iter()
        .filter(|(_, column)| column.is_none())
        .map(|(name, _)| name.clone())
        .collect();
    for name in &zero_filled {
        warn!(species = %name, "required species missing from the emissions table; writing zeros");
    }

    let converter = UnitConverter::new(
        config.flux_convention,
        config.cell_area_km2,
        target.cell_area_km2(),
    );
    let mut budget = MassBudget::new(
        &config.molecular_masses,
        &species,
        config.cell_area_km2,
        target.cell_area_km2(),
        config.flux_convention,
    );
    let mut assembler = DatasetAssembler::new(&target, &alignment.times, config.flux_convention);

    for (name, column) in &plan {
        let slot = assembler.add_species(name)?;
        let Some(column) = *column else {
            continue;
        };
        for (frame, (table_frame, time)) in alignment.iter().enumerate() {
            let field = source.to_field(table.frame_values(column, table_frame))?;
            budget.record_source(name, field.view());
            let converted = converter.convert(field.view());
            let regridded = regridder.apply(&descriptor, converted.view())?;
            budget.record_target(name, regridded.view());
            assembler.put_frame(slot, frame, regridded.view())?;
            debug!(species = %name, time = %time, "regridded frame");
        }
    }

    let files = plan_output_files(config.io_style, &config.output_path, assembler.finish())?;
    let outputs = write_files(&files, writer)?;
    budget.log();

    let summary = RunSummary {
        outputs,
        method: Some(config.method),
        flux_convention: config.flux_convention,
        start: config.start.format(WRF_DATE_FORMAT).to_string(),
        end: config.end.format(WRF_DATE_FORMAT).to_string(),
        frames: alignment.len(),
        grid_shape: target.shape(),
        species,
        zero_filled,
        budget: budget.rows(),
    };
    info!(
        files = summary.outputs.len(),
        io_style = %config.io_style,
        species = summary.species.len(),
        frames = summary.frames,
        "emissions file complete"
    );
    Ok(summary)
}

/// Writes every planned file in order.
fn write_files(files: &[OutputFile], writer: &dyn DatasetWriter) -> AasResult<Vec<PathBuf>> {
    let mut outputs = Vec::with_capacity(files.len());
    for file in files {
        writer.write_dataset(&file.dataset, &file.path)?;
        debug!(output = %file.path.display(), frames = file.dataset.n_times(), "wrote output file");
        outputs.push(file.path.clone());
    }
    Ok(outputs)
}

/// Required species first (in their configured order), then the remaining
/// table species in column order. `None` marks a species absent from the
/// table.
fn output_species(required: &[String], table: &EmissionsTable) -> Vec<(String, Option<usize>)> {
    let required_set: HashSet<&str> = required.iter().map(String::as_str).collect();
    required
        .iter()
        .map(|name| (name.clone(), table.species_index(name)))
        .chain(
            table
                .species()
                .iter()
                .enumerate()
                .filter(|(_, name)| !required_set.contains(name.as_str()))
                .map(|(column, name)| (name.clone(), Some(column))),
        )
        .collect()
}

/// Inputs for an all-zero `wrfchemi` file.
#[derive(Debug, Clone, PartialEq)]
pub struct ZeroFileRequest {
    pub template_path: PathBuf,
    pub output_path: PathBuf,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Empty means the RADM2/MADE-SORGAM species list.
    pub species: Vec<String>,
}

pub fn write_zero_file(request: &ZeroFileRequest) -> AasResult<RunSummary> {
    write_zero_file_with(request, &NetcdfTemplateReader, &NetcdfDatasetWriter)
}

pub fn write_zero_file_with(
    request: &ZeroFileRequest,
    reader: &dyn GridTemplateReader,
    writer: &dyn DatasetWriter,
) -> AasResult<RunSummary> {
    if request.start > request.end {
        return Err(AasError::config(
            "CONFIG.TIME_ORDER",
            format!("start {} is after end {}", request.start, request.end),
        ));
    }
    let times = hourly_range(request.start, request.end).ok_or_else(|| {
        AasError::config(
            "CONFIG.TIME_STEP",
            format!(
                "range {} .. {} is not a whole number of hours",
                request.start, request.end
            ),
        )
    })?;
    let species: Vec<String> = if request.species.is_empty() {
        RADM2_SORGAM_SPECIES.iter().map(|name| name.to_string()).collect()
    } else {
        request.species.clone()
    };

    let target = reader.read_template(&request.template_path)?;
    let convention = FluxConvention::default();
    let dataset = zero_dataset(&target, &times, &species, convention)?;
    writer.write_dataset(&dataset, &request.output_path)?;
    info!(
        output = %request.output_path.display(),
        species = species.len(),
        frames = times.len(),
        "zero emissions file complete"
    );

    Ok(RunSummary {
        outputs: vec![request.output_path.clone()],
        method: None,
        flux_convention: convention,
        start: request.start.format(WRF_DATE_FORMAT).to_string(),
        end: request.end.format(WRF_DATE_FORMAT).to_string(),
        frames: times.len(),
        grid_shape: target.shape(),
        zero_filled: species.clone(),
        species,
        budget: Vec::new(),
    })
}
