//! Local emissions inventory reader.
//!
//! The table is a delimited text file with one row per (cell, hour). Rows are
//! grouped in sweeps of `nx * ny` consecutive rows, one sweep per hourly
//! frame; the first sweep defines the source cells. The first three columns
//! are always `i`, `lon`, `lat`, the remaining ones are species (plus an
//! optional timestamp column).

use crate::config::{Configuration, TableOptions};
use crate::domain::{AasError, AasResult};
use crate::temporal::parse_timestamp;
use chrono::{Duration, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use ndarray::{Array2, ArrayView1};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use tracing::info;

pub const LEADING_COLUMNS: [&str; 3] = ["i", "lon", "lat"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceCell {
    /// 1-based cell index from the `i` column.
    pub index: usize,
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmissionsTable {
    cells: Vec<SourceCell>,
    species: Vec<String>,
    frame_times: Vec<NaiveDateTime>,
    /// Per species, shape (frames, cells) in table row order.
    values: Vec<Array2<f64>>,
}

impl EmissionsTable {
    pub fn cells(&self) -> &[SourceCell] {
        &self.cells
    }

    pub fn species(&self) -> &[String] {
        &self.species
    }

    pub fn species_index(&self, name: &str) -> Option<usize> {
        self.species.iter().position(|species| species == name)
    }

    pub fn frame_times(&self) -> &[NaiveDateTime] {
        &self.frame_times
    }

    pub fn n_frames(&self) -> usize {
        self.frame_times.len()
    }

    /// Values of one species for one table frame, in table row order.
    pub fn frame_values(&self, species: usize, frame: usize) -> ArrayView1<'_, f64> {
        self.values[species].row(frame)
    }
}

pub fn read_emissions_table(config: &Configuration) -> AasResult<EmissionsTable> {
    let path = &config.emission_path;
    let file = File::open(path).map_err(|source| {
        AasError::io(
            "IO.TABLE_READ",
            format!("failed to open emission file '{}': {}", path.display(), source),
        )
    })?;

    let default_start = config.table.table_start.unwrap_or(config.start);
    let table = parse_emissions_table(
        BufReader::new(file),
        &config.table,
        config.n_cells(),
        default_start,
    )?;
    info!(
        path = %path.display(),
        cells = table.cells.len(),
        frames = table.n_frames(),
        species = table.species.len(),
        "read emissions table"
    );
    Ok(table)
}

pub fn parse_emissions_table<R: Read>(
    reader: R,
    options: &TableOptions,
    n_cells: usize,
    implicit_start: NaiveDateTime,
) -> AasResult<EmissionsTable> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(options.has_header)
        .delimiter(options.delimiter)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = if options.has_header {
        csv_reader
            .headers()
            .map_err(table_read_error)?
            .iter()
            .map(str::to_string)
            .collect()
    } else {
        options.col_names.clone()
    };
    let layout = ColumnLayout::resolve(&columns, options.time_column.as_deref())?;

    let mut cells = Vec::with_capacity(n_cells);
    let mut frame_times = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); layout.species.len()];
    let header_rows = usize::from(options.has_header);

    let mut row = 0_usize;
    for record in csv_reader.records() {
        let record = record.map_err(table_read_error)?;
        let line = row + 1 + header_rows;
        if record.len() != columns.len() {
            return Err(AasError::schema(
                "SCHEMA.FIELD_COUNT",
                format!(
                    "line {} has {} fields, expected {}",
                    line,
                    record.len(),
                    columns.len()
                ),
            ));
        }

        let sweep = row / n_cells;
        let position = row % n_cells;
        let index = parse_index(&record, line)?;

        if sweep == 0 {
            cells.push(SourceCell {
                index,
                lon: parse_number(&record, 1, "lon", line)?,
                lat: parse_number(&record, 2, "lat", line)?,
            });
        } else if cells[position].index != index {
            return Err(AasError::schema(
                "SCHEMA.SWEEP_INDEX",
                format!(
                    "line {} has cell index {} but frame {} expects {} at position {}",
                    line,
                    index,
                    sweep,
                    cells[position].index,
                    position + 1
                ),
            ));
        }

        match layout.time_column {
            Some(column) => {
                let raw = &record[column];
                let timestamp = parse_timestamp(raw).ok_or_else(|| {
                    AasError::schema(
                        "SCHEMA.TIMESTAMP",
                        format!("line {} has unparsable timestamp '{}'", line, raw),
                    )
                })?;
                if position == 0 {
                    frame_times.push(timestamp);
                } else if frame_times[sweep] != timestamp {
                    return Err(AasError::schema(
                        "SCHEMA.SWEEP_TIME",
                        format!(
                            "line {} has timestamp {} but frame {} started at {}",
                            line, timestamp, sweep, frame_times[sweep]
                        ),
                    ));
                }
            }
            None if position == 0 => {
                frame_times.push(implicit_start + Duration::hours(sweep as i64));
            }
            None => {}
        }

        for (slot, (column, name)) in layout.species.iter().enumerate() {
            values[slot].push(parse_number(&record, *column, name, line)?);
        }
        row += 1;
    }

    if row == 0 || row % n_cells != 0 {
        return Err(AasError::io(
            "IO.TABLE_ROW_COUNT",
            format!(
                "emission file has {} data rows, expected a positive multiple of nx*ny = {}",
                row, n_cells
            ),
        ));
    }

    let n_frames = frame_times.len();
    let values = values
        .into_iter()
        .map(|column| {
            Array2::from_shape_vec((n_frames, n_cells), column).map_err(|source| {
                AasError::internal(
                    "SYS.TABLE_SHAPE",
                    format!("failed to shape species column: {}", source),
                )
            })
        })
        .collect::<AasResult<Vec<_>>>()?;

    Ok(EmissionsTable {
        cells,
        species: layout.species.into_iter().map(|(_, name)| name).collect(),
        frame_times,
        values,
    })
}

struct ColumnLayout {
    time_column: Option<usize>,
    species: Vec<(usize, String)>,
}

impl ColumnLayout {
    fn resolve(columns: &[String], time_column: Option<&str>) -> AasResult<Self> {
        let leading: Vec<&str> = columns.iter().take(3).map(String::as_str).collect();
        if leading != LEADING_COLUMNS {
            return Err(AasError::schema(
                "SCHEMA.LEADING_COLUMNS",
                format!(
                    "first three columns must be {:?}, found {:?}",
                    LEADING_COLUMNS, leading
                ),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = columns.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(AasError::schema(
                "SCHEMA.DUPLICATE_COLUMN",
                format!("column '{}' appears more than once", duplicate),
            ));
        }

        let time_column = match time_column {
            Some(name) => Some(
                columns
                    .iter()
                    .skip(3)
                    .position(|column| column == name)
                    .map(|offset| offset + 3)
                    .ok_or_else(|| {
                        AasError::schema(
                            "SCHEMA.TIME_COLUMN",
                            format!("time column '{}' is not among the table columns", name),
                        )
                    })?,
            ),
            None => None,
        };

        let species: Vec<(usize, String)> = columns
            .iter()
            .enumerate()
            .skip(3)
            .filter(|(column, _)| Some(*column) != time_column)
            .map(|(column, name)| (column, name.clone()))
            .collect();
        if species.is_empty() {
            return Err(AasError::schema(
                "SCHEMA.NO_SPECIES",
                "the emission table has no species columns after i, lon, lat",
            ));
        }

        Ok(Self {
            time_column,
            species,
        })
    }
}

fn table_read_error(error: csv::Error) -> AasError {
    if matches!(error.kind(), csv::ErrorKind::Io(_)) {
        AasError::io("IO.TABLE_READ", format!("failed to read emission file: {}", error))
    } else {
        AasError::schema("SCHEMA.PARSE", format!("malformed emission file: {}", error))
    }
}

fn parse_index(record: &StringRecord, line: usize) -> AasResult<usize> {
    let raw = &record[0];
    let parsed = raw.parse::<usize>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|value| *value >= 1.0 && value.fract() == 0.0)
            .map(|value| value as usize)
    });
    match parsed {
        Some(index) if index >= 1 => Ok(index),
        _ => Err(AasError::schema(
            "SCHEMA.CELL_INDEX",
            format!("line {} has invalid cell index '{}'", line, raw),
        )),
    }
}

fn parse_number(record: &StringRecord, column: usize, name: &str, line: usize) -> AasResult<f64> {
    let raw = &record[column];
    raw.parse::<f64>().map_err(|_| {
        AasError::schema(
            "SCHEMA.VALUE",
            format!("line {} column '{}' is not a number: '{}'", line, name, raw),
        )
    })
}
