use aas4wrf_core::config::Configuration;
use aas4wrf_core::domain::{AasErrorCategory, AasResult, RasterOrder, RegridMethod};
use aas4wrf_core::emissions::SourceCell;
use aas4wrf_core::grid::{SourceGrid, TargetGrid};
use aas4wrf_core::io::{DatasetWriter, GridTemplateReader};
use aas4wrf_core::output::{AttributeValue, Attributes, EmissionsDataset};
use aas4wrf_core::pipeline::{ZeroFileRequest, run_with, write_zero_file_with};
use aas4wrf_core::temporal::parse_timestamp;
use ndarray::Array2;
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct FixedTemplate {
    grid: TargetGrid,
    reads: Cell<usize>,
}

impl FixedTemplate {
    fn new(grid: TargetGrid) -> Self {
        Self {
            grid,
            reads: Cell::new(0),
        }
    }
}

impl GridTemplateReader for FixedTemplate {
    fn read_template(&self, _path: &Path) -> AasResult<TargetGrid> {
        self.reads.set(self.reads.get() + 1);
        Ok(self.grid.clone())
    }
}

#[derive(Default)]
struct CapturingWriter {
    written: RefCell<Vec<(PathBuf, EmissionsDataset)>>,
}

impl DatasetWriter for CapturingWriter {
    fn write_dataset(&self, dataset: &EmissionsDataset, path: &Path) -> AasResult<()> {
        self.written
            .borrow_mut()
            .push((path.to_path_buf(), dataset.clone()));
        Ok(())
    }
}

/// Square target grid of `n` cells per axis starting at (-47.0, -24.0).
fn target_grid(n: usize, spacing: f64, dx_m: f64) -> TargetGrid {
    let lon = Array2::from_shape_fn((n, n), |(_, c)| -47.0 + (c as f64 + 0.5) * spacing);
    let lat = Array2::from_shape_fn((n, n), |(r, _)| -24.0 + (r as f64 + 0.5) * spacing);
    let attributes: Attributes = [
        ("GRID_ID", AttributeValue::Int(1)),
        ("MAP_PROJ", AttributeValue::Int(3)),
    ]
    .into_iter()
    .collect();
    TargetGrid::new(lon, lat, dx_m, dx_m)
        .expect("target grid should be valid")
        .with_global_attributes(attributes)
}

/// Rows of a row-major `nx` x `ny` table with one value per species, repeated
/// for `hours` sweeps.
fn table_rows(nx: usize, ny: usize, spacing: f64, hours: usize, values: &[f64]) -> String {
    let mut text = String::new();
    for _ in 0..hours {
        for linear in 0..nx * ny {
            let lon = -47.0 + ((linear % nx) as f64 + 0.5) * spacing;
            let lat = -24.0 + ((linear / nx) as f64 + 0.5) * spacing;
            let columns: Vec<String> = values.iter().map(|value| value.to_string()).collect();
            text.push_str(&format!("{} {} {} {}\n", linear + 1, lon, lat, columns.join(" ")));
        }
    }
    text
}

fn config_yaml(
    emission_file: &Path,
    nx: usize,
    ny: usize,
    end: &str,
    method: &str,
    extra_output: &str,
) -> String {
    format!(
        r#"
Input:
  wrfinput_file: wrfinput_d01
  emission_file: "{}"
Emissions:
  nx: {nx}
  ny: {ny}
  cell_area: 9
  start_date: "2018-06-21 00:00"
  end_date: "{end}"
  header: false
  sep: " "
  col_names: [i, lon, lat, E_CO, E_NO]
Regridding:
  method: {method}
Output:
  output_name: wrfchemi_d01
{extra_output}"#,
        emission_file.display()
    )
}

#[test]
fn nearest_run_copies_uniform_source_onto_finer_target() {
    let temp = TempDir::new().expect("tempdir should be created");
    let table = temp.path().join("local_emiss.txt");
    fs::write(&table, table_rows(2, 2, 0.03, 2, &[10.0, 1.5])).expect("table should be written");

    let config = Configuration::from_yaml_str(&config_yaml(
        &table,
        2,
        2,
        "2018-06-21 01:00",
        "nearest_s2d",
        "",
    ))
    .expect("config should parse");
    let reader = FixedTemplate::new(target_grid(4, 0.015, 1500.0));
    let writer = CapturingWriter::default();

    let summary = run_with(&config, &reader, &writer).expect("run should succeed");
    assert_eq!(summary.frames, 2);
    assert_eq!(summary.method, Some(RegridMethod::NearestS2d));
    assert_eq!(summary.species, vec!["E_CO", "E_NO"]);

    assert_eq!(summary.outputs, vec![PathBuf::from("wrfchemi_d01")]);

    let written = writer.written.borrow();
    assert_eq!(written.len(), 1);
    let (path, dataset) = &written[0];
    assert_eq!(path, Path::new("wrfchemi_d01"));
    let co = dataset.variable("E_CO").expect("E_CO should be written");
    assert_eq!(co.data.dim(), (2, 1, 4, 4));
    assert!(co.data.iter().all(|value| *value == 10.0));
    assert_eq!(dataset.times, vec!["2018-06-21_00:00:00", "2018-06-21_01:00:00"]);
    assert_eq!(
        dataset.global_attributes.get("MAP_PROJ"),
        Some(&AttributeValue::Int(3))
    );

    let co_budget = summary
        .budget
        .iter()
        .find(|row| row.species == "E_CO")
        .expect("E_CO has a molecular mass");
    // 2 h * 4 cells * 10 * 9 km2 * 28 g/mol; 2 h * 16 cells * 10 * 2.25 km2 * 28 g/mol
    assert!((co_budget.source_ktn - 2.016e-5).abs() < 1.0e-12);
    assert!((co_budget.target_ktn - 2.016e-5).abs() < 1.0e-12);
}

#[test]
fn split_12h_run_writes_two_half_day_files() {
    let temp = TempDir::new().expect("tempdir should be created");
    let table = temp.path().join("local_emiss.txt");
    fs::write(&table, table_rows(2, 2, 0.03, 24, &[10.0, 1.5])).expect("table should be written");

    let extra = "  io_style: split_12h\n";
    let yaml = config_yaml(&table, 2, 2, "2018-06-21 23:00", "nearest_s2d", extra)
        .replace("output_name: wrfchemi_d01", "output_name: run");
    let config = Configuration::from_yaml_str(&yaml).expect("config should parse");
    let reader = FixedTemplate::new(target_grid(2, 0.03, 3000.0));
    let writer = CapturingWriter::default();

    let summary = run_with(&config, &reader, &writer).expect("run should succeed");
    assert_eq!(summary.frames, 24);
    assert_eq!(
        summary.outputs,
        vec![
            PathBuf::from("run/wrfchemi_d01_00z"),
            PathBuf::from("run/wrfchemi_d01_12z"),
        ]
    );

    let written = writer.written.borrow();
    assert_eq!(written.len(), 2);
    let (morning_path, morning) = &written[0];
    let (evening_path, evening) = &written[1];
    assert_eq!(morning_path, Path::new("run/wrfchemi_d01_00z"));
    assert_eq!(evening_path, Path::new("run/wrfchemi_d01_12z"));
    assert_eq!(morning.n_times(), 12);
    assert_eq!(evening.n_times(), 12);
    assert_eq!(morning.times[0], "2018-06-21_00:00:00");
    assert_eq!(morning.times[11], "2018-06-21_11:00:00");
    assert_eq!(evening.times[0], "2018-06-21_12:00:00");
    assert_eq!(evening.times[11], "2018-06-21_23:00:00");
    assert_eq!(
        evening.global_attributes.get("START_DATE").and_then(AttributeValue::as_text),
        Some("2018-06-21_12:00:00")
    );
    let co = evening.variable("E_CO").expect("E_CO in the second half");
    assert_eq!(co.data.dim(), (12, 1, 2, 2));
    assert!(co.data.iter().all(|value| *value == 10.0));
}

#[test]
fn dated_run_without_grid_id_writes_nothing() {
    let temp = TempDir::new().expect("tempdir should be created");
    let table = temp.path().join("local_emiss.txt");
    fs::write(&table, table_rows(2, 2, 0.03, 1, &[10.0, 1.5])).expect("table should be written");

    let yaml = config_yaml(&table, 2, 2, "2018-06-21 00:00", "nearest_s2d", "  io_style: dated\n");
    let config = Configuration::from_yaml_str(&yaml).expect("config should parse");
    let lon = Array2::from_shape_fn((2, 2), |(_, c)| -47.0 + 0.015 + c as f64 * 0.03);
    let lat = Array2::from_shape_fn((2, 2), |(r, _)| -24.0 + 0.015 + r as f64 * 0.03);
    let bare = TargetGrid::new(lon, lat, 3000.0, 3000.0).expect("target grid should be valid");
    let writer = CapturingWriter::default();

    let error = run_with(&config, &FixedTemplate::new(bare), &writer).expect_err("no GRID_ID");
    assert_eq!(error.placeholder(), "IO.TEMPLATE_FIELD");
    assert_eq!(error.exit_code(), 7);
    assert!(writer.written.borrow().is_empty());
}

#[test]
fn missing_hour_fails_before_template_or_output() {
    let temp = TempDir::new().expect("tempdir should be created");
    let table = temp.path().join("local_emiss.csv");
    fs::write(
        &table,
        "i,lon,lat,date,E_CO\n\
         1,-46.5,-23.5,2018-06-21 00:00,1\n\
         1,-46.5,-23.5,2018-06-21 02:00,1\n",
    )
    .expect("table should be written");

    let yaml = config_yaml(&table, 1, 1, "2018-06-21 02:00", "nearest_s2d", "")
        .replace("  header: false\n", "  header: true\n  time_column: date\n")
        .replace("  sep: \" \"\n", "  sep: \",\"\n");
    let config = Configuration::from_yaml_str(&yaml).expect("config should parse");
    let reader = FixedTemplate::new(target_grid(2, 1.0, 1000.0));
    let writer = CapturingWriter::default();

    let error = run_with(&config, &reader, &writer).expect_err("01:00 is missing");
    assert_eq!(error.category(), AasErrorCategory::TimeRangeError);
    assert_eq!(error.exit_code(), 5);
    assert_eq!(reader.reads.get(), 0);
    assert!(writer.written.borrow().is_empty());
}

#[test]
fn conservative_run_zero_fills_required_species() {
    let temp = TempDir::new().expect("tempdir should be created");
    let table = temp.path().join("local_emiss.txt");
    fs::write(&table, table_rows(3, 3, 0.1, 1, &[4.0, 2.0])).expect("table should be written");

    let config = Configuration::from_yaml_str(&config_yaml(
        &table,
        3,
        3,
        "2018-06-21 00:00",
        "conservative",
        "  required_species: [E_NO, E_SO2]\n",
    ))
    .expect("config should parse");
    let reader = FixedTemplate::new(target_grid(2, 0.15, 15_000.0));
    let writer = CapturingWriter::default();

    let summary = run_with(&config, &reader, &writer).expect("run should succeed");
    assert_eq!(summary.species, vec!["E_NO", "E_SO2", "E_CO"]);
    assert_eq!(summary.zero_filled, vec!["E_SO2"]);

    let written = writer.written.borrow();
    let dataset = &written[0].1;
    let names: Vec<_> = dataset.variables.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["E_NO", "E_SO2", "E_CO"]);
    assert!(dataset.variable("E_SO2").expect("zero field").data.iter().all(|v| *v == 0.0));
    let co = dataset.variable("E_CO").expect("E_CO regridded");
    assert!(co.data.iter().all(|value| (value - 4.0).abs() < 1.0e-4));
}

#[test]
fn out_of_sequence_cell_indices_are_a_grid_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let table = temp.path().join("local_emiss.txt");
    fs::write(&table, "2 -46.95 -23.95 1 1\n1 -46.85 -23.95 1 1\n")
        .expect("table should be written");

    let yaml = config_yaml(&table, 2, 1, "2018-06-21 00:00", "nearest_s2d", "");
    let config = Configuration::from_yaml_str(&yaml).expect("config should parse");
    let reader = FixedTemplate::new(target_grid(2, 0.1, 1000.0));
    let error = run_with(&config, &reader, &CapturingWriter::default())
        .expect_err("cell 2 precedes cell 1");
    assert_eq!(error.category(), AasErrorCategory::GridConsistencyError);
    assert_eq!(error.placeholder(), "GRID.INDEX_SEQUENCE");
    assert_eq!(reader.reads.get(), 0);
}

#[test]
fn source_grid_round_trip_reproduces_index_sequence() {
    let (nx, ny) = (5, 4);
    for order in [RasterOrder::RowMajor, RasterOrder::ColumnMajor] {
        let cells: Vec<_> = (0..nx * ny)
            .map(|linear| SourceCell {
                index: linear + 1,
                lon: linear as f64,
                lat: 0.0,
            })
            .collect();
        let grid = SourceGrid::build(&cells, nx, ny, order, 1.0).expect("grid should build");
        assert_eq!(grid.flatten_indices(), (1..=nx * ny).collect::<Vec<_>>());
    }
}

#[test]
fn zero_file_uses_default_species_and_validates_range() {
    let start = parse_timestamp("2014-10-06 00:00").expect("timestamp");
    let end = parse_timestamp("2014-10-06 23:00").expect("timestamp");
    let reader = FixedTemplate::new(target_grid(3, 0.1, 3000.0));
    let writer = CapturingWriter::default();
    let request = ZeroFileRequest {
        template_path: PathBuf::from("wrfinput_d01"),
        output_path: PathBuf::from("wrfchemi_d01_zero.nc"),
        start,
        end,
        species: Vec::new(),
    };

    let summary = write_zero_file_with(&request, &reader, &writer).expect("zero file");
    assert_eq!(summary.frames, 24);
    assert_eq!(summary.species.len(), 36);
    assert_eq!(summary.method, None);
    let written = writer.written.borrow();
    let dataset = &written[0].1;
    assert_eq!(dataset.variables[0].name, "E_CO");
    assert_eq!(dataset.variables[35].name, "E_ECC");
    assert_eq!(dataset.variables[0].data.dim(), (24, 1, 3, 3));

    let reversed = ZeroFileRequest {
        start: end,
        end: start,
        ..request
    };
    let error = write_zero_file_with(&reversed, &reader, &writer).expect_err("reversed range");
    assert_eq!(error.category(), AasErrorCategory::ConfigError);
    assert_eq!(reader.reads.get(), 1);
}
