use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_cli(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_aas4wrf"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .output()
        .expect("aas4wrf should start")
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent dir should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn write_config(temp: &TempDir, start: &str, end: &str, table: &str) -> PathBuf {
    let table_path = temp.path().join("local_emiss.csv");
    write_file(&table_path, table);
    let config_path = temp.path().join("aas4wrf.yml");
    write_file(
        &config_path,
        &format!(
            r#"Input:
  wrfinput_file: "{template}"
  emission_file: "{table}"
Emissions:
  nx: 1
  ny: 1
  cell_area: 1
  start_date: "{start}"
  end_date: "{end}"
  header: true
  time_column: date
Regridding:
  method: nearest_s2d
Output:
  output_name: "{output}"
"#,
            template = temp.path().join("wrfinput_d01").display(),
            table = table_path.display(),
            output = temp.path().join("wrfchemi_d01").display(),
        ),
    );
    config_path
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn help_exits_successfully() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = run_cli(&["--help"], temp.path());

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("zeros"), "help should list the zeros command: {stdout}");
}

#[test]
fn missing_configuration_argument_is_a_usage_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = run_cli(&[], temp.path());

    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("ERROR: [CONFIG.CLI_USAGE]"));
}

#[test]
fn unreadable_configuration_is_an_io_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = run_cli(&["does-not-exist.yml"], temp.path());

    assert_eq!(output.status.code(), Some(7), "stderr: {}", stderr(&output));
    let stderr = stderr(&output);
    assert!(stderr.contains("ERROR: [IO.CONFIG_READ]"), "stderr: {stderr}");
    assert!(stderr.contains("FATAL EXIT CODE: 7 (IOError)"), "stderr: {stderr}");
}

#[test]
fn missing_configuration_key_exits_with_config_code() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = temp.path().join("broken.yml");
    write_file(&config, "Input:\n  wrfinput_file: wrfinput_d01\n");

    let output = run_cli(&[config.to_str().expect("utf-8 path")], temp.path());

    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("ERROR: [CONFIG.PARSE]"));
}

#[test]
fn reversed_time_range_fails_before_reading_inputs() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = write_config(
        &temp,
        "2018-06-21 05:00",
        "2018-06-21 00:00",
        "i,lon,lat,date,E_CO\n1,-46.5,-23.5,2018-06-21 00:00,1\n",
    );

    let output = run_cli(&[config.to_str().expect("utf-8 path")], temp.path());

    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("ERROR: [CONFIG.TIME_ORDER]"));
    assert!(!temp.path().join("wrfchemi_d01").exists());
}

#[test]
fn missing_hour_exits_with_time_range_code_and_writes_nothing() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = write_config(
        &temp,
        "2018-06-21 00:00",
        "2018-06-21 02:00",
        "i,lon,lat,date,E_CO\n\
         1,-46.5,-23.5,2018-06-21 00:00,1\n\
         1,-46.5,-23.5,2018-06-21 02:00,1\n",
    );
    let summary = temp.path().join("reports/summary.json");

    let output = run_cli(
        &[
            config.to_str().expect("utf-8 path"),
            "--summary",
            summary.to_str().expect("utf-8 path"),
        ],
        temp.path(),
    );

    assert_eq!(output.status.code(), Some(5), "stderr: {}", stderr(&output));
    let stderr = stderr(&output);
    assert!(stderr.contains("temporal alignment failed"), "stderr: {stderr}");
    assert!(stderr.contains("FATAL EXIT CODE: 5 (TimeRangeError)"), "stderr: {stderr}");
    assert!(!temp.path().join("wrfchemi_d01").exists());
    assert!(!summary.exists());
}

#[test]
fn zeros_rejects_malformed_start_as_usage_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = run_cli(
        &[
            "zeros",
            "--template",
            "wrfinput_d01",
            "--start",
            "yesterday",
            "--end",
            "2014-10-06 23:00",
        ],
        temp.path(),
    );

    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("yesterday"));
}

#[test]
fn zeros_with_reversed_range_reports_config_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = run_cli(
        &[
            "zeros",
            "--template",
            "wrfinput_d01",
            "--start",
            "2014-10-06 23:00",
            "--end",
            "2014-10-06 00:00",
        ],
        temp.path(),
    );

    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
    let stderr = stderr(&output);
    assert!(stderr.contains("ERROR: [CONFIG.TIME_ORDER]"), "stderr: {stderr}");
    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .expect("temp dir should be readable")
        .collect();
    assert!(leftovers.is_empty());
}

#[cfg(feature = "netcdf")]
#[test]
fn missing_template_reports_io_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = write_config(
        &temp,
        "2018-06-21 00:00",
        "2018-06-21 00:00",
        "i,lon,lat,date,E_CO\n1,-46.5,-23.5,2018-06-21 00:00,1\n",
    );

    let output = run_cli(&[config.to_str().expect("utf-8 path")], temp.path());

    assert_eq!(output.status.code(), Some(7), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("ERROR: [IO.TEMPLATE_OPEN]"));
}

#[cfg(not(feature = "netcdf"))]
#[test]
fn run_without_netcdf_support_is_an_io_error_with_summary_untouched() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = write_config(
        &temp,
        "2018-06-21 00:00",
        "2018-06-21 00:00",
        "i,lon,lat,date,E_CO\n1,-46.5,-23.5,2018-06-21 00:00,1\n",
    );
    let summary = temp.path().join("summary.json");

    let output = run_cli(
        &[
            config.to_str().expect("utf-8 path"),
            "--summary",
            summary.to_str().expect("utf-8 path"),
        ],
        temp.path(),
    );

    assert_eq!(output.status.code(), Some(7), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("ERROR: [IO.NETCDF_DISABLED]"));
    assert!(!summary.exists());
}
