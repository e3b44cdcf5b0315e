//! Template grid reading and dataset writing.
//!
//! The pipeline only sees the [`GridTemplateReader`] and [`DatasetWriter`]
//! traits. The NetCDF implementations need the default `netcdf` cargo
//! feature; built without it they fail with an I/O error.

#[cfg(feature = "netcdf")]
mod wrf_netcdf;

use crate::domain::{AasError, AasResult};
use crate::grid::TargetGrid;
use crate::output::EmissionsDataset;
use std::path::Path;
use tempfile::Builder;
use tracing::info;

pub trait GridTemplateReader {
    fn read_template(&self, path: &Path) -> AasResult<TargetGrid>;
}

pub trait DatasetWriter {
    fn write_dataset(&self, dataset: &EmissionsDataset, path: &Path) -> AasResult<()>;
}

/// Reads `XLAT`, `XLONG`, the optional staggered `XLONG_U`/`XLAT_V`, and the
/// global attributes of a WRF `wrfinput` file.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfTemplateReader;

impl GridTemplateReader for NetcdfTemplateReader {
    fn read_template(&self, path: &Path) -> AasResult<TargetGrid> {
        let grid = read_netcdf_template(path)?;
        info!(
            path = %path.display(),
            south_north = grid.shape().0,
            west_east = grid.shape().1,
            staggered = grid.has_staggered_bounds(),
            "read template grid"
        );
        Ok(grid)
    }
}

/// Writes a `wrfchemi` NetCDF file through [`write_atomically`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfDatasetWriter;

impl DatasetWriter for NetcdfDatasetWriter {
    fn write_dataset(&self, dataset: &EmissionsDataset, path: &Path) -> AasResult<()> {
        write_atomically(path, |staging| write_netcdf_dataset(dataset, staging))?;
        info!(
            path = %path.display(),
            variables = dataset.variables.len(),
            times = dataset.n_times(),
            "wrote emissions file"
        );
        Ok(())
    }
}

#[cfg(feature = "netcdf")]
fn read_netcdf_template(path: &Path) -> AasResult<TargetGrid> {
    wrf_netcdf::read_template(path)
}

#[cfg(not(feature = "netcdf"))]
fn read_netcdf_template(path: &Path) -> AasResult<TargetGrid> {
    Err(netcdf_disabled(path))
}

#[cfg(feature = "netcdf")]
fn write_netcdf_dataset(dataset: &EmissionsDataset, path: &Path) -> AasResult<()> {
    wrf_netcdf::write_dataset(dataset, path)
}

#[cfg(not(feature = "netcdf"))]
fn write_netcdf_dataset(_dataset: &EmissionsDataset, path: &Path) -> AasResult<()> {
    Err(netcdf_disabled(path))
}

#[cfg(not(feature = "netcdf"))]
fn netcdf_disabled(path: &Path) -> AasError {
    AasError::io(
        "IO.NETCDF_DISABLED",
        format!(
            "cannot access '{}': NetCDF support is not compiled in; \
             rebuild with `--features netcdf`",
            path.display()
        ),
    )
}

/// Runs `write` against a staging file next to `path` and renames it into
/// place on success. On failure the staging file is removed and `path` is
/// left untouched.
pub fn write_atomically<F>(path: &Path, write: F) -> AasResult<()>
where
    F: FnOnce(&Path) -> AasResult<()>,
{
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staging = Builder::new()
        .prefix(".aas4wrf-")
        .suffix(".tmp")
        .tempfile_in(directory)
        .map_err(|source| {
            AasError::io(
                "IO.STAGING_CREATE",
                format!(
                    "failed to create a staging file in '{}': {}",
                    directory.display(),
                    source
                ),
            )
        })?;

    write(staging.path())?;

    staging.persist(path).map_err(|source| {
        AasError::io(
            "IO.OUTPUT_RENAME",
            format!("failed to move output into '{}': {}", path.display(), source.error),
        )
    })?;
    Ok(())
}
