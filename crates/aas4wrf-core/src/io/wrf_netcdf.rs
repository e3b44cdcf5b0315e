use crate::common::constants::{
    DIM_DATE_STRLEN, DIM_SOUTH_NORTH, DIM_TIME, DIM_WEST_EAST, DIM_ZDIM, WRF_DATE_STRLEN,
};
use crate::domain::{AasError, AasResult};
use crate::grid::TargetGrid;
use crate::output::{AttributeValue, Attributes, EmissionsDataset};
use ndarray::Array2;
use netcdf::types::NcVariableType;
use netcdf::{AttributeValue as NcAttributeValue, NcTypeDescriptor};
use std::path::Path;
use tracing::debug;

/// NetCDF `char` element, used for the `Times` variable.
#[repr(transparent)]
#[derive(Debug, Clone, Copy)]
struct NcChar(u8);

unsafe impl NcTypeDescriptor for NcChar {
    fn type_descriptor() -> NcVariableType {
        NcVariableType::Char
    }
}

fn nc_error(
    placeholder: &'static str,
    path: &Path,
    what: &str,
) -> impl FnOnce(netcdf::Error) -> AasError + use<> {
    let context = format!("{} '{}'", what, path.display());
    move |source| AasError::io(placeholder, format!("{}: {}", context, source))
}

pub(super) fn read_template(path: &Path) -> AasResult<TargetGrid> {
    let file = netcdf::open(path)
        .map_err(nc_error("IO.TEMPLATE_OPEN", path, "failed to open template"))?;

    let lat = read_first_frame(&file, path, "XLAT")?.ok_or_else(|| missing(path, "XLAT"))?;
    let lon = read_first_frame(&file, path, "XLONG")?.ok_or_else(|| missing(path, "XLONG"))?;
    let attributes = read_global_attributes(&file);

    let spacing = |name: &str| {
        attributes
            .get(name)
            .and_then(AttributeValue::as_f64)
            .ok_or_else(|| missing(path, name))
    };
    let (dx, dy) = (spacing("DX")?, spacing("DY")?);

    let mut grid = TargetGrid::new(lon, lat, dx, dy)?;
    if let (Some(lon_u), Some(lat_v)) = (
        read_first_frame(&file, path, "XLONG_U")?,
        read_first_frame(&file, path, "XLAT_V")?,
    ) {
        grid = grid.with_staggered(lon_u, lat_v)?;
    }
    Ok(grid.with_global_attributes(attributes))
}

fn missing(path: &Path, name: &str) -> AasError {
    AasError::io(
        "IO.TEMPLATE_FIELD",
        format!("template '{}' has no '{}'", path.display(), name),
    )
}

/// First time level of a (Time, y, x) or (y, x) variable.
fn read_first_frame(
    file: &netcdf::File,
    path: &Path,
    name: &str,
) -> AasResult<Option<Array2<f64>>> {
    let Some(variable) = file.variable(name) else {
        return Ok(None);
    };
    let dims: Vec<usize> = variable.dimensions().iter().map(|dim| dim.len()).collect();
    let read_error = nc_error("IO.TEMPLATE_READ", path, &format!("failed to read {}", name));
    let (values, ny, nx): (Vec<f64>, usize, usize) = match dims.as_slice() {
        [_, ny, nx] => (variable.get_values((0, .., ..)).map_err(read_error)?, *ny, *nx),
        [ny, nx] => (variable.get_values(..).map_err(read_error)?, *ny, *nx),
        other => {
            return Err(AasError::io(
                "IO.TEMPLATE_FIELD",
                format!("'{}' in '{}' has unexpected shape {:?}", name, path.display(), other),
            ));
        }
    };

    Array2::from_shape_vec((ny, nx), values).map(Some).map_err(|source| {
        AasError::io(
            "IO.TEMPLATE_FIELD",
            format!(
                "'{}' in '{}' cannot be shaped to {}x{}: {}",
                name,
                path.display(),
                ny,
                nx,
                source
            ),
        )
    })
}

fn read_global_attributes(file: &netcdf::File) -> Attributes {
    let mut attributes = Attributes::new();
    for attribute in file.attributes() {
        let name = attribute.name().to_string();
        match attribute.value().ok().and_then(from_netcdf) {
            Some(value) => attributes.insert(name, value),
            None => debug!(attribute = %name, "skipping unsupported global attribute type"),
        }
    }
    attributes
}

fn from_netcdf(value: NcAttributeValue) -> Option<AttributeValue> {
    Some(match value {
        NcAttributeValue::Str(text) => AttributeValue::Text(text),
        NcAttributeValue::Int(value) => AttributeValue::Int(value),
        NcAttributeValue::Ints(values) => AttributeValue::Ints(values),
        NcAttributeValue::Short(value) => AttributeValue::Int(i32::from(value)),
        NcAttributeValue::Shorts(values) => {
            AttributeValue::Ints(values.into_iter().map(i32::from).collect())
        }
        NcAttributeValue::Float(value) => AttributeValue::Float(value),
        NcAttributeValue::Floats(values) => AttributeValue::Floats(values),
        NcAttributeValue::Double(value) => AttributeValue::Double(value),
        NcAttributeValue::Doubles(values) => AttributeValue::Doubles(values),
        _ => return None,
    })
}

fn to_netcdf(value: &AttributeValue) -> NcAttributeValue {
    match value {
        AttributeValue::Text(text) => NcAttributeValue::Str(text.clone()),
        AttributeValue::Int(value) => NcAttributeValue::Int(*value),
        AttributeValue::Ints(values) => NcAttributeValue::Ints(values.clone()),
        AttributeValue::Float(value) => NcAttributeValue::Float(*value),
        AttributeValue::Floats(values) => NcAttributeValue::Floats(values.clone()),
        AttributeValue::Double(value) => NcAttributeValue::Double(*value),
        AttributeValue::Doubles(values) => NcAttributeValue::Doubles(values.clone()),
    }
}

/// Writes `dataset` as a NetCDF-3 64-bit offset file, the format WRF reads
/// `wrfchemi` inputs in.
pub(super) fn write_dataset(dataset: &EmissionsDataset, path: &Path) -> AasResult<()> {
    let write_error = |what: &str| nc_error("IO.OUTPUT_WRITE", path, what);
    let mut file = netcdf::create_with(path, netcdf::Options::_64BIT_OFFSET)
        .map_err(write_error("failed to create"))?;

    let n_times = dataset.n_times();
    let (ny, nx) = dataset.grid_shape();
    file.add_unlimited_dimension(DIM_TIME)
        .map_err(write_error("failed to define dimensions in"))?;
    for (name, len) in [
        (DIM_DATE_STRLEN, WRF_DATE_STRLEN),
        (DIM_ZDIM, 1),
        (DIM_SOUTH_NORTH, ny),
        (DIM_WEST_EAST, nx),
    ] {
        file.add_dimension(name, len)
            .map_err(write_error("failed to define dimensions in"))?;
    }

    {
        let chars: Vec<NcChar> = dataset
            .times
            .iter()
            .flat_map(|time| {
                let mut bytes = time.as_bytes().to_vec();
                bytes.resize(WRF_DATE_STRLEN, b' ');
                bytes
            })
            .map(NcChar)
            .collect();
        let mut times = file
            .add_variable::<NcChar>("Times", &[DIM_TIME, DIM_DATE_STRLEN])
            .map_err(write_error("failed to define Times in"))?;
        times
            .put_values(&chars, (0..n_times, ..))
            .map_err(write_error("failed to write Times to"))?;
    }

    for (name, description, field) in [
        ("XLAT", "LATITUDE, SOUTH IS NEGATIVE", &dataset.xlat),
        ("XLONG", "LONGITUDE, WEST IS NEGATIVE", &dataset.xlong),
    ] {
        let frame: Vec<f32> = field.iter().copied().collect();
        let repeated: Vec<f32> = (0..n_times).flat_map(|_| frame.iter().copied()).collect();
        let mut variable = file
            .add_variable::<f32>(name, &[DIM_TIME, DIM_SOUTH_NORTH, DIM_WEST_EAST])
            .map_err(write_error("failed to define coordinates in"))?;
        let units = if name == "XLAT" { "degree_north" } else { "degree_east" };
        let annotations = [
            ("MemoryOrder", "XY "),
            ("description", description),
            ("units", units),
        ];
        for (attribute, value) in annotations {
            variable
                .put_attribute(attribute, value)
                .map_err(write_error("failed to annotate coordinates in"))?;
        }
        variable
            .put_values(&repeated, (0..n_times, .., ..))
            .map_err(write_error("failed to write coordinates to"))?;
    }

    for emission in &dataset.variables {
        let dims = [DIM_TIME, DIM_ZDIM, DIM_SOUTH_NORTH, DIM_WEST_EAST];
        let mut variable = file
            .add_variable::<f32>(&emission.name, &dims)
            .map_err(write_error("failed to define species in"))?;
        for (name, value) in emission.attributes.iter() {
            variable
                .put_attribute(name, to_netcdf(value))
                .map_err(write_error("failed to annotate species in"))?;
        }
        let values: Vec<f32> = emission.data.iter().copied().collect();
        variable
            .put_values(&values, (0..n_times, .., .., ..))
            .map_err(write_error("failed to write species to"))?;
        debug!(species = %emission.name, "wrote species variable");
    }

    for (name, value) in dataset.global_attributes.iter() {
        file.add_attribute(name, to_netcdf(value))
            .map_err(write_error("failed to write global attributes to"))?;
    }
    Ok(())
}
