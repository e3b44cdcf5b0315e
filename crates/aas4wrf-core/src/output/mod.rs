//! In-memory `wrfchemi` dataset and its assembler.

use crate::common::constants::{EMISSION_FIELD_TYPE, OUTPUT_TITLE, WRF_DATE_FORMAT};
use crate::domain::{AasError, AasResult, FluxConvention};
use crate::grid::TargetGrid;
use chrono::NaiveDateTime;
use ndarray::{Array2, Array4, ArrayView2, s};
use std::fmt::{Display, Formatter};
use std::ops::Range;

mod files;

pub use files::{OutputFile, plan_output_files};

/// Typed attribute value shared by template metadata and the written dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Int(i32),
    Ints(Vec<i32>),
    Float(f32),
    Floats(Vec<f32>),
    Double(f64),
    Doubles(Vec<f64>),
}

impl AttributeValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(f64::from(*value)),
            Self::Float(value) => Some(f64::from(*value)),
            Self::Double(value) => Some(*value),
            Self::Ints(values) if values.len() == 1 => Some(f64::from(values[0])),
            Self::Floats(values) if values.len() == 1 => Some(f64::from(values[0])),
            Self::Doubles(values) if values.len() == 1 => Some(values[0]),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for AttributeValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value}"),
            Self::Ints(values) => write!(f, "{values:?}"),
            Self::Floats(values) => write!(f, "{values:?}"),
            Self::Doubles(values) => write!(f, "{values:?}"),
        }
    }
}

/// Ordered attribute list; names are unique and a later insert replaces the
/// earlier value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: Vec<(String, AttributeValue)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for (name, value) in iter {
            attributes.insert(name, value);
        }
        attributes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmissionVariable {
    pub name: String,
    /// Shape (Time, emissions_zdim = 1, south_north, west_east).
    pub data: Array4<f32>,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmissionsDataset {
    pub times: Vec<String>,
    pub xlat: Array2<f32>,
    pub xlong: Array2<f32>,
    pub variables: Vec<EmissionVariable>,
    pub global_attributes: Attributes,
}

impl EmissionsDataset {
    pub fn variable(&self, name: &str) -> Option<&EmissionVariable> {
        self.variables.iter().find(|variable| variable.name == name)
    }

    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    /// (south_north, west_east)
    pub fn grid_shape(&self) -> (usize, usize) {
        self.xlat.dim()
    }

    /// Copy holding only the time levels in `frames`, with START_DATE moved
    /// to the first of them.
    pub fn select_frames(&self, frames: Range<usize>) -> AasResult<EmissionsDataset> {
        if frames.is_empty() || frames.end > self.n_times() {
            return Err(AasError::internal(
                "SYS.FRAME_SLOT",
                format!(
                    "frames {}..{} are outside the {} output times",
                    frames.start,
                    frames.end,
                    self.n_times()
                ),
            ));
        }

        let mut global_attributes = self.global_attributes.clone();
        global_attributes.insert("START_DATE", self.times[frames.start].clone());
        Ok(EmissionsDataset {
            times: self.times[frames.clone()].to_vec(),
            xlat: self.xlat.clone(),
            xlong: self.xlong.clone(),
            variables: self
                .variables
                .iter()
                .map(|variable| EmissionVariable {
                    name: variable.name.clone(),
                    data: variable.data.slice(s![frames.clone(), .., .., ..]).to_owned(),
                    attributes: variable.attributes.clone(),
                })
                .collect(),
            global_attributes,
        })
    }
}

/// Builds the dataset one (species, frame) slice at a time.
pub struct DatasetAssembler<'a> {
    target: &'a TargetGrid,
    times: Vec<NaiveDateTime>,
    units: &'static str,
    variables: Vec<EmissionVariable>,
}

impl<'a> DatasetAssembler<'a> {
    pub fn new(
        target: &'a TargetGrid,
        times: &[NaiveDateTime],
        convention: FluxConvention,
    ) -> Self {
        Self {
            target,
            times: times.to_vec(),
            units: convention.units(),
            variables: Vec::new(),
        }
    }

    /// Adds an all-zero variable and returns its position.
    pub fn add_species(&mut self, name: &str) -> AasResult<usize> {
        if self.variables.iter().any(|variable| variable.name == name) {
            return Err(AasError::internal(
                "SYS.DUPLICATE_SPECIES",
                format!("species '{}' was added to the dataset twice", name),
            ));
        }

        let (ny, nx) = self.target.shape();
        self.variables.push(EmissionVariable {
            name: name.to_string(),
            data: Array4::zeros((self.times.len(), 1, ny, nx)),
            attributes: variable_attributes(self.units),
        });
        Ok(self.variables.len() - 1)
    }

    pub fn put_frame(
        &mut self,
        species: usize,
        frame: usize,
        field: ArrayView2<'_, f64>,
    ) -> AasResult<()> {
        let expected = self.target.shape();
        if field.dim() != expected {
            return Err(AasError::internal(
                "SYS.FRAME_SHAPE",
                format!(
                    "regridded field has shape {:?}, target grid is {:?}",
                    field.dim(),
                    expected
                ),
            ));
        }
        let n_times = self.times.len();
        let variable = self.variables.get_mut(species).ok_or_else(|| {
            AasError::internal(
                "SYS.SPECIES_SLOT",
                format!("no dataset variable at slot {}", species),
            )
        })?;
        if frame >= n_times {
            return Err(AasError::internal(
                "SYS.FRAME_SLOT",
                format!("frame {} is outside the {} output times", frame, n_times),
            ));
        }

        variable
            .data
            .slice_mut(s![frame, 0, .., ..])
            .zip_mut_with(&field, |slot, value| *slot = *value as f32);
        Ok(())
    }

    pub fn finish(self) -> EmissionsDataset {
        let species_list = self
            .variables
            .iter()
            .map(|variable| variable.name.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let mut global_attributes = self.target.global_attributes().clone();
        global_attributes.insert("TITLE", OUTPUT_TITLE);
        if let Some(first) = self.times.first() {
            global_attributes.insert("START_DATE", first.format(WRF_DATE_FORMAT).to_string());
        }
        if let Some(grid_id) = self.target.grid_id() {
            global_attributes.insert("GRID_ID", grid_id);
        }
        global_attributes.insert("EMISSION_SPECIES", species_list);

        EmissionsDataset {
            times: self
                .times
                .iter()
                .map(|time| time.format(WRF_DATE_FORMAT).to_string())
                .collect(),
            xlat: self.target.lat().mapv(|value| value as f32),
            xlong: self.target.lon().mapv(|value| value as f32),
            variables: self.variables,
            global_attributes,
        }
    }
}

fn variable_attributes(units: &str) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("FieldType", EMISSION_FIELD_TYPE);
    attributes.insert("MemoryOrder", "XYZ");
    attributes.insert("description", "EMISSIONS");
    attributes.insert("units", units);
    attributes.insert("stagger", "");
    attributes.insert("coordinates", "XLONG XLAT");
    attributes
}

/// All-zero dataset for the given species on the template grid.
pub fn zero_dataset(
    target: &TargetGrid,
    times: &[NaiveDateTime],
    species: &[String],
    convention: FluxConvention,
) -> AasResult<EmissionsDataset> {
    let mut assembler = DatasetAssembler::new(target, times, convention);
    for name in species {
        assembler.add_species(name)?;
    }
    Ok(assembler.finish())
}
