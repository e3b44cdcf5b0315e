//! Shared constants for grid geometry, timestamps and the `wrfchemi` layout.

pub const EARTH_RADIUS_KM: f64 = 6_371.0;
pub const DEG2RAD: f64 = std::f64::consts::PI / 180.0;

/// Configuration and table timestamp format.
pub const CONFIG_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const CONFIG_DATE_FORMAT_SECONDS: &str = "%Y-%m-%d %H:%M:%S";
/// WRF `Times` / `START_DATE` format.
pub const WRF_DATE_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";
pub const WRF_DATE_STRLEN: usize = 19;

pub const OUTPUT_TITLE: &str = "OUTPUT FROM AAS4WRF PREPROCESSOR";
pub const EMISSION_FIELD_TYPE: i32 = 104;

pub const DIM_TIME: &str = "Time";
pub const DIM_ZDIM: &str = "emissions_zdim";
pub const DIM_SOUTH_NORTH: &str = "south_north";
pub const DIM_WEST_EAST: &str = "west_east";
pub const DIM_DATE_STRLEN: &str = "DateStrLen";

/// Default molecular masses (g/mol) used by the mass budget.
pub const DEFAULT_MOLECULAR_MASSES: [(&str, f64); 3] =
    [("E_CO", 28.0), ("E_NO", 30.0), ("E_NO2", 46.0)];

/// RADM2 / MADE-SORGAM emitted species, in `wrfchemi` order.
pub const RADM2_SORGAM_SPECIES: [&str; 36] = [
    "E_CO", "E_HCHO", "E_C2H5OH", "E_KET", "E_NH3", "E_XYL", "E_TOL", "E_ISO", "E_OLI",
    "E_OLT", "E_OL2", "E_HC8", "E_HC5", "E_ORA2", "E_ETH", "E_ALD", "E_CSL", "E_SO2", "E_HC3",
    "E_NO2", "E_NO", "E_CH3OH", "E_PM25I", "E_PM25J", "E_SO4I", "E_SO4J", "E_NO3I", "E_NO3J",
    "E_ORGI", "E_ORGJ", "E_ECI", "E_ECJ", "E_SO4C", "E_NO3C", "E_ORGC", "E_ECC",
];
