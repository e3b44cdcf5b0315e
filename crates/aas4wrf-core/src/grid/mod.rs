//! Source and target grid geometry.

use crate::common::geometry::{LonLatRect, cell_bounds};
use crate::domain::{AasError, AasResult, RasterOrder};
use crate::emissions::SourceCell;
use crate::output::{AttributeValue, Attributes};
use ndarray::{Array2, ArrayView1, ArrayView2};
use tracing::debug;

/// Local inventory grid, shape (ny, nx).
#[derive(Debug, Clone, PartialEq)]
pub struct SourceGrid {
    order: RasterOrder,
    index: Array2<usize>,
    lon: Array2<f64>,
    lat: Array2<f64>,
    cell_area_km2: f64,
}

impl SourceGrid {
    /// Reshapes the first sweep of the table into (ny, nx) arrays.
    pub fn build(
        cells: &[SourceCell],
        nx: usize,
        ny: usize,
        order: RasterOrder,
        cell_area_km2: f64,
    ) -> AasResult<Self> {
        let n_cells = nx * ny;
        if cells.len() != n_cells {
            return Err(AasError::grid_consistency(
                "GRID.CELL_COUNT",
                format!(
                    "table sweep has {} cells but nx*ny = {}x{} = {}",
                    cells.len(),
                    nx,
                    ny,
                    n_cells
                ),
            ));
        }

        let mut index = Array2::zeros((ny, nx));
        let mut lon = Array2::zeros((ny, nx));
        let mut lat = Array2::zeros((ny, nx));
        for (linear, cell) in cells.iter().enumerate() {
            let position = order.position(linear, nx, ny);
            index[position] = cell.index;
            lon[position] = cell.lon;
            lat[position] = cell.lat;
        }

        let grid = Self {
            order,
            index,
            lon,
            lat,
            cell_area_km2,
        };
        if let Some((expected, found)) = grid
            .flatten_indices()
            .into_iter()
            .enumerate()
            .map(|(linear, found)| (linear + 1, found))
            .find(|(expected, found)| expected != found)
        {
            return Err(AasError::grid_consistency(
                "GRID.INDEX_SEQUENCE",
                format!(
                    "cell indices do not follow {} order: expected {} but found {}",
                    order, expected, found
                ),
            ));
        }

        debug!(nx, ny, order = %order, "built source grid");
        Ok(grid)
    }

    /// (ny, nx)
    pub fn shape(&self) -> (usize, usize) {
        self.lon.dim()
    }

    pub fn n_cells(&self) -> usize {
        self.lon.len()
    }

    pub fn order(&self) -> RasterOrder {
        self.order
    }

    pub fn index(&self) -> ArrayView2<'_, usize> {
        self.index.view()
    }

    pub fn lon(&self) -> ArrayView2<'_, f64> {
        self.lon.view()
    }

    pub fn lat(&self) -> ArrayView2<'_, f64> {
        self.lat.view()
    }

    pub fn cell_area_km2(&self) -> f64 {
        self.cell_area_km2
    }

    /// Grid positions in raster order.
    pub fn raster_positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let (ny, nx) = self.shape();
        (0..nx * ny).map(move |linear| self.order.position(linear, nx, ny))
    }

    /// Index array read back in raster order.
    pub fn flatten_indices(&self) -> Vec<usize> {
        self.raster_positions()
            .map(|position| self.index[position])
            .collect()
    }

    /// Places one frame of table values (table row order) onto the grid.
    pub fn to_field(&self, values: ArrayView1<'_, f64>) -> AasResult<Array2<f64>> {
        if values.len() != self.n_cells() {
            return Err(AasError::internal(
                "SYS.FIELD_LENGTH",
                format!(
                    "frame has {} values for {} source cells",
                    values.len(),
                    self.n_cells()
                ),
            ));
        }
        let mut field = Array2::zeros(self.shape());
        for (position, value) in self.raster_positions().zip(values.iter()) {
            field[position] = *value;
        }
        Ok(field)
    }

    /// Cell rectangles from centre midpoints, row-major over (ny, nx).
    pub fn cell_rects(&self) -> Option<Vec<LonLatRect>> {
        rects_from_centres(self.lon.view(), self.lat.view())
    }
}

/// Model grid read from the template file, shape (south_north, west_east).
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGrid {
    lon: Array2<f64>,
    lat: Array2<f64>,
    cell_area_km2: f64,
    /// XLONG_U, shape (south_north, west_east + 1).
    lon_u: Option<Array2<f64>>,
    /// XLAT_V, shape (south_north + 1, west_east).
    lat_v: Option<Array2<f64>>,
    global_attributes: Attributes,
}

impl TargetGrid {
    /// `dx_m`/`dy_m` are the template grid spacings in metres.
    pub fn new(lon: Array2<f64>, lat: Array2<f64>, dx_m: f64, dy_m: f64) -> AasResult<Self> {
        if lon.dim() != lat.dim() || lon.is_empty() {
            return Err(AasError::grid_consistency(
                "GRID.TARGET_SHAPE",
                format!(
                    "XLONG {:?} and XLAT {:?} must be non-empty and equally shaped",
                    lon.dim(),
                    lat.dim()
                ),
            ));
        }
        if !(dx_m.is_finite() && dx_m > 0.0 && dy_m.is_finite() && dy_m > 0.0) {
            return Err(AasError::grid_consistency(
                "GRID.TARGET_SPACING",
                format!("DX and DY must be positive, got {} and {}", dx_m, dy_m),
            ));
        }

        Ok(Self {
            lon,
            lat,
            cell_area_km2: dx_m * dy_m / 1.0e6,
            lon_u: None,
            lat_v: None,
            global_attributes: Attributes::new(),
        })
    }

    pub fn with_staggered(mut self, lon_u: Array2<f64>, lat_v: Array2<f64>) -> AasResult<Self> {
        let (ny, nx) = self.shape();
        if lon_u.dim() != (ny, nx + 1) || lat_v.dim() != (ny + 1, nx) {
            return Err(AasError::grid_consistency(
                "GRID.STAGGER_SHAPE",
                format!(
                    "XLONG_U {:?} / XLAT_V {:?} do not match a {}x{} mass grid",
                    lon_u.dim(),
                    lat_v.dim(),
                    ny,
                    nx
                ),
            ));
        }
        self.lon_u = Some(lon_u);
        self.lat_v = Some(lat_v);
        Ok(self)
    }

    pub fn with_global_attributes(mut self, attributes: Attributes) -> Self {
        self.global_attributes = attributes;
        self
    }

    /// (south_north, west_east)
    pub fn shape(&self) -> (usize, usize) {
        self.lon.dim()
    }

    pub fn n_cells(&self) -> usize {
        self.lon.len()
    }

    pub fn lon(&self) -> ArrayView2<'_, f64> {
        self.lon.view()
    }

    pub fn lat(&self) -> ArrayView2<'_, f64> {
        self.lat.view()
    }

    pub fn cell_area_km2(&self) -> f64 {
        self.cell_area_km2
    }

    pub fn has_staggered_bounds(&self) -> bool {
        self.lon_u.is_some() && self.lat_v.is_some()
    }

    pub fn global_attributes(&self) -> &Attributes {
        &self.global_attributes
    }

    pub fn grid_id(&self) -> Option<i32> {
        self.global_attributes
            .get("GRID_ID")
            .and_then(AttributeValue::as_f64)
            .map(|value| value as i32)
    }

    /// Cell rectangles, row-major over (south_north, west_east). Staggered
    /// coordinates are used when present, centre midpoints otherwise.
    pub fn cell_rects(&self) -> Option<Vec<LonLatRect>> {
        let (Some(lon_u), Some(lat_v)) = (&self.lon_u, &self.lat_v) else {
            return rects_from_centres(self.lon.view(), self.lat.view());
        };

        let (ny, nx) = self.shape();
        let mut rects = Vec::with_capacity(ny * nx);
        for row in 0..ny {
            for col in 0..nx {
                rects.push(LonLatRect::from_edges(
                    lon_u[[row, col]],
                    lon_u[[row, col + 1]],
                    lat_v[[row, col]],
                    lat_v[[row + 1, col]],
                ));
            }
        }
        Some(rects)
    }
}

/// Longitude edges per row and latitude edges per column, both from centre
/// midpoints. Needs at least two cells along each axis.
fn rects_from_centres(
    lon: ArrayView2<'_, f64>,
    lat: ArrayView2<'_, f64>,
) -> Option<Vec<LonLatRect>> {
    let (ny, nx) = lon.dim();
    let lon_edges = lon
        .rows()
        .into_iter()
        .map(|row| cell_bounds(&row.to_vec()))
        .collect::<Option<Vec<_>>>()?;
    let lat_edges = lat
        .columns()
        .into_iter()
        .map(|column| cell_bounds(&column.to_vec()))
        .collect::<Option<Vec<_>>>()?;

    let mut rects = Vec::with_capacity(ny * nx);
    for row in 0..ny {
        for col in 0..nx {
            rects.push(LonLatRect::from_edges(
                lon_edges[row][col],
                lon_edges[row][col + 1],
                lat_edges[col][row],
                lat_edges[col][row + 1],
            ));
        }
    }
    Some(rects)
}
