//! Spherical helpers on longitude/latitude coordinates in degrees.

use super::constants::{DEG2RAD, EARTH_RADIUS_KM};

/// Point on the unit sphere. Squared chord lengths between these order
/// points the same way as great-circle distances.
pub fn unit_vector(lon: f64, lat: f64) -> [f64; 3] {
    let (lambda, phi) = (lon * DEG2RAD, lat * DEG2RAD);
    [phi.cos() * lambda.cos(), phi.cos() * lambda.sin(), phi.sin()]
}

pub fn is_valid_lon_lat(lon: f64, lat: f64) -> bool {
    lon.is_finite()
        && lat.is_finite()
        && (-360.0..=360.0).contains(&lon)
        && (-90.0..=90.0).contains(&lat)
}

/// Cell bounded by two meridians and two parallels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLatRect {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl LonLatRect {
    /// Builds a rectangle from unordered edges.
    pub fn from_edges(lon_a: f64, lon_b: f64, lat_a: f64, lat_b: f64) -> Self {
        Self {
            west: lon_a.min(lon_b),
            east: lon_a.max(lon_b),
            south: lat_a.min(lat_b),
            north: lat_a.max(lat_b),
        }
    }

    /// Exact area on the sphere in km².
    pub fn area_km2(&self) -> f64 {
        let d_lambda = (self.east - self.west) * DEG2RAD;
        let band = (self.north * DEG2RAD).sin() - (self.south * DEG2RAD).sin();
        (EARTH_RADIUS_KM * EARTH_RADIUS_KM * d_lambda * band).max(0.0)
    }

    pub fn intersection(&self, other: &LonLatRect) -> Option<LonLatRect> {
        let west = self.west.max(other.west);
        let east = self.east.min(other.east);
        let south = self.south.max(other.south);
        let north = self.north.min(other.north);
        (east > west && north > south).then_some(LonLatRect {
            west,
            east,
            south,
            north,
        })
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.east > self.west && self.north > self.south)
    }
}

/// Cell edges from cell-centre coordinates along one axis.
///
/// Interior edges sit halfway between neighbouring centres; the two outer
/// edges are extrapolated by half of the adjacent spacing. Returns `None`
/// with fewer than two centres.
pub fn cell_bounds(centres: &[f64]) -> Option<Vec<f64>> {
    if centres.len() < 2 {
        return None;
    }

    let last = centres.len() - 1;
    let mut bounds = Vec::with_capacity(centres.len() + 1);
    bounds.push(centres[0] - (centres[1] - centres[0]) / 2.0);
    bounds.extend(centres.windows(2).map(|pair| pair[0] + (pair[1] - pair[0]) / 2.0));
    bounds.push(centres[last] + (centres[last] - centres[last - 1]) / 2.0);
    Some(bounds)
}

#[cfg(test)]
mod tests {
    use super::{LonLatRect, cell_bounds, is_valid_lon_lat, unit_vector};

    #[test]
    fn unit_vectors_lie_on_the_sphere() {
        let [x, y, z] = unit_vector(90.0, 0.0);
        assert!(x.abs() <= 1.0e-15 && (y - 1.0).abs() <= 1.0e-15 && z == 0.0);

        let [x, y, z] = unit_vector(-46.6, -23.5);
        assert!((x * x + y * y + z * z - 1.0).abs() <= 1.0e-15);
        assert!(z < 0.0);
    }

    #[test]
    fn cell_bounds_extrapolate_outer_edges() {
        let bounds = cell_bounds(&[0.5, 1.5, 2.5]).expect("three centres give bounds");
        assert_eq!(bounds, vec![0.0, 1.0, 2.0, 3.0]);

        let descending = cell_bounds(&[2.5, 1.5]).expect("two centres give bounds");
        assert_eq!(descending, vec![3.0, 2.0, 1.0]);

        assert!(cell_bounds(&[1.0]).is_none());
    }

    #[test]
    fn rectangle_overlap_areas_add_up() {
        let whole = LonLatRect::from_edges(0.0, 2.0, 0.0, 2.0);
        let left = LonLatRect::from_edges(0.0, 1.0, 0.0, 2.0);
        let right = LonLatRect::from_edges(1.0, 2.0, 0.0, 2.0);

        let sum = left.area_km2() + right.area_km2();
        assert!((whole.area_km2() - sum).abs() <= 1.0e-9 * whole.area_km2());

        let overlap = whole.intersection(&left).expect("left half overlaps");
        assert_eq!(overlap, left);
        assert!(left.intersection(&LonLatRect::from_edges(1.0, 3.0, 0.0, 2.0)).is_none());
        assert!(LonLatRect::from_edges(1.0, 1.0, 0.0, 1.0).is_degenerate());
    }

    #[test]
    fn coordinate_validation_rejects_nan_and_out_of_range() {
        assert!(is_valid_lon_lat(-46.6, -23.5));
        assert!(!is_valid_lon_lat(f64::NAN, 0.0));
        assert!(!is_valid_lon_lat(0.0, 91.0));
    }
}
