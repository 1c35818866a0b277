//! True ground area of sampling cells
//!
//! Projected grids are assumed to be in metres, so a cell of side `res`
//! covers `res²`. Geographic grids use the WGS84 spheroid:
//!
//! ```text
//! dx = N(φ)·cos(φ)·Δλ      N = a / sqrt(1 - e²·sin²φ)
//! dy = M(φ)·Δφ             M = a·(1 - e²) / (1 - e²·sin²φ)^(3/2)
//! ```

use postfire_core::raster::{Raster, RasterElement};
use postfire_core::CRS;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// How the area of one sample is derived from its position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellAreaModel {
    /// `resolution²`, coordinates in metres
    Planar,
    /// WGS84 spheroid, coordinates in degrees
    Geodesic,
}

impl CellAreaModel {
    /// Model matching the layer's CRS
    pub fn for_raster<T: RasterElement>(layer: &Raster<T>) -> Self {
        if layer.is_geographic() {
            CellAreaModel::Geodesic
        } else {
            CellAreaModel::Planar
        }
    }

    /// Area in m² of a square cell of side `resolution` centred at
    /// northing/latitude `y`
    pub fn area_at(self, y: f64, resolution: f64) -> f64 {
        match self {
            CellAreaModel::Planar => resolution * resolution,
            CellAreaModel::Geodesic => spheroid_cell_area(y, resolution, resolution),
        }
    }
}

/// Area in m² of a `resolution` cell at `y`, using the spheroid when `crs`
/// is geographic
pub fn cell_area(y: f64, resolution: f64, crs: Option<&CRS>) -> f64 {
    let model = match crs {
        Some(crs) if crs.is_geographic() => CellAreaModel::Geodesic,
        _ => CellAreaModel::Planar,
    };
    model.area_at(y, resolution)
}

fn spheroid_cell_area(latitude_deg: f64, d_lon: f64, d_lat: f64) -> f64 {
    let lat = latitude_deg.clamp(-90.0, 90.0).to_radians();
    let e2 = 2.0 * WGS84_F - WGS84_F * WGS84_F;
    let w = 1.0 - e2 * lat.sin().powi(2);

    let n = WGS84_A / w.sqrt();
    let m = WGS84_A * (1.0 - e2) / w.powf(1.5);

    let dx = n * lat.cos() * d_lon.to_radians();
    let dy = m * d_lat.to_radians();
    dx.abs() * dy.abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_planar() {
        assert_eq!(CellAreaModel::Planar.area_at(4_300_000.0, 10.0), 100.0);
        assert_eq!(cell_area(0.0, 30.0, Some(&CRS::etrs89_utm30n())), 900.0);
        assert_eq!(cell_area(0.0, 30.0, None), 900.0);
    }

    #[test]
    fn test_equator_degree_cell() {
        // one arc-second at the equator is roughly 30.9 m by 30.7 m
        let arcsec = 1.0 / 3600.0;
        let area = cell_area(0.0, arcsec, Some(&CRS::wgs84()));
        assert_relative_eq!(area, 30.92 * 30.72, max_relative = 0.01);
    }

    #[test]
    fn test_area_shrinks_poleward() {
        let g = CellAreaModel::Geodesic;
        let eq = g.area_at(0.0, 0.01);
        let mid = g.area_at(40.0, 0.01);
        let high = g.area_at(80.0, 0.01);
        assert!(eq > mid && mid > high);
        // cos(60°) = 0.5, the meridional radius grows slightly toward the pole
        assert_relative_eq!(g.area_at(60.0, 0.01) / eq, 0.505, max_relative = 0.001);
    }
}
