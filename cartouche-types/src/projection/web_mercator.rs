use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use super::Projection;
use crate::datum::Datum;
use crate::point::{GeoPoint2d, Point2};

/// Spherical mercator projection (EPSG:3857).
#[derive(Debug, Copy, Clone)]
pub struct WebMercator {
    datum: Datum,
}

impl WebMercator {
    /// Creates a projection on the sphere with the semimajor axis of the given datum.
    pub fn new(datum: Datum) -> Self {
        Self { datum }
    }
}

impl Default for WebMercator {
    fn default() -> Self {
        Self {
            datum: Datum::WEB_SPHERE,
        }
    }
}

impl Projection for WebMercator {
    fn project(&self, input: &GeoPoint2d) -> Option<Point2> {
        let x = self.datum.semimajor() * input.lon_rad();
        let y = self.datum.semimajor() * (FRAC_PI_4 + input.lat_rad() / 2.0).tan().ln();

        if x.is_finite() && y.is_finite() {
            Some(Point2::new(x, y))
        } else {
            None
        }
    }

    fn unproject(&self, input: &Point2) -> Option<GeoPoint2d> {
        let lat = 2.0 * (input.y / self.datum.semimajor()).exp().atan() - FRAC_PI_2;
        let lon = input.x / self.datum.semimajor();

        if lat.is_finite() && lon.is_finite() {
            Some(GeoPoint2d::latlon(lat.to_degrees(), lon.to_degrees()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::tile::WEB_MERCATOR_EXTENT;

    #[test]
    fn project_world_corners() {
        let projection = WebMercator::default();

        let origin = projection.project(&GeoPoint2d::latlon(0.0, 0.0)).unwrap();
        assert_abs_diff_eq!(origin.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(origin.y, 0.0, epsilon = 1e-9);

        let corner = projection
            .project(&GeoPoint2d::latlon(85.0511287798066, 180.0))
            .unwrap();
        assert_abs_diff_eq!(corner.x, WEB_MERCATOR_EXTENT, epsilon = 0.01);
        assert_abs_diff_eq!(corner.y, WEB_MERCATOR_EXTENT, epsilon = 0.01);
    }

    #[test]
    fn pole_is_not_projected() {
        let projection = WebMercator::default();
        assert!(projection.project(&GeoPoint2d::latlon(90.0, 0.0)).is_none());
    }

    #[test]
    fn unproject_inverts_project() {
        let projection = WebMercator::default();
        let point = GeoPoint2d::latlon(40.7, -73.9);
        let projected = projection.project(&point).unwrap();
        let back = projection.unproject(&projected).unwrap();

        assert_abs_diff_eq!(back.lat(), point.lat(), epsilon = 1e-9);
        assert_abs_diff_eq!(back.lon(), point.lon(), epsilon = 1e-9);
    }
}
