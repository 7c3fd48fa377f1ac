use super::Projection;
use crate::point::{GeoPoint2d, Point2};

/// "Projection" of geographic coordinate systems: `x` is the longitude and `y` is the latitude,
/// both in degrees.
#[derive(Debug, Default, Copy, Clone)]
pub struct GeographicProjection;

impl Projection for GeographicProjection {
    fn project(&self, input: &GeoPoint2d) -> Option<Point2> {
        Some(Point2::new(input.lon(), input.lat()))
    }

    fn unproject(&self, input: &Point2) -> Option<GeoPoint2d> {
        Some(GeoPoint2d::lonlat(input.x, input.y))
    }
}
