use geodesy::prelude::*;

use super::Projection;
use crate::point::{GeoPoint2d, Point2};

/// Projection backed by the `geodesy` crate. The definition uses the geodesy operator syntax,
/// e.g. `tmerc lon_0=9 k_0=0.9996 x_0=500000 ellps=GRS80`.
pub struct GeodesyProjection {
    context: Minimal,
    op: OpHandle,
}

impl GeodesyProjection {
    /// Instantiates the operator. Fails if geodesy does not know the operator or rejects its
    /// parameters.
    pub fn new(definition: &str) -> Result<Self, String> {
        let mut context = Minimal::new();
        let op = context.op(definition).map_err(|err| err.to_string())?;
        Ok(Self { context, op })
    }
}

impl Projection for GeodesyProjection {
    fn project(&self, input: &GeoPoint2d) -> Option<Point2> {
        let mut data = [Coor2D::geo(input.lat(), input.lon())];
        self.context.apply(self.op, Fwd, &mut data).ok()?;

        if !data[0].0[0].is_finite() || !data[0].0[1].is_finite() {
            return None;
        }

        Some(Point2::new(data[0].0[0], data[0].0[1]))
    }

    fn unproject(&self, input: &Point2) -> Option<GeoPoint2d> {
        let mut data = [Coor2D([input.x, input.y])];
        self.context.apply(self.op, Inv, &mut data).ok()?;

        if !data[0].0[0].is_finite() || !data[0].0[1].is_finite() {
            return None;
        }

        Some(GeoPoint2d::latlon(
            data[0].0[1].to_degrees(),
            data[0].0[0].to_degrees(),
        ))
    }
}
