//! Projections convert geographic coordinates into the cartesian coordinates of a
//! [`SpatialReference`](crate::SpatialReference) and back.

mod albers;
mod geodesy;
mod identity;
mod web_mercator;

pub use self::geodesy::GeodesyProjection;
pub use albers::{AlbersEqualArea, AlbersParameters};
pub use identity::GeographicProjection;
pub use web_mercator::WebMercator;

use crate::point::{GeoPoint2d, Point2};

/// Forward and inverse conversion between geographic and projected coordinates.
pub trait Projection {
    /// Projects a geographic point. Returns `None` if the point cannot be represented in the
    /// projection (e.g. a pole in mercator).
    fn project(&self, input: &GeoPoint2d) -> Option<Point2>;
    /// Converts a projected point back into geographic coordinates.
    fn unproject(&self, input: &Point2) -> Option<GeoPoint2d>;
}

/// Converts points between the projected coordinates of two spatial references.
pub struct Transformation {
    inner: Option<(Box<dyn Projection>, Box<dyn Projection>)>,
}

impl Transformation {
    /// Transformation that returns its input.
    pub fn identity() -> Self {
        Self { inner: None }
    }

    /// Transformation that unprojects points with `source` and projects them with `target`.
    pub fn new(source: Box<dyn Projection>, target: Box<dyn Projection>) -> Self {
        Self {
            inner: Some((source, target)),
        }
    }

    /// Returns true if the transformation never changes coordinates.
    pub fn is_identity(&self) -> bool {
        self.inner.is_none()
    }

    /// Transforms a single point.
    pub fn transform(&self, point: &Point2) -> Option<Point2> {
        match &self.inner {
            None => Some(*point),
            Some((source, target)) => {
                let geo = source.unproject(point)?;
                target.project(&geo)
            }
        }
    }
}

impl std::fmt::Debug for Transformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformation")
            .field("is_identity", &self.is_identity())
            .finish()
    }
}
