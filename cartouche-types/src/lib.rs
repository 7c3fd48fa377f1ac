//! Geometric building blocks of the cartouche map renderer: geographic [`Bounds`],
//! [spatial references](SpatialReference), [projections](projection) and the slippy
//! [tile](TileIndex) arithmetic used to derive bounds from `z/x/y` addresses.

mod bounds;
mod datum;
pub mod error;
mod point;
pub mod projection;
mod srs;
mod tile;

pub use bounds::Bounds;
pub use datum::Datum;
pub use error::CartoucheTypesError;
pub use point::{GeoPoint2d, Point2};
pub use srs::{SpatialReference, SrsKind};
pub use tile::{TileIndex, WEB_MERCATOR_EXTENT};
