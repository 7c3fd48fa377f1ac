//! Error type used by the crate.

use thiserror::Error;

/// Error enum.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CartoucheTypesError {
    /// The spatial reference definition could not be parsed.
    #[error("invalid spatial reference '{0}'")]
    InvalidSrs(String),
    /// The spatial reference is well-formed but no projection backend can handle it.
    #[error("unsupported spatial reference '{definition}': {reason}")]
    UnsupportedSrs {
        /// Definition as given by the user.
        definition: String,
        /// Why the projection backend rejected it.
        reason: String,
    },
    /// Tile address outside of the tile grid of its zoom level.
    #[error("tile {z}/{x}/{y} is outside of the tile grid")]
    InvalidTile {
        /// Zoom level.
        z: u32,
        /// Column.
        x: u32,
        /// Row.
        y: u32,
    },
}
