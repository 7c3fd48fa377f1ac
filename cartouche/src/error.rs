//! Error types used by the crate.

use cartouche_types::CartoucheTypesError;
use thiserror::Error;

use crate::source::SourceError;

/// Cartouche error type.
///
/// These are runtime failures: a [`Map`](crate::Map) that produces one of them also switches
/// its sticky status to [`MapStatus::Error`](crate::MapStatus::Error).
#[derive(Debug, Error)]
pub enum CartoucheError {
    /// Spatial reference or tile address error.
    #[error(transparent)]
    Types(#[from] CartoucheTypesError),
    /// A data source could not be opened or queried.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// A child was added to a parent that does not exist yet (no layer or no rule).
    #[error("cannot add {child}: the map has no {parent} yet")]
    MissingParent {
        /// What was being added.
        child: &'static str,
        /// What was missing.
        parent: &'static str,
    },
    /// A collection could not grow.
    #[error("failed to allocate storage for {0}")]
    Allocation(&'static str),
    /// The map lacks something required for rendering.
    #[error("map is not valid for rendering: missing {0}")]
    InvalidMap(&'static str),
    /// The drawing surface could not be created.
    #[error("failed to create a {width}x{height} drawing surface")]
    Surface {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The rendered surface could not be encoded.
    #[error("failed to encode image: {0}")]
    Encoding(String),
    /// Error reading/writing data to the FS or a stream.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// Map configuration document could not be parsed.
    #[error("invalid map configuration: {0}")]
    Config(#[from] serde_json::Error),
}
