//! Data sources read by map layers.
//!
//! A vector layer reads [`Feature`]s from a [`FeatureSource`], selecting them with the filter
//! of each rule. A raster layer reads a georeferenced image from a [`RasterSource`].

use std::path::{Path, PathBuf};

use cartouche_types::{Bounds, SpatialReference};
use geo_types::Geometry;
use image::RgbaImage;
use serde_json::{Map as JsonMap, Value};
use thiserror::Error;

mod geojson;
mod image_file;
mod query;

pub use self::geojson::GeoJsonSource;
pub use image_file::ImageFileSource;
pub use query::{Comparison, Condition, Filter, Literal};

/// Error from a data source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source file could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// Path of the source.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The source file is not a valid GeoJSON document.
    #[error("invalid GeoJSON in '{path}': {source}")]
    GeoJson {
        /// Path of the source.
        path: PathBuf,
        /// Underlying error.
        source: Box<::geojson::Error>,
    },
    /// The image could not be decoded.
    #[error("failed to decode image '{path}': {source}")]
    Image {
        /// Path of the source.
        path: PathBuf,
        /// Underlying error.
        source: image::ImageError,
    },
    /// The image has no usable georeferencing.
    #[error("invalid world file for '{path}': {reason}")]
    WorldFile {
        /// Path of the image.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },
    /// The filter query is malformed or names a table the source does not have.
    #[error("invalid query '{query}': {reason}")]
    Query {
        /// The query.
        query: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl SourceError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn query(query: &str, reason: impl Into<String>) -> Self {
        Self::Query {
            query: query.to_string(),
            reason: reason.into(),
        }
    }
}

/// A feature read from a source: a geometry with attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Geometry in the coordinates of the source's spatial reference.
    pub geometry: Geometry<f64>,
    /// Attributes of the feature.
    pub properties: JsonMap<String, Value>,
}

impl Feature {
    /// Returns the attribute as text. Strings are returned as they are, numbers and booleans
    /// are formatted, other values give `None`.
    pub fn property_string(&self, name: &str) -> Option<String> {
        match self.properties.get(name)? {
            Value::String(value) => Some(value.clone()),
            Value::Number(value) => Some(value.to_string()),
            Value::Bool(value) => Some(value.to_string()),
            _ => None,
        }
    }
}

/// Source of vector features.
pub trait FeatureSource {
    /// Name of the table the source provides, used in `FROM` clauses of filters.
    fn name(&self) -> &str;
    /// Spatial reference of feature coordinates.
    fn srs(&self) -> &SpatialReference;
    /// Returns the features selected by the filter query.
    fn query(&self, filter: &str) -> Result<Vec<Feature>, SourceError>;
}

/// Source of a georeferenced image.
pub trait RasterSource {
    /// Extent covered by the image, in the coordinates of [`RasterSource::srs`].
    fn extent(&self) -> Bounds;
    /// Spatial reference of the extent. `None` if the image is already in the map's spatial
    /// reference; otherwise the image is warped into the map when drawn.
    fn srs(&self) -> Option<&SpatialReference>;
    /// Pixels of the image.
    fn image(&self) -> &RgbaImage;
}
