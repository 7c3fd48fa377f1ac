use std::path::Path;

use cartouche_types::SpatialReference;
use geojson::GeoJson;

use super::query::Filter;
use super::{Feature, FeatureSource, SourceError};

/// Features loaded from a GeoJSON file.
///
/// The file is read once when the source is opened. The table name of the source is the file
/// stem (`roads` for `data/roads.geojson`). Coordinates are WGS84 longitude/latitude.
#[derive(Debug, Clone)]
pub struct GeoJsonSource {
    name: String,
    srs: SpatialReference,
    features: Vec<Feature>,
}

impl GeoJsonSource {
    /// Reads and parses a GeoJSON file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| SourceError::io(path, err))?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self::parse(name, &json).map_err(|err| match err {
            SourceError::GeoJson { source, .. } => SourceError::GeoJson {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parses a GeoJSON document. Features without geometry are skipped.
    pub fn parse(name: impl Into<String>, json: &str) -> Result<Self, SourceError> {
        let geojson_error = |source: geojson::Error| SourceError::GeoJson {
            path: Default::default(),
            source: Box::new(source),
        };

        let geojson_features = match json.parse::<GeoJson>().map_err(geojson_error)? {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(geometry) => vec![geojson::Feature::from(geometry)],
        };

        let mut features = Vec::with_capacity(geojson_features.len());
        for feature in geojson_features {
            let Some(geometry) = feature.geometry else {
                continue;
            };

            features.push(Feature {
                geometry: geo_types::Geometry::<f64>::try_from(geometry).map_err(geojson_error)?,
                properties: feature.properties.unwrap_or_default(),
            });
        }

        let name = name.into();
        log::debug!("Loaded {} features into source '{name}'", features.len());

        Ok(Self {
            name,
            srs: SpatialReference::wgs84(),
            features,
        })
    }

    /// All features of the source.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }
}

impl FeatureSource for GeoJsonSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn srs(&self) -> &SpatialReference {
        &self.srs
    }

    fn query(&self, query: &str) -> Result<Vec<Feature>, SourceError> {
        let filter = Filter::parse(query)?;
        if filter.table() != self.name {
            return Err(SourceError::query(
                query,
                format!("source has no table '{}', only '{}'", filter.table(), self.name),
            ));
        }

        Ok(self
            .features
            .iter()
            .filter(|feature| filter.matches(&feature.properties))
            .cloned()
            .collect())
    }
}
