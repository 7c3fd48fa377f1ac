use std::path::{Path, PathBuf};

use cartouche_types::SpatialReference;
use serde::{Deserialize, Serialize};

use super::{Map, MapBuilder};
use crate::error::CartoucheError;
use crate::layer::{Layer, ResampleKernel};
use crate::source::ImageFileSource;

/// Map description that can be loaded from a JSON document.
///
/// ```json
/// {
///   "srs": "EPSG:4326",
///   "width": 512,
///   "height": 256,
///   "bounds": [180, 90, -180, -90],
///   "bgcolor": "#a0c8f0",
///   "layers": [
///     {
///       "kind": "vector",
///       "source": "countries.geojson",
///       "rules": [
///         {
///           "filter": "SELECT * FROM countries",
///           "styles": [["fill", "#f0ead6"], ["stroke", "#777777"], ["weight", "0.5"]]
///         }
///       ]
///     }
///   ]
/// }
/// ```
///
/// Style values are kept as given and resolved when the map is drawn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Spatial reference, as a PROJ string or an `EPSG:<code>` identifier.
    #[serde(default)]
    pub srs: Option<String>,
    /// Image width in pixels.
    #[serde(default)]
    pub width: Option<u32>,
    /// Image height in pixels.
    #[serde(default)]
    pub height: Option<u32>,
    /// Extent as `[max_x, max_y, min_x, min_y]`.
    #[serde(default)]
    pub bounds: Option<[f64; 4]>,
    /// Slippy map tile to render instead of explicit srs, size and bounds.
    #[serde(default)]
    pub slippy: Option<TileConfig>,
    /// Background color.
    #[serde(default)]
    pub bgcolor: Option<String>,
    /// Layers in drawing order.
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
}

/// Address of a slippy map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileConfig {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Zoom level.
    pub z: u32,
}

/// Kind of data a layer reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// GeoJSON file.
    Vector,
    /// Image file with a world file.
    Raster,
}

/// Layer of a [`MapConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Kind of the source file.
    pub kind: LayerKind,
    /// Path to the source file. Relative paths are resolved against the directory of the
    /// configuration file when it is loaded with [`MapConfig::open`].
    pub source: PathBuf,
    /// Resampling kernel of raster layers.
    #[serde(default)]
    pub resample: ResampleKernel,
    /// Spatial reference of a raster's world file. Rasters without it are taken to be in the
    /// map's spatial reference.
    #[serde(default)]
    pub srs: Option<String>,
    /// Rules in drawing order.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// Rule of a [`LayerConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Query selecting the features drawn by the rule.
    #[serde(default)]
    pub filter: String,
    /// `[key, value]` style pairs.
    #[serde(default)]
    pub styles: Vec<(String, String)>,
}

impl MapConfig {
    /// Parses a JSON document.
    pub fn from_json(json: &str) -> Result<Self, CartoucheError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON document from a file. Relative source paths are resolved against the
    /// directory of the file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CartoucheError> {
        let path = path.as_ref();
        let mut config = Self::from_json(&std::fs::read_to_string(path)?)?;

        if let Some(dir) = path.parent() {
            for layer in &mut config.layers {
                if layer.source.is_relative() {
                    layer.source = dir.join(&layer.source);
                }
            }
        }

        Ok(config)
    }

    /// Opens the sources of the layers and creates the map.
    pub fn build(&self) -> Result<Map, CartoucheError> {
        let mut builder = MapBuilder::default();
        if let Some(tile) = self.slippy {
            builder = builder.with_slippy(tile.x, tile.y, tile.z);
        }
        if let Some(srs) = &self.srs {
            builder = builder.with_srs(srs);
        }
        if let (Some(width), Some(height)) = (self.width, self.height) {
            builder = builder.with_size(width, height);
        }
        if let Some([max_x, max_y, min_x, min_y]) = self.bounds {
            builder = builder.with_bounds(max_x, max_y, min_x, min_y);
        }
        if let Some(bgcolor) = &self.bgcolor {
            builder = builder.with_bgcolor(bgcolor);
        }

        for layer in &self.layers {
            builder = builder.with_layer(layer.open()?);
        }

        builder.build()
    }
}

impl LayerConfig {
    fn open(&self) -> Result<Layer, CartoucheError> {
        let layer = match self.kind {
            LayerKind::Vector => Layer::open_vector(&self.source)?,
            LayerKind::Raster => {
                let mut source = ImageFileSource::open(&self.source)?;
                if let Some(srs) = &self.srs {
                    source = source.with_srs(SpatialReference::from_user_input(srs)?);
                }
                Layer::raster(source)
            }
        };
        layer.set_resample(self.resample);

        for rule_config in &self.rules {
            let rule = layer.add_rule(&rule_config.filter)?;
            for (key, value) in &rule_config.styles {
                rule.add_style(key, value)?;
            }
        }

        Ok(layer)
    }
}

impl Map {
    /// Parses a JSON map configuration and creates the map.
    pub fn from_json(json: &str) -> Result<Self, CartoucheError> {
        MapConfig::from_json(json)?.build()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_document() {
        let config = MapConfig::from_json(
            r##"{
                "slippy": {"x": 0, "y": 0, "z": 1},
                "bgcolor": "#ffffff",
                "layers": [{
                    "kind": "raster",
                    "source": "relief.png",
                    "resample": "lanczos",
                    "srs": "EPSG:4326",
                    "rules": [{"filter": "", "styles": [["blend", "multiply"], ["seamless", "true"]]}]
                }]
            }"##,
        )
        .unwrap();

        assert_eq!(config.slippy, Some(TileConfig { x: 0, y: 0, z: 1 }));
        assert_eq!(config.layers[0].kind, LayerKind::Raster);
        assert_eq!(config.layers[0].resample, ResampleKernel::Lanczos);
        assert_eq!(config.layers[0].srs.as_deref(), Some("EPSG:4326"));
        assert_eq!(
            config.layers[0].rules[0].styles[1],
            ("seamless".to_string(), "true".to_string())
        );
    }

    #[test]
    fn defaults() {
        let config = MapConfig::from_json("{}").unwrap();
        assert_eq!(config, MapConfig::default());

        let map = config.build().unwrap();
        assert!(map.is_ok());
        assert!(map.is_valid().is_err());
    }

    #[test]
    fn invalid_documents() {
        assert_matches!(
            MapConfig::from_json(r#"{"layers": [{"kind": "wms", "source": "a"}]}"#),
            Err(CartoucheError::Config(_))
        );
        assert_matches!(
            MapConfig::from_json(r#"{"bounds": [1, 2, 3]}"#),
            Err(CartoucheError::Config(_))
        );
    }

    #[test]
    fn missing_source() {
        let config = MapConfig {
            layers: vec![LayerConfig {
                kind: LayerKind::Vector,
                source: "/nonexistent/roads.geojson".into(),
                resample: ResampleKernel::default(),
                srs: None,
                rules: vec![],
            }],
            ..Default::default()
        };

        assert_matches!(config.build(), Err(CartoucheError::Source(_)));
    }
}
