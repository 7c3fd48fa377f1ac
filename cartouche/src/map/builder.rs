use cartouche_types::Bounds;

use super::Map;
use crate::error::CartoucheError;
use crate::layer::Layer;

/// Convenience type to initialize a [Map].
///
/// ```no_run
/// use cartouche::{Layer, MapBuilder};
///
/// let layer = Layer::open_vector("data/countries.geojson").unwrap();
/// let rule = layer.add_rule("SELECT * FROM countries").unwrap();
/// rule.add_style("fill", "#061F37").unwrap();
///
/// let mut map = MapBuilder::default()
///     .with_srs("EPSG:4326")
///     .with_size(512, 256)
///     .with_bounds(180.0, 90.0, -180.0, -90.0)
///     .with_layer(layer)
///     .build()
///     .unwrap();
///
/// map.render_to_png("countries.png").unwrap();
/// ```
#[derive(Default)]
pub struct MapBuilder {
    srs: Option<String>,
    size: Option<(u32, u32)>,
    bounds: Option<Bounds>,
    slippy: Option<(u32, u32, u32)>,
    bgcolor: Option<String>,
    layers: Vec<Layer>,
}

impl MapBuilder {
    /// Sets the spatial reference of the map, as a PROJ string or an `EPSG:<code>` identifier.
    pub fn with_srs(mut self, definition: impl Into<String>) -> Self {
        self.srs = Some(definition.into());
        self
    }

    /// Sets the image size in pixels.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    /// Sets the extent of the map from two opposite corners.
    pub fn with_bounds(mut self, max_x: f64, max_y: f64, min_x: f64, min_y: f64) -> Self {
        self.bounds = Some(Bounds::from_corners(max_x, max_y, min_x, min_y));
        self
    }

    /// Renders the slippy map tile `z/x/y`.
    ///
    /// The tile sets the spatial reference, the size and the bounds of the map. Values given with
    /// [`MapBuilder::with_srs`], [`MapBuilder::with_size`] and [`MapBuilder::with_bounds`] take
    /// precedence over the ones of the tile.
    ///
    /// ```
    /// use cartouche::MapBuilder;
    ///
    /// let map = MapBuilder::default().with_slippy(0, 0, 0).build().unwrap();
    /// assert_eq!(map.width(), 256);
    /// assert!(map.bounds().unwrap().width() > 40_000_000.0);
    /// ```
    pub fn with_slippy(mut self, x: u32, y: u32, z: u32) -> Self {
        self.slippy = Some((x, y, z));
        self
    }

    /// Sets the background color as `#rrggbb` or `#rrggbbaa`.
    pub fn with_bgcolor(mut self, color: impl Into<String>) -> Self {
        self.bgcolor = Some(color.into());
        self
    }

    /// Appends a layer. Layers are drawn in the order they are added.
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Creates the map.
    pub fn build(self) -> Result<Map, CartoucheError> {
        let mut map = Map::new();

        if let Some((x, y, z)) = self.slippy {
            map.set_slippy(x, y, z)?;
        }
        if let Some(srs) = &self.srs {
            map.set_srs(srs)?;
        }
        if let Some((width, height)) = self.size {
            map.set_size(width, height);
        }
        if let Some(bounds) = self.bounds {
            map.set_bounds(bounds.se().x, bounds.nw().y, bounds.nw().x, bounds.se().y);
        }
        if let Some(bgcolor) = &self.bgcolor {
            map.set_bgcolor(bgcolor);
        }
        for layer in self.layers {
            map.add_layer(layer)?;
        }

        Ok(map)
    }
}
