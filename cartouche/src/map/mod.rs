//! [`Map`] is the top-level object of the crate: it keeps the spatial reference, the pixel size
//! and extent of the image, and the layers to draw.

use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use cartouche_types::{Bounds, SpatialReference, TileIndex};
use tiny_skia::Pixmap;

use crate::error::CartoucheError;
use crate::layer::{Layer, LayerRef, MapFrame};
use crate::render::DrawContext;
use crate::rule::RuleRef;
use crate::style::{self, Style, StyleKind};
use crate::{Color, SharedList};

mod builder;
mod config;

pub use builder::MapBuilder;
pub use config::{LayerConfig, LayerKind, MapConfig, RuleConfig, TileConfig};

/// Size in pixels of a slippy map tile.
pub const TILE_SIZE: u32 = 256;

/// Health of a map.
///
/// A map starts [`MapStatus::Ok`] and switches to [`MapStatus::Error`] when an operation fails.
/// The error status is never cleared: once it is set, the map can be inspected and dropped, but
/// changing or rendering it panics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MapStatus {
    /// No operation has failed.
    #[default]
    Ok,
    /// An operation failed with the given message.
    Error(String),
}

/// A map to be rendered into an image.
///
/// ```no_run
/// use cartouche::Map;
///
/// let mut map = Map::new();
/// map.set_srs("+proj=longlat +ellps=GRS80 +datum=NAD83 +no_defs").unwrap();
/// map.set_size(256, 256);
/// map.set_bounds(-179.231086, 17.831509, -100.859681, 71.441059);
///
/// let layer = map.add_vector_layer("data/countries.geojson").unwrap();
/// let rule = map.add_rule(&layer, "SELECT * FROM countries").unwrap();
/// map.add_style(&rule, "fill", "#061F3799").unwrap();
/// map.add_style(&rule, "stroke", "#ffffff").unwrap();
///
/// map.render_to_png("countries.png").unwrap();
/// assert!(map.is_ok());
/// ```
pub struct Map {
    srs: Option<SpatialReference>,
    width: u32,
    height: u32,
    bounds: Option<Bounds>,
    layers: SharedList<Layer>,
    bgcolor: Option<String>,
    context: Option<DrawContext>,
    status: MapStatus,
    user_data: Option<Rc<dyn Any>>,
}

impl Map {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            srs: None,
            width: 0,
            height: 0,
            bounds: None,
            layers: SharedList::new(),
            bgcolor: None,
            context: None,
            status: MapStatus::Ok,
            user_data: None,
        }
    }

    /// Creates a map from a configuration document.
    pub fn from_config(config: &MapConfig) -> Result<Self, CartoucheError> {
        config.build()
    }

    /// Current status.
    pub fn status(&self) -> &MapStatus {
        &self.status
    }

    /// Returns true if no operation on the map has failed.
    pub fn is_ok(&self) -> bool {
        self.status == MapStatus::Ok
    }

    /// `"OK"` or the message of the error that switched the map into the error status.
    pub fn status_message(&self) -> &str {
        match &self.status {
            MapStatus::Ok => "OK",
            MapStatus::Error(message) => message,
        }
    }

    /// Sets the spatial reference from a PROJ string or an `EPSG:<code>` identifier.
    pub fn set_srs(&mut self, definition: &str) -> Result<(), CartoucheError> {
        self.assert_ok();
        match SpatialReference::from_user_input(definition) {
            Ok(srs) => {
                self.srs = Some(srs);
                Ok(())
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Spatial reference of the map.
    pub fn srs(&self) -> Option<&SpatialReference> {
        self.srs.as_ref()
    }

    /// Sets the image size in pixels. Zero sizes are accepted here and make the map invalid.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.assert_ok();
        self.width = width;
        self.height = height;
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sets the extent of the map in the map's spatial reference from two opposite corners.
    /// Replaces the previous extent.
    pub fn set_bounds(&mut self, max_x: f64, max_y: f64, min_x: f64, min_y: f64) {
        self.assert_ok();
        let mut bounds = Bounds::new();
        bounds.extend(max_x, max_y);
        bounds.extend(min_x, min_y);
        self.bounds = Some(bounds);
    }

    /// Extent of the map.
    pub fn bounds(&self) -> Option<&Bounds> {
        self.bounds.as_ref()
    }

    /// Sets the map up to render the slippy map tile `z/x/y`: spherical mercator, the extent of
    /// the tile and a 256x256 image.
    pub fn set_slippy(&mut self, x: u32, y: u32, z: u32) -> Result<(), CartoucheError> {
        self.assert_ok();
        let tile = TileIndex::new(x, y, z).map_err(|err| self.fail(err.into()))?;

        self.set_size(TILE_SIZE, TILE_SIZE);
        self.srs = Some(SpatialReference::web_mercator());
        let bounds = tile.web_mercator_bounds();
        self.set_bounds(bounds.se().x, bounds.nw().y, bounds.nw().x, bounds.se().y);

        Ok(())
    }

    /// Sets the color painted over the image before any layer is drawn, as `#rrggbb` or
    /// `#rrggbbaa`.
    pub fn set_bgcolor(&mut self, color: &str) {
        self.assert_ok();
        self.bgcolor = Some(color.to_string());
    }

    /// Background color.
    pub fn bgcolor(&self) -> Option<&str> {
        self.bgcolor.as_deref()
    }

    /// Appends a layer.
    pub fn add_layer(&mut self, layer: Layer) -> Result<LayerRef, CartoucheError> {
        self.assert_ok();
        match self.layers.push(layer) {
            Ok(layer) => Ok(layer),
            Err(_) => Err(self.fail(CartoucheError::Allocation("layer"))),
        }
    }

    /// Opens a GeoJSON file and appends it as a vector layer.
    pub fn add_vector_layer(&mut self, path: impl AsRef<Path>) -> Result<LayerRef, CartoucheError> {
        self.assert_ok();
        let layer = Layer::open_vector(path).map_err(|err| self.fail(err))?;
        self.add_layer(layer)
    }

    /// Opens a georeferenced image and appends it as a raster layer.
    pub fn add_raster_layer(&mut self, path: impl AsRef<Path>) -> Result<LayerRef, CartoucheError> {
        self.assert_ok();
        let layer = Layer::open_raster(path).map_err(|err| self.fail(err))?;
        self.add_layer(layer)
    }

    /// Layers of the map, in drawing order.
    pub fn layers(&self) -> &SharedList<Layer> {
        &self.layers
    }

    /// Appends a rule to the layer.
    pub fn add_rule(
        &mut self,
        layer: &LayerRef,
        filter: impl Into<String>,
    ) -> Result<RuleRef, CartoucheError> {
        self.assert_ok();
        layer.add_rule(filter).map_err(|err| self.fail(err))
    }

    /// Appends a rule to the last added layer. Fails if the map has no layers.
    pub fn add_rule_to_last_layer(
        &mut self,
        filter: impl Into<String>,
    ) -> Result<RuleRef, CartoucheError> {
        self.assert_ok();
        let Some(layer) = self.layers.tail().cloned() else {
            return Err(self.fail(CartoucheError::MissingParent {
                child: "rule",
                parent: "layer",
            }));
        };

        self.add_rule(&layer, filter)
    }

    /// Appends a style to the rule.
    pub fn add_style(
        &mut self,
        rule: &RuleRef,
        key: impl Into<String>,
        arg: impl Into<String>,
    ) -> Result<Rc<Style>, CartoucheError> {
        self.assert_ok();
        rule.add_style(key, arg).map_err(|err| self.fail(err))
    }

    /// Appends a style to the last rule of the last added layer. Fails if there is no such rule.
    pub fn add_style_to_last_rule(
        &mut self,
        key: impl Into<String>,
        arg: impl Into<String>,
    ) -> Result<Rc<Style>, CartoucheError> {
        self.assert_ok();
        let Some(layer) = self.layers.tail().cloned() else {
            return Err(self.fail(CartoucheError::MissingParent {
                child: "style",
                parent: "layer",
            }));
        };
        let Some(rule) = layer.last_rule() else {
            return Err(self.fail(CartoucheError::MissingParent {
                child: "style",
                parent: "rule",
            }));
        };

        self.add_style(&rule, key, arg)
    }

    /// Attaches arbitrary data to the map.
    pub fn set_user_data(&mut self, data: Rc<dyn Any>) {
        self.user_data = Some(data);
    }

    /// Data attached with [`Map::set_user_data`].
    pub fn user_data(&self) -> Option<Rc<dyn Any>> {
        self.user_data.clone()
    }

    /// Checks that the map has everything needed for rendering: a healthy status, bounds, a
    /// spatial reference, a non-zero size and at least one layer.
    pub fn is_valid(&self) -> Result<(), CartoucheError> {
        if !self.is_ok() {
            return Err(CartoucheError::InvalidMap("an ok status"));
        }
        if self.bounds.is_none() {
            return Err(CartoucheError::InvalidMap("bounds"));
        }
        if self.srs.is_none() {
            return Err(CartoucheError::InvalidMap("spatial reference"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(CartoucheError::InvalidMap("image size"));
        }
        if self.layers.is_empty() {
            return Err(CartoucheError::InvalidMap("layers"));
        }

        Ok(())
    }

    /// Draws the map onto a new surface.
    ///
    /// The drawing context lives as long as the returned [`Surface`] and is released when the
    /// surface is closed or dropped. If drawing fails, the context is released, the map switches
    /// to the error status and the error is returned.
    pub fn build_surface(&mut self) -> Result<Surface<'_>, CartoucheError> {
        self.assert_ok();
        if let Err(err) = self.draw() {
            self.context = None;
            return Err(self.fail(err));
        }

        Ok(Surface { map: self })
    }

    fn draw(&mut self) -> Result<(), CartoucheError> {
        self.is_valid()?;
        let (Some(bounds), Some(srs)) = (self.bounds, self.srs.as_ref()) else {
            return Err(CartoucheError::InvalidMap("bounds and spatial reference"));
        };

        let mut context = DrawContext::new(self.width, self.height)?;
        context.scale(
            self.width as f64 / bounds.width(),
            -(self.height as f64) / bounds.height(),
        );
        context.translate(-bounds.nw().x, -bounds.nw().y);

        if let Some(bgcolor) = &self.bgcolor {
            match (Color::try_from_hex(bgcolor), style::handler(StyleKind::Paint)) {
                (Some(_), Some(paint)) => paint(&mut context, bgcolor),
                _ => log::debug!("Ignoring malformed background color '{bgcolor}'"),
            }
        }

        let frame = MapFrame { srs, bounds };
        log::debug!(
            "Drawing {} layers into {}x{} surface",
            self.layers.len(),
            self.width,
            self.height
        );

        // The context belongs to the map while the layers are drawn.
        let context = self.context.insert(context);
        for layer in &self.layers {
            layer.process(context, &frame)?;
        }

        Ok(())
    }

    /// Renders the map and returns the image.
    pub fn render_to_pixmap(&mut self) -> Result<Pixmap, CartoucheError> {
        let surface = self.build_surface()?;
        Ok(surface.pixmap().clone())
    }

    /// Renders the map and writes it as PNG into the writer.
    pub fn render_to_stream(&mut self, writer: &mut impl Write) -> Result<(), CartoucheError> {
        let encoded = self.build_surface()?.encode_png();
        encoded
            .and_then(|png| Ok(writer.write_all(&png)?))
            .map_err(|err| self.fail(err))
    }

    /// Renders the map into a PNG file.
    ///
    /// The file is written only after the image is encoded. A failed render leaves no file.
    pub fn render_to_png(&mut self, path: impl AsRef<Path>) -> Result<(), CartoucheError> {
        let encoded = self.build_surface()?.encode_png();
        encoded
            .and_then(|png| Ok(std::fs::write(path.as_ref(), png)?))
            .map_err(|err| self.fail(err))
    }

    fn assert_ok(&self) {
        assert!(
            self.is_ok(),
            "map is in the error status ({}) and cannot be changed or rendered",
            self.status_message()
        );
    }

    /// Switches the map into the error status and returns the error.
    fn fail(&mut self, error: CartoucheError) -> CartoucheError {
        log::error!("Map operation failed: {error}");
        if self.is_ok() {
            self.status = MapStatus::Error(error.to_string());
        }

        error
    }
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Map {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Map")
            .field("srs", &self.srs.as_ref().map(|srs| srs.definition()))
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bounds", &self.bounds)
            .field("layers", &self.layers)
            .field("bgcolor", &self.bgcolor)
            .field("rendering", &self.context.is_some())
            .field("status", &self.status)
            .finish()
    }
}

/// A rendered map surface.
///
/// Holds the drawing context of the map. Closing or dropping the surface releases it.
pub struct Surface<'a> {
    map: &'a mut Map,
}

impl Surface<'_> {
    /// The rendered image.
    pub fn pixmap(&self) -> &Pixmap {
        match &self.map.context {
            Some(context) => context.pixmap(),
            None => unreachable!("surface without a drawing context"),
        }
    }

    /// Encodes the image as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, CartoucheError> {
        match &self.map.context {
            Some(context) => context.encode_png(),
            None => unreachable!("surface without a drawing context"),
        }
    }

    /// Releases the drawing context.
    pub fn close(self) {}
}

impl Drop for Surface<'_> {
    fn drop(&mut self) {
        log::debug!("Closing map surface");
        self.map.context = None;
    }
}

impl Debug for Surface<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.map.width)
            .field("height", &self.map.height)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;

    use super::*;
    use crate::source::GeoJsonSource;

    const EMPTY: &str = r#"{"type": "FeatureCollection", "features": []}"#;

    fn empty_layer() -> Layer {
        Layer::vector(GeoJsonSource::parse("empty", EMPTY).unwrap())
    }

    #[test]
    fn bounds_are_replaced() {
        let mut map = Map::new();
        map.set_bounds(10.0, 10.0, 0.0, 0.0);
        let bounds = map.bounds().unwrap();
        assert_eq!(bounds.se().x, 10.0);
        assert_eq!(bounds.nw().y, 10.0);
        assert_eq!(bounds.nw().x, 0.0);
        assert_eq!(bounds.se().y, 0.0);

        map.set_bounds(0.0, 0.0, -10.0, -10.0);
        let bounds = map.bounds().unwrap();
        assert_eq!(bounds.se().x, 0.0);
        assert_eq!(bounds.nw().y, 0.0);
        assert_eq!(bounds.nw().x, -10.0);
        assert_eq!(bounds.se().y, -10.0);
    }

    #[test]
    fn slippy_tile() {
        let mut map = Map::new();
        map.set_slippy(0, 0, 1).unwrap();

        let bounds = map.bounds().unwrap();
        assert_abs_diff_eq!(bounds.nw().x, -20037508.34, epsilon = 0.01);
        assert_abs_diff_eq!(bounds.nw().y, 20037508.34, epsilon = 0.01);
        assert_abs_diff_eq!(bounds.se().x, 0.0, epsilon = 0.001);
        assert_abs_diff_eq!(bounds.se().y, 0.0, epsilon = 0.001);
        assert_eq!((map.width(), map.height()), (TILE_SIZE, TILE_SIZE));
        assert!(map.srs().unwrap().definition().contains("+proj=merc"));
    }

    #[test]
    fn invalid_slippy_tile() {
        let mut map = Map::new();
        assert_matches!(map.set_slippy(2, 0, 1), Err(CartoucheError::Types(_)));
        assert!(!map.is_ok());
    }

    #[test]
    fn srs_reads_back() {
        let definition = "+proj=longlat +ellps=GRS80 +datum=NAD83 +no_defs";
        let mut map = Map::new();
        map.set_srs(definition).unwrap();
        assert_eq!(map.srs().unwrap().definition(), definition);
        assert!(map.is_ok());
    }

    #[test]
    fn invalid_srs() {
        let mut map = Map::new();
        assert!(map.set_srs("+ellps=GRS80 +no_defs").is_err());
        assert!(!map.is_ok());
        assert_ne!(map.status_message(), "OK");
    }

    #[test]
    fn validity() {
        let mut map = Map::new();
        assert_matches!(map.is_valid(), Err(CartoucheError::InvalidMap("bounds")));

        map.set_bounds(1.0, 1.0, 0.0, 0.0);
        assert_matches!(map.is_valid(), Err(CartoucheError::InvalidMap("spatial reference")));

        map.set_srs("EPSG:4326").unwrap();
        assert_matches!(map.is_valid(), Err(CartoucheError::InvalidMap("image size")));

        map.set_size(10, 0);
        assert_matches!(map.is_valid(), Err(CartoucheError::InvalidMap("image size")));

        map.set_size(10, 10);
        assert_matches!(map.is_valid(), Err(CartoucheError::InvalidMap("layers")));

        map.add_layer(empty_layer()).unwrap();
        assert_matches!(map.is_valid(), Ok(()));
        assert!(map.is_ok());
    }

    #[test]
    fn rule_without_layer() {
        let mut map = Map::new();
        assert_matches!(
            map.add_rule_to_last_layer("SELECT * FROM empty"),
            Err(CartoucheError::MissingParent { parent: "layer", .. })
        );
        assert!(!map.is_ok());
    }

    #[test]
    fn style_without_rule() {
        let mut map = Map::new();
        map.add_layer(empty_layer()).unwrap();
        assert_matches!(
            map.add_style_to_last_rule("fill", "#ffffff"),
            Err(CartoucheError::MissingParent { parent: "rule", .. })
        );
        assert!(!map.is_ok());
        assert!(map.status_message().contains("rule"));
    }

    #[test]
    fn error_status_is_sticky() {
        let mut map = Map::new();
        let _ = map.add_rule_to_last_layer("SELECT * FROM empty");
        let message = map.status_message().to_string();

        assert!(map.is_valid().is_err());
        assert_eq!(map.status_message(), message);
    }

    #[test]
    #[should_panic(expected = "error status")]
    fn mutating_failed_map_panics() {
        let mut map = Map::new();
        let _ = map.add_rule_to_last_layer("SELECT * FROM empty");
        map.set_size(10, 10);
    }

    #[test]
    fn last_element_targets() {
        let mut map = Map::new();
        let first = map.add_layer(empty_layer()).unwrap();
        let second = map.add_layer(empty_layer()).unwrap();

        let rule = map.add_rule_to_last_layer("SELECT * FROM empty").unwrap();
        let style = map.add_style_to_last_rule("fill", "#000000").unwrap();

        assert!(first.rules().is_empty());
        assert!(Rc::ptr_eq(second.rules().head().unwrap(), &rule));
        assert!(Rc::ptr_eq(rule.styles().head().unwrap(), &style));
    }

    #[test]
    fn user_data() {
        let mut map = Map::new();
        assert!(map.user_data().is_none());

        let data: Rc<dyn Any> = Rc::new(String::from("payload"));
        map.set_user_data(data.clone());
        assert!(Rc::ptr_eq(&map.user_data().unwrap(), &data));
    }

    #[test]
    fn surface_releases_context() {
        let mut map = Map::new();
        map.set_srs("EPSG:4326").unwrap();
        map.set_size(4, 4);
        map.set_bounds(1.0, 1.0, 0.0, 0.0);
        map.set_bgcolor("#CC0000");
        map.add_layer(empty_layer()).unwrap();

        let surface = map.build_surface().unwrap();
        let pixel = surface.pixmap().pixel(1, 1).unwrap();
        assert_eq!((pixel.red(), pixel.alpha()), (0xcc, 0xff));
        surface.close();

        assert!(map.context.is_none());
        assert!(map.is_ok());
    }

    #[test]
    fn invalid_map_does_not_render() {
        let mut map = Map::new();
        assert_matches!(
            map.render_to_stream(&mut Vec::new()),
            Err(CartoucheError::InvalidMap(_))
        );
        assert!(!map.is_ok());
        assert!(map.context.is_none());
    }

    #[test]
    fn failed_render_writes_no_file() {
        let dir = std::env::temp_dir().join("cartouche-map-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("invalid.png");
        let _ = std::fs::remove_file(&path);

        let mut map = Map::new();
        map.set_size(16, 16);
        assert_matches!(map.render_to_png(&path), Err(CartoucheError::InvalidMap(_)));
        assert!(!path.exists());
    }
}
