//! [Layers](Layer) specify a data source and the rules that decide how its data is drawn.
//!
//! There are two kinds of layers:
//! * vector layers read features from a [`FeatureSource`]. Every rule queries the source with
//!   its filter and draws the selected features with its styles.
//! * raster layers draw a georeferenced image from a [`RasterSource`], resampled to the map
//!   pixels with the layer's [`ResampleKernel`].

use std::cell::{Cell, Ref, RefCell};
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::rc::Rc;

use cartouche_types::{Bounds, SpatialReference};
use serde::{Deserialize, Serialize};

use crate::error::CartoucheError;
use crate::render::DrawContext;
use crate::rule::{Rule, RuleRef};
use crate::source::{FeatureSource, GeoJsonSource, ImageFileSource, RasterSource};
use crate::style::StyleKind;
use crate::SharedList;

mod raster;
mod vector;

/// Shared handle to a layer of a map.
pub type LayerRef = Rc<Layer>;

/// Kernel used to resample raster images to the map pixels.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleKernel {
    /// Nearest neighbor.
    #[default]
    Nearest,
    /// Linear interpolation.
    Bilinear,
    /// Cubic (Catmull-Rom) interpolation.
    Cubic,
    /// Gaussian filter.
    Gaussian,
    /// Lanczos filter with window 3.
    Lanczos,
}

impl ResampleKernel {
    /// Looks up a kernel by its lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.trim().to_ascii_lowercase().as_str() {
            "nearest" => Self::Nearest,
            "bilinear" => Self::Bilinear,
            "cubic" => Self::Cubic,
            "gaussian" => Self::Gaussian,
            "lanczos" => Self::Lanczos,
            _ => return None,
        })
    }

    /// Radius of the kernel, in source pixels. Zero for nearest neighbor.
    pub(crate) fn support(self) -> f64 {
        match self {
            Self::Nearest => 0.0,
            Self::Bilinear => 1.0,
            Self::Cubic => 2.0,
            Self::Gaussian | Self::Lanczos => 3.0,
        }
    }

    /// Weight of a source pixel at distance `x` from the sampled point.
    pub(crate) fn weight(self, x: f64) -> f64 {
        let x = x.abs();
        match self {
            Self::Nearest => f64::from(u8::from(x < 0.5)),
            Self::Bilinear => (1.0 - x).max(0.0),
            Self::Cubic => catmull_rom(x),
            Self::Gaussian if x < 3.0 => (-2.0 * x * x).exp(),
            Self::Lanczos if x < 3.0 => sinc(x) * sinc(x / 3.0),
            Self::Gaussian | Self::Lanczos => 0.0,
        }
    }
}

fn catmull_rom(x: f64) -> f64 {
    if x < 1.0 {
        1.5 * x * x * x - 2.5 * x * x + 1.0
    } else if x < 2.0 {
        -0.5 * x * x * x + 2.5 * x * x - 4.0 * x + 2.0
    } else {
        0.0
    }
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        let a = x * std::f64::consts::PI;
        a.sin() / a
    }
}

/// Data source of a layer.
pub enum LayerSource {
    /// Vector features.
    Vector(Box<dyn FeatureSource>),
    /// Georeferenced image.
    Raster(Box<dyn RasterSource>),
}

/// Part of the world drawn by a render: the spatial reference and extent of the map.
#[derive(Debug, Copy, Clone)]
pub(crate) struct MapFrame<'a> {
    pub(crate) srs: &'a SpatialReference,
    pub(crate) bounds: Bounds,
}

/// A data source with an ordered list of rules.
pub struct Layer {
    source: LayerSource,
    rules: RefCell<SharedList<Rule>>,
    resample: Cell<ResampleKernel>,
}

impl Layer {
    /// Creates a layer drawing features of the source.
    pub fn vector(source: impl FeatureSource + 'static) -> Self {
        Self::new(LayerSource::Vector(Box::new(source)))
    }

    /// Creates a layer drawing the image of the source.
    pub fn raster(source: impl RasterSource + 'static) -> Self {
        Self::new(LayerSource::Raster(Box::new(source)))
    }

    /// Opens a GeoJSON file as a vector layer.
    pub fn open_vector(path: impl AsRef<Path>) -> Result<Self, CartoucheError> {
        Ok(Self::vector(GeoJsonSource::open(path)?))
    }

    /// Opens an image file with a world file as a raster layer.
    pub fn open_raster(path: impl AsRef<Path>) -> Result<Self, CartoucheError> {
        Ok(Self::raster(ImageFileSource::open(path)?))
    }

    fn new(source: LayerSource) -> Self {
        Self {
            source,
            rules: RefCell::new(SharedList::new()),
            resample: Cell::new(ResampleKernel::default()),
        }
    }

    /// Data source of the layer.
    pub fn source(&self) -> &LayerSource {
        &self.source
    }

    /// Returns true for raster layers.
    pub fn is_raster(&self) -> bool {
        matches!(self.source, LayerSource::Raster(_))
    }

    /// Appends a rule with the given filter.
    pub fn add_rule(&self, filter: impl Into<String>) -> Result<RuleRef, CartoucheError> {
        self.rules
            .borrow_mut()
            .push(Rule::new(filter))
            .map_err(|_| CartoucheError::Allocation("rule"))
    }

    /// Rules of the layer, in insertion order.
    pub fn rules(&self) -> Ref<'_, SharedList<Rule>> {
        self.rules.borrow()
    }

    /// Last added rule.
    pub fn last_rule(&self) -> Option<RuleRef> {
        self.rules.borrow().tail().cloned()
    }

    /// Resampling kernel of a raster layer.
    pub fn resample(&self) -> ResampleKernel {
        self.resample.get()
    }

    /// Sets the resampling kernel. Has no effect on vector layers.
    pub fn set_resample(&self, kernel: ResampleKernel) {
        self.resample.set(kernel);
    }

    /// Draws the layer.
    pub(crate) fn process(
        &self,
        context: &mut DrawContext,
        frame: &MapFrame<'_>,
    ) -> Result<(), CartoucheError> {
        let rules = self.rules.borrow();
        match &self.source {
            LayerSource::Vector(source) => vector::draw(source.as_ref(), &rules, context, frame),
            LayerSource::Raster(source) => {
                raster::draw(source.as_ref(), &rules, self.resample(), context, frame)
            }
        }
    }
}

impl Debug for Layer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let source = match &self.source {
            LayerSource::Vector(source) => format!("Vector({})", source.name()),
            LayerSource::Raster(source) => format!("Raster({:?})", source.extent()),
        };

        f.debug_struct("Layer")
            .field("source", &source)
            .field("rules", &self.rules.borrow())
            .field("resample", &self.resample.get())
            .finish()
    }
}

/// Turns antialiasing off if the rule has `seamless: true`.
fn apply_seamless(context: &mut DrawContext, rule: &Rule) {
    if rule
        .style_arg(StyleKind::Seamless)
        .is_some_and(|arg| arg.trim() == "true")
    {
        context.set_antialias(false);
    }
}
