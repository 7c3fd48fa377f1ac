//! Cartouche renders geodata into images. It reads vector features and georeferenced rasters,
//! projects them into the spatial reference of a map and draws them with cascading styles.
//!
//! # Quick start
//!
//! ```no_run
//! use cartouche::Map;
//!
//! let mut map = Map::new();
//! map.set_srs("EPSG:4326").unwrap();
//! map.set_size(512, 256);
//! map.set_bounds(180.0, 90.0, -180.0, -90.0);
//! map.set_bgcolor("#a0c8f0");
//!
//! let layer = map.add_vector_layer("data/countries.geojson").unwrap();
//! let rule = map.add_rule(&layer, "SELECT * FROM countries").unwrap();
//! map.add_style(&rule, "fill", "#f0ead6").unwrap();
//! map.add_style(&rule, "stroke", "#777777").unwrap();
//! map.add_style(&rule, "weight", "0.5").unwrap();
//!
//! map.render_to_png("countries.png").unwrap();
//! ```
//!
//! # Main components
//!
//! * [`Map`] holds the spatial reference, pixel size and extent of the image, and a list of
//! * [`layers`](layer), each reading data from a [`source`] and drawing it with a list of
//! * [`Rule`]s. A rule selects features with a filter query and carries
//! * [`Style`]s: key/value pairs that modify the [`DrawContext`] through the
//!   [style registry](style).
//!
//! Every object of the graph is owned through an [`Rc`](std::rc::Rc) stored in a
//! [`SharedList`], so a style or rule shared between several parents lives as long as any of
//! them does.
//!
//! # Errors
//!
//! Fallible operations return [`CartoucheError`]. A [`Map`] also remembers its first failure in
//! a sticky [`MapStatus`]: after an error, the map can only be inspected and dropped, any
//! further change or render panics.

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

mod color;
pub mod error;
pub mod layer;
mod list;
mod map;
pub mod render;
mod rule;
pub mod source;
pub mod style;

pub use color::Color;
pub use error::CartoucheError;
pub use layer::{Layer, LayerRef, LayerSource, ResampleKernel};
pub use list::{ElementDestructor, Iter, SharedList};
pub use map::{
    LayerConfig, LayerKind, Map, MapBuilder, MapConfig, MapStatus, RuleConfig, Surface,
    TileConfig, TILE_SIZE,
};
pub use render::{DrawContext, Operator};
pub use rule::{Rule, RuleRef};
pub use style::{apply_styles, Style, StyleKind};

// Reexport cartouche_types
pub use cartouche_types;
pub use cartouche_types::{Bounds, SpatialReference, TileIndex};
