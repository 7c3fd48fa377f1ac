//! Drawing backend of the renderer.
//!
//! [`DrawContext`] is a stateful 2d context in the spirit of cairo: it has a current
//! transformation matrix, a current path given in user coordinates, and paint state (source
//! color, line parameters, compositing [`Operator`]) that [styles](crate::style) modify before
//! the path is filled or stroked. The pixels live in a `tiny-skia` pixmap.

mod context;
mod operator;
#[cfg(feature = "labels")]
pub mod text;

pub use context::DrawContext;
pub use operator::Operator;
pub use tiny_skia::{LineCap, LineJoin, Pixmap};
