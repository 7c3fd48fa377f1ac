use cartouche_types::Point2;
use nalgebra::{Matrix3, Vector2};
use tiny_skia::{
    FillRule, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, PixmapPaint, PixmapRef, Rect,
    Stroke, Transform,
};

use super::Operator;
use crate::error::CartoucheError;
use crate::Color;

/// Width of strokes, in device pixels, when no line width was set.
const DEFAULT_LINE_WIDTH_PX: f64 = 1.0;

#[derive(Debug, Clone)]
struct DrawState {
    ctm: Matrix3<f64>,
    source: Color,
    line_width: Option<f64>,
    line_cap: LineCap,
    line_join: LineJoin,
    operator: Operator,
    antialias: bool,
    letter_spacing: f64,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            ctm: Matrix3::identity(),
            source: Color::BLACK,
            line_width: None,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            operator: Operator::Over,
            antialias: true,
            letter_spacing: 0.0,
        }
    }
}

#[derive(Debug, Copy, Clone)]
enum PathElement {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    QuadTo(f32, f32, f32, f32),
    CubicTo(f32, f32, f32, f32, f32, f32),
    Circle(f32, f32, f32),
    Close,
}

/// Drawing context over a raster surface.
///
/// Path points are given in user coordinates and are converted into device pixels with the
/// current transformation matrix (CTM) at the moment they are added, in double precision. The
/// line width is kept in user units and converted with the CTM when a path is stroked.
pub struct DrawContext {
    pixmap: Pixmap,
    state: DrawState,
    saved: Vec<DrawState>,
    path: Vec<PathElement>,
}

impl DrawContext {
    /// Creates a context with a new transparent surface of the given size.
    pub fn new(width: u32, height: u32) -> Result<Self, CartoucheError> {
        let pixmap = Pixmap::new(width, height).ok_or(CartoucheError::Surface { width, height })?;
        Ok(Self {
            pixmap,
            state: DrawState::default(),
            saved: vec![],
            path: vec![],
        })
    }

    /// Width of the surface in pixels.
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// Height of the surface in pixels.
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// The surface drawn to.
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Encodes the surface as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, CartoucheError> {
        self.pixmap
            .encode_png()
            .map_err(|err| CartoucheError::Encoding(err.to_string()))
    }

    /// Pushes a copy of the paint state (CTM, source, line parameters, operator, antialiasing,
    /// letter spacing) on the state stack. The current path is not part of the state.
    pub fn save(&mut self) {
        self.saved.push(self.state.clone());
    }

    /// Restores the state saved by the matching [`DrawContext::save`].
    pub fn restore(&mut self) {
        match self.saved.pop() {
            Some(state) => self.state = state,
            None => log::warn!("DrawContext::restore called without matching save"),
        }
    }

    /// Scales the user space: `user' = user * (sx, sy)`.
    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.state.ctm *= Matrix3::new_nonuniform_scaling(&Vector2::new(sx, sy));
    }

    /// Moves the origin of the user space.
    pub fn translate(&mut self, tx: f64, ty: f64) {
        self.state.ctm *= Matrix3::new_translation(&Vector2::new(tx, ty));
    }

    /// Converts a user space point into device pixels.
    pub fn user_to_device(&self, x: f64, y: f64) -> Point2 {
        self.state.ctm.transform_point(&Point2::new(x, y))
    }

    /// Converts a device point into user space. Returns `None` if the CTM is not invertible.
    pub fn device_to_user(&self, x: f64, y: f64) -> Option<Point2> {
        let inverse = self.state.ctm.try_inverse()?;
        Some(inverse.transform_point(&Point2::new(x, y)))
    }

    /// Converts a user space distance into a device distance (the translation is ignored).
    pub fn user_to_device_distance(&self, dx: f64, dy: f64) -> Vector2<f64> {
        self.state.ctm.transform_vector(&Vector2::new(dx, dy))
    }

    /// Converts a device distance into a user space distance. Returns the input unchanged if
    /// the CTM is not invertible.
    pub fn device_to_user_distance(&self, dx: f64, dy: f64) -> Vector2<f64> {
        let distance = Vector2::new(dx, dy);
        match self.state.ctm.try_inverse() {
            Some(inverse) => inverse.transform_vector(&distance),
            None => distance,
        }
    }

    /// Discards the current path.
    pub fn new_path(&mut self) {
        self.path.clear();
    }

    /// Returns true if there is something in the current path.
    pub fn has_current_path(&self) -> bool {
        !self.path.is_empty()
    }

    /// Starts a new sub-path at the given user space point.
    pub fn move_to(&mut self, x: f64, y: f64) {
        let p = self.user_to_device(x, y);
        self.path.push(PathElement::MoveTo(p.x as f32, p.y as f32));
    }

    /// Adds a line to the given user space point.
    pub fn line_to(&mut self, x: f64, y: f64) {
        let p = self.user_to_device(x, y);
        self.path.push(PathElement::LineTo(p.x as f32, p.y as f32));
    }

    /// Closes the current sub-path.
    pub fn close_path(&mut self) {
        self.path.push(PathElement::Close);
    }

    /// Adds a circle around a user space point. The radius is given in user units along the x
    /// axis.
    pub fn circle(&mut self, x: f64, y: f64, radius: f64) {
        let center = self.user_to_device(x, y);
        let radius = self.user_to_device_distance(radius, 0.0).norm();
        self.path.push(PathElement::Circle(
            center.x as f32,
            center.y as f32,
            radius as f32,
        ));
    }

    /// Appends a path given in device pixels, translated by `(dx, dy)` pixels. Used for glyph
    /// outlines, which are laid out in device space.
    pub fn append_device_path(&mut self, path: &Path, dx: f32, dy: f32) {
        use tiny_skia::PathSegment;

        for segment in path.segments() {
            let element = match segment {
                PathSegment::MoveTo(p) => PathElement::MoveTo(p.x + dx, p.y + dy),
                PathSegment::LineTo(p) => PathElement::LineTo(p.x + dx, p.y + dy),
                PathSegment::QuadTo(p1, p) => {
                    PathElement::QuadTo(p1.x + dx, p1.y + dy, p.x + dx, p.y + dy)
                }
                PathSegment::CubicTo(p1, p2, p) => PathElement::CubicTo(
                    p1.x + dx,
                    p1.y + dy,
                    p2.x + dx,
                    p2.y + dy,
                    p.x + dx,
                    p.y + dy,
                ),
                PathSegment::Close => PathElement::Close,
            };
            self.path.push(element);
        }
    }

    /// Current source color.
    pub fn source(&self) -> Color {
        self.state.source
    }

    /// Sets the color used by fill, stroke and paint.
    pub fn set_source(&mut self, color: Color) {
        self.state.source = color;
    }

    /// Line width in user units, if it was set.
    pub fn line_width(&self) -> Option<f64> {
        self.state.line_width
    }

    /// Sets the line width in user units.
    pub fn set_line_width(&mut self, width: f64) {
        self.state.line_width = Some(width);
    }

    /// Current line cap.
    pub fn line_cap(&self) -> LineCap {
        self.state.line_cap
    }

    /// Sets the shape of line ends.
    pub fn set_line_cap(&mut self, cap: LineCap) {
        self.state.line_cap = cap;
    }

    /// Current line join.
    pub fn line_join(&self) -> LineJoin {
        self.state.line_join
    }

    /// Sets the shape of line corners.
    pub fn set_line_join(&mut self, join: LineJoin) {
        self.state.line_join = join;
    }

    /// Current compositing operator.
    pub fn operator(&self) -> Operator {
        self.state.operator
    }

    /// Sets the compositing operator.
    pub fn set_operator(&mut self, operator: Operator) {
        self.state.operator = operator;
    }

    /// Returns true if shapes are antialiased.
    pub fn antialias(&self) -> bool {
        self.state.antialias
    }

    /// Turns antialiasing on or off.
    pub fn set_antialias(&mut self, antialias: bool) {
        self.state.antialias = antialias;
    }

    /// Extra space between letters of labels, in pixels.
    pub fn letter_spacing(&self) -> f64 {
        self.state.letter_spacing
    }

    /// Sets the extra space between letters of labels, in pixels.
    pub fn set_letter_spacing(&mut self, spacing: f64) {
        self.state.letter_spacing = spacing;
    }

    /// Fills the current path with the source color, keeping the path.
    pub fn fill_preserve(&mut self) {
        let Some(path) = self.build_path() else {
            return;
        };

        let paint = self.make_paint();
        self.pixmap.fill_path(
            &path,
            &paint,
            FillRule::EvenOdd,
            Transform::identity(),
            None,
        );
    }

    /// Fills the current path and clears it.
    pub fn fill(&mut self) {
        self.fill_preserve();
        self.new_path();
    }

    /// Strokes the current path with the source color, keeping the path.
    pub fn stroke_preserve(&mut self) {
        let Some(path) = self.build_path() else {
            return;
        };

        let width = match self.state.line_width {
            Some(width) => self.user_to_device_distance(width, 0.0).norm(),
            None => DEFAULT_LINE_WIDTH_PX,
        };
        if width <= 0.0 {
            return;
        }

        let stroke = Stroke {
            width: width as f32,
            line_cap: self.state.line_cap,
            line_join: self.state.line_join,
            ..Default::default()
        };
        let paint = self.make_paint();
        self.pixmap
            .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    /// Strokes the current path and clears it.
    pub fn stroke(&mut self) {
        self.stroke_preserve();
        self.new_path();
    }

    /// Paints the source color over the whole surface.
    pub fn paint(&mut self) {
        let Some(rect) = Rect::from_xywh(0.0, 0.0, self.width() as f32, self.height() as f32)
        else {
            return;
        };

        let paint = self.make_paint();
        self.pixmap
            .fill_rect(rect, &paint, Transform::identity(), None);
    }

    /// Composites an image with its top-left corner at the given device pixel, using the
    /// current operator.
    pub fn draw_image(&mut self, image: PixmapRef, x: i32, y: i32) {
        let paint = PixmapPaint {
            blend_mode: self.state.operator.blend_mode(),
            ..Default::default()
        };
        self.pixmap
            .draw_pixmap(x, y, image, &paint, Transform::identity(), None);
    }

    fn make_paint(&self) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color(self.state.source.to_skia());
        paint.blend_mode = self.state.operator.blend_mode();
        paint.anti_alias = self.state.antialias;
        paint
    }

    fn build_path(&self) -> Option<Path> {
        let mut builder = PathBuilder::new();
        for element in &self.path {
            match *element {
                PathElement::MoveTo(x, y) => builder.move_to(x, y),
                PathElement::LineTo(x, y) => builder.line_to(x, y),
                PathElement::QuadTo(x1, y1, x, y) => builder.quad_to(x1, y1, x, y),
                PathElement::CubicTo(x1, y1, x2, y2, x, y) => builder.cubic_to(x1, y1, x2, y2, x, y),
                PathElement::Circle(x, y, r) => builder.push_circle(x, y, r),
                PathElement::Close => builder.close(),
            }
        }

        builder.finish()
    }
}

impl std::fmt::Debug for DrawContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawContext")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("state", &self.state)
            .field("saved", &self.saved.len())
            .field("path", &self.path.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn pixel(context: &DrawContext, x: u32, y: u32) -> [u8; 4] {
        let pixel = context.pixmap().pixel(x, y).unwrap().demultiply();
        [pixel.red(), pixel.green(), pixel.blue(), pixel.alpha()]
    }

    #[test]
    fn zero_sized_surface_fails() {
        assert!(DrawContext::new(0, 10).is_err());
        assert!(DrawContext::new(10, 0).is_err());
    }

    #[test]
    fn ctm_maps_bounds_to_pixels() {
        let mut context = DrawContext::new(100, 50).unwrap();
        // World box x: [-10, 10], y: [0, 5], north up.
        context.scale(100.0 / 20.0, -50.0 / 5.0);
        context.translate(10.0, -5.0);

        let nw = context.user_to_device(-10.0, 5.0);
        assert_abs_diff_eq!(nw.x, 0.0);
        assert_abs_diff_eq!(nw.y, 0.0);

        let se = context.user_to_device(10.0, 0.0);
        assert_abs_diff_eq!(se.x, 100.0);
        assert_abs_diff_eq!(se.y, 50.0);

        let distance = context.device_to_user_distance(5.0, 0.0);
        assert_abs_diff_eq!(distance.x, 1.0);
    }

    #[test]
    fn save_restore() {
        let mut context = DrawContext::new(10, 10).unwrap();
        context.save();
        context.set_source(Color::WHITE);
        context.set_operator(Operator::Multiply);
        context.set_line_width(3.0);
        context.scale(2.0, 2.0);
        context.restore();

        assert_eq!(context.source(), Color::BLACK);
        assert_eq!(context.operator(), Operator::Over);
        assert_eq!(context.line_width(), None);
        assert_abs_diff_eq!(context.user_to_device(1.0, 1.0).x, 1.0);

        // Unbalanced restore keeps the state.
        context.set_source(Color::WHITE);
        context.restore();
        assert_eq!(context.source(), Color::WHITE);
    }

    #[test]
    fn fill_preserve_keeps_path() {
        let mut context = DrawContext::new(10, 10).unwrap();
        context.move_to(0.0, 0.0);
        context.line_to(10.0, 0.0);
        context.line_to(10.0, 10.0);
        context.line_to(0.0, 10.0);
        context.close_path();

        context.set_source(Color::rgba(255, 0, 0, 255));
        context.fill_preserve();
        assert!(context.has_current_path());
        assert_eq!(pixel(&context, 5, 5), [255, 0, 0, 255]);

        context.set_source(Color::rgba(0, 0, 255, 255));
        context.fill();
        assert!(!context.has_current_path());
        assert_eq!(pixel(&context, 5, 5), [0, 0, 255, 255]);
    }

    #[test]
    fn paint_uses_operator() {
        let mut context = DrawContext::new(4, 4).unwrap();
        context.set_source(Color::rgba(200, 100, 50, 255));
        context.paint();
        assert_eq!(pixel(&context, 0, 0), [200, 100, 50, 255]);

        context.set_operator(Operator::Clear);
        context.paint();
        assert_eq!(pixel(&context, 3, 3)[3], 0);
    }

    #[test]
    fn stroke_uses_device_width() {
        let mut context = DrawContext::new(20, 20).unwrap();
        context.scale(0.1, 0.1);

        let width = context.device_to_user_distance(4.0, 0.0).x;
        context.set_line_width(width);
        context.move_to(0.0, 100.0);
        context.line_to(200.0, 100.0);
        context.set_source(Color::BLACK);
        context.stroke();

        assert_eq!(pixel(&context, 10, 9)[3], 255);
        assert_eq!(pixel(&context, 10, 11)[3], 255);
        assert_eq!(pixel(&context, 10, 14)[3], 0);
    }

    #[test]
    fn empty_path_draws_nothing() {
        let mut context = DrawContext::new(4, 4).unwrap();
        context.fill();
        context.stroke();
        assert_eq!(pixel(&context, 1, 1)[3], 0);
    }
}
