//! Style declarations and the registry that turns them into drawing context changes.

use std::any::Any;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use ahash::{HashMap, HashMapExt};
use lazy_static::lazy_static;
use regex::Regex;

use crate::render::{DrawContext, LineCap, LineJoin, Operator};
use crate::{Color, SharedList};

/// Signature of a style handler: mutates the drawing context according to the style argument.
pub type StyleHandler = fn(&mut DrawContext, &str);

/// Known style keys.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StyleKind {
    /// `fill`: sets the source color and fills the current path.
    Fill,
    /// `stroke`: sets the source color and strokes the current path.
    Stroke,
    /// `weight`: line width in pixels.
    Weight,
    /// `line-cap`: `butt`, `round` or `square`.
    LineCap,
    /// `line-join`: `miter`, `round` or `bevel`.
    LineJoin,
    /// `color`: fill color of label text.
    Color,
    /// `text-stroke-color`: outline color of label text.
    TextStrokeColor,
    /// `text-stroke-weight`: outline width of label text.
    TextStrokeWeight,
    /// `letter-spacing`: extra space between letters of label text, in pixels.
    LetterSpacing,
    /// `blend`: compositing operator name.
    Blend,
    /// `paint`: paints a color over the whole surface.
    Paint,
    /// `radius`: radius of point markers in pixels.
    Radius,
    /// `seamless`: `true` turns antialiasing off.
    Seamless,
    /// `text-field`: name of the feature property printed as a label.
    TextField,
    /// `font`: label font as `"<family> <size>"`.
    Font,
}

impl StyleKind {
    const ALL: [StyleKind; 15] = [
        Self::Fill,
        Self::Stroke,
        Self::Weight,
        Self::LineCap,
        Self::LineJoin,
        Self::Color,
        Self::TextStrokeColor,
        Self::TextStrokeWeight,
        Self::LetterSpacing,
        Self::Blend,
        Self::Paint,
        Self::Radius,
        Self::Seamless,
        Self::TextField,
        Self::Font,
    ];

    /// Key of the style as written in style declarations.
    pub fn key(self) -> &'static str {
        match self {
            Self::Fill => "fill",
            Self::Stroke => "stroke",
            Self::Weight => "weight",
            Self::LineCap => "line-cap",
            Self::LineJoin => "line-join",
            Self::Color => "color",
            Self::TextStrokeColor => "text-stroke-color",
            Self::TextStrokeWeight => "text-stroke-weight",
            Self::LetterSpacing => "letter-spacing",
            Self::Blend => "blend",
            Self::Paint => "paint",
            Self::Radius => "radius",
            Self::Seamless => "seamless",
            Self::TextField => "text-field",
            Self::Font => "font",
        }
    }

    /// Finds the kind by its key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    /// Reserved kinds have no handler in the registry. They are read directly by the routine
    /// drawing a geometry.
    pub fn is_reserved(self) -> bool {
        matches!(
            self,
            Self::Radius | Self::Seamless | Self::TextField | Self::Font
        )
    }
}

lazy_static! {
    static ref REGISTRY: HashMap<StyleKind, StyleHandler> = {
        let mut registry: HashMap<StyleKind, StyleHandler> = HashMap::new();
        registry.insert(StyleKind::Fill, fill);
        registry.insert(StyleKind::Stroke, stroke);
        registry.insert(StyleKind::Weight, weight);
        registry.insert(StyleKind::LineCap, line_cap);
        registry.insert(StyleKind::Color, fill);
        registry.insert(StyleKind::TextStrokeColor, stroke);
        registry.insert(StyleKind::TextStrokeWeight, weight);
        registry.insert(StyleKind::LetterSpacing, letter_spacing);
        registry.insert(StyleKind::Blend, blend);
        registry.insert(StyleKind::Paint, paint);
        registry.insert(StyleKind::LineJoin, line_join);
        registry
    };
    static ref LEADING_NUMBER: Regex =
        Regex::new(r"^\s*[+-]?(\d+(\.\d*)?|\.\d+)").expect("valid regex");
}

/// Returns the handler registered for the style kind.
pub fn handler(kind: StyleKind) -> Option<StyleHandler> {
    REGISTRY.get(&kind).copied()
}

/// A single `key: arg` style declaration.
pub struct Style {
    key: String,
    arg: String,
    user_data: RefCell<Option<Rc<dyn Any>>>,
}

impl Style {
    /// Creates a new style.
    pub fn new(key: impl Into<String>, arg: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            arg: arg.into(),
            user_data: RefCell::new(None),
        }
    }

    /// Style key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Style argument.
    pub fn arg(&self) -> &str {
        &self.arg
    }

    /// Kind of the style, if the key is known.
    pub fn kind(&self) -> Option<StyleKind> {
        StyleKind::from_key(&self.key)
    }

    /// Attaches arbitrary data to the style.
    pub fn set_user_data(&self, data: Rc<dyn Any>) {
        *self.user_data.borrow_mut() = Some(data);
    }

    /// Data attached with [`Style::set_user_data`].
    pub fn user_data(&self) -> Option<Rc<dyn Any>> {
        self.user_data.borrow().clone()
    }
}

impl Debug for Style {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Style")
            .field("key", &self.key)
            .field("arg", &self.arg)
            .finish()
    }
}

/// Finds the first style with the given key.
pub fn lookup_style<'a>(styles: &'a SharedList<Style>, key: &str) -> Option<&'a Rc<Style>> {
    styles.iter().find(|style| style.key == key)
}

/// Applies the styles of the given kinds, in the order of `kinds`.
///
/// A kind is skipped if it has no handler or if there is no style with its key in `styles`.
/// If several styles share a key, the first one is used.
pub fn apply_styles(context: &mut DrawContext, styles: &SharedList<Style>, kinds: &[StyleKind]) {
    for kind in kinds {
        let Some(handler) = handler(*kind) else {
            continue;
        };
        let Some(style) = lookup_style(styles, kind.key()) else {
            continue;
        };

        handler(context, &style.arg);
    }
}

fn set_color(context: &mut DrawContext, arg: &str) {
    match Color::try_from_hex(arg) {
        Some(color) => context.set_source(color),
        None => log::debug!("Ignoring malformed color '{arg}'"),
    }
}

fn fill(context: &mut DrawContext, arg: &str) {
    set_color(context, arg);
    context.fill_preserve();
}

fn stroke(context: &mut DrawContext, arg: &str) {
    set_color(context, arg);
    context.stroke_preserve();
}

fn paint(context: &mut DrawContext, arg: &str) {
    set_color(context, arg);
    context.paint();
}

fn weight(context: &mut DrawContext, arg: &str) {
    let Ok(width) = arg.trim().parse::<f64>() else {
        log::debug!("Ignoring malformed weight '{arg}'");
        return;
    };

    let width = context.device_to_user_distance(width, 0.0).norm();
    context.set_line_width(width);
}

fn line_cap(context: &mut DrawContext, arg: &str) {
    let cap = match arg.trim() {
        "butt" => LineCap::Butt,
        "round" => LineCap::Round,
        "square" => LineCap::Square,
        _ => {
            log::debug!("Ignoring unknown line cap '{arg}'");
            return;
        }
    };

    context.set_line_cap(cap);
}

fn line_join(context: &mut DrawContext, arg: &str) {
    let join = match arg.trim() {
        "miter" => LineJoin::Miter,
        "round" => LineJoin::Round,
        "bevel" => LineJoin::Bevel,
        _ => {
            log::debug!("Ignoring unknown line join '{arg}'");
            return;
        }
    };

    context.set_line_join(join);
}

/// Letter spacing in pixels. Only the leading number of the argument is read, so `2px` is `2`.
fn letter_spacing(context: &mut DrawContext, arg: &str) {
    let spacing = LEADING_NUMBER
        .find(arg)
        .and_then(|number| number.as_str().trim().parse::<f64>().ok());
    match spacing {
        Some(spacing) => context.set_letter_spacing(spacing),
        None => log::debug!("Ignoring malformed letter spacing '{arg}'"),
    }
}

fn blend(context: &mut DrawContext, arg: &str) {
    let operator = Operator::from_name(arg).unwrap_or_default();
    context.set_operator(operator);
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn styles(pairs: &[(&str, &str)]) -> SharedList<Style> {
        let mut list: SharedList<Style> = SharedList::new();
        for (key, arg) in pairs {
            list.push(Style::new(*key, *arg)).unwrap();
        }
        list
    }

    #[test]
    fn keys_round_trip() {
        for kind in StyleKind::ALL {
            assert_eq!(StyleKind::from_key(kind.key()), Some(kind));
            assert_eq!(kind.is_reserved(), handler(kind).is_none());
        }
        assert_eq!(StyleKind::from_key("opacity"), None);
    }

    #[test]
    fn aliases_share_handlers() {
        assert_eq!(
            handler(StyleKind::Color).unwrap() as usize,
            handler(StyleKind::Fill).unwrap() as usize
        );
        assert_eq!(
            handler(StyleKind::TextStrokeColor).unwrap() as usize,
            handler(StyleKind::Stroke).unwrap() as usize
        );
    }

    #[test]
    fn malformed_color_keeps_source() {
        let mut context = DrawContext::new(4, 4).unwrap();
        context.set_source(Color::WHITE);
        fill(&mut context, "#12");
        assert_eq!(context.source(), Color::WHITE);

        fill(&mut context, "#cc000080");
        assert_eq!(context.source(), Color::rgba(0xcc, 0, 0, 0x80));
    }

    #[test]
    fn weight_is_in_device_pixels() {
        let mut context = DrawContext::new(4, 4).unwrap();
        context.scale(4.0, -4.0);
        weight(&mut context, "2");
        assert_abs_diff_eq!(context.line_width().unwrap(), 0.5);

        weight(&mut context, "thick");
        assert_abs_diff_eq!(context.line_width().unwrap(), 0.5);
    }

    #[test]
    fn letter_spacing_reads_leading_number() {
        let mut context = DrawContext::new(4, 4).unwrap();
        assert_eq!(context.letter_spacing(), 0.0);

        letter_spacing(&mut context, "3");
        assert_abs_diff_eq!(context.letter_spacing(), 3.0);
        letter_spacing(&mut context, "1.5");
        assert_abs_diff_eq!(context.letter_spacing(), 1.5);
        letter_spacing(&mut context, " 2px");
        assert_abs_diff_eq!(context.letter_spacing(), 2.0);
        letter_spacing(&mut context, "-1");
        assert_abs_diff_eq!(context.letter_spacing(), -1.0);

        letter_spacing(&mut context, "wide");
        assert_abs_diff_eq!(context.letter_spacing(), -1.0);
    }

    #[test]
    fn letter_spacing_through_registry() {
        let mut context = DrawContext::new(4, 4).unwrap();
        apply_styles(
            &mut context,
            &styles(&[("letter-spacing", "4")]),
            &[StyleKind::LetterSpacing],
        );
        assert_abs_diff_eq!(context.letter_spacing(), 4.0);
    }

    #[test]
    fn unknown_blend_falls_back_to_over() {
        let mut context = DrawContext::new(4, 4).unwrap();
        blend(&mut context, "multiply");
        assert_eq!(context.operator(), Operator::Multiply);
        blend(&mut context, "normal");
        assert_eq!(context.operator(), Operator::Over);
    }

    #[test]
    fn apply_follows_requested_order() {
        let mut context = DrawContext::new(4, 4).unwrap();
        let list = styles(&[
            ("fill", "#ff0000"),
            ("radius", "10"),
            ("weight", "3"),
            ("line-cap", "round"),
            ("fill", "#00ff00"),
        ]);

        apply_styles(
            &mut context,
            &list,
            &[StyleKind::LineCap, StyleKind::Radius, StyleKind::Fill],
        );

        assert_eq!(context.line_cap(), LineCap::Round);
        assert_eq!(context.source(), Color::rgba(255, 0, 0, 255));
        // Not requested.
        assert_eq!(context.line_width(), None);
    }

    #[test]
    fn missing_styles_are_skipped() {
        let mut context = DrawContext::new(4, 4).unwrap();
        apply_styles(
            &mut context,
            &styles(&[]),
            &[StyleKind::Blend, StyleKind::Stroke],
        );
        assert_eq!(context.operator(), Operator::Over);
        assert_eq!(context.source(), Color::BLACK);
    }

    #[test]
    fn shared_style_survives_one_owner() {
        let style = Rc::new(Style::new("fill", "#000000"));

        let mut first: SharedList<Style> = SharedList::new();
        first.push(style.clone()).unwrap();
        let mut second: SharedList<Style> = SharedList::new();
        second.push(style.clone()).unwrap();
        assert_eq!(Rc::strong_count(&style), 3);

        drop(first);
        assert_eq!(Rc::strong_count(&style), 2);
        assert_eq!(second.head().unwrap().arg(), "#000000");

        let weak = Rc::downgrade(&style);
        drop(style);
        drop(second);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn user_data() {
        let style = Style::new("fill", "#000000");
        assert!(style.user_data().is_none());

        let data: Rc<dyn Any> = Rc::new(42_u32);
        style.set_user_data(data.clone());
        assert!(Rc::ptr_eq(&style.user_data().unwrap(), &data));
    }
}
