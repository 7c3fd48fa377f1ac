//! Text layout for map labels.

use tiny_skia::Path;

mod font_provider;
mod rustybuzz;
mod text_service;

pub use font_provider::{FontProvider, FontdbFontProvider};
pub use rustybuzz::RustybuzzShaper;
pub use text_service::{FontServiceError, TextService};

/// Font used for labels when a rule has no `font` style.
pub const DEFAULT_FONT: &str = "sans-serif 10";

/// Font family and size parsed from a `"<family> <size>"` description.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    /// Family name or one of the generic families (`sans-serif`, `serif`, `monospace`).
    pub family: String,
    /// Size of the font in pixels.
    pub size: f32,
}

impl FontSpec {
    /// Parses a font description. The last whitespace-separated token is the size if it is a
    /// positive number, everything before it is the family name. A missing size gives 10px, a
    /// missing family gives `sans-serif`.
    pub fn parse(description: &str) -> Self {
        let description = description.trim();
        let (family, size) = match description.rsplit_once(char::is_whitespace) {
            Some((family, size)) => match size.parse::<f32>() {
                Ok(size) if size > 0.0 => (family.trim(), size),
                _ => (description, 10.0),
            },
            None => match description.parse::<f32>() {
                Ok(size) if size > 0.0 => ("", size),
                _ => (description, 10.0),
            },
        };

        let family = if family.is_empty() {
            "sans-serif"
        } else {
            family
        };

        Self {
            family: family.to_string(),
            size,
        }
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::parse(DEFAULT_FONT)
    }
}

/// A single line of text with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    /// Text to lay out.
    pub text: String,
    /// Font of the text.
    pub font: FontSpec,
    /// Extra space added after every glyph, in pixels.
    pub letter_spacing: f32,
}

impl TextLayout {
    /// Creates a layout with no letter spacing.
    pub fn new(text: impl Into<String>, font: FontSpec) -> Self {
        Self {
            text: text.into(),
            font,
            letter_spacing: 0.0,
        }
    }

    /// Sets the letter spacing attribute.
    pub fn with_letter_spacing(mut self, letter_spacing: f32) -> Self {
        self.letter_spacing = letter_spacing;
        self
    }
}

/// Outline of laid out text in pixels.
///
/// The origin is the left end of the baseline, y grows downwards.
#[derive(Debug, Clone)]
pub struct ShapedText {
    /// Glyph outlines. `None` if the text has no visible glyphs.
    pub path: Option<Path>,
    /// Horizontal advance of the whole text.
    pub width: f32,
    /// Height of the text above the baseline.
    pub height: f32,
}

/// Turns text into glyph outlines.
pub trait TextShaper {
    /// Shapes the text with a font selected from the given provider.
    fn shape(
        &self,
        layout: &TextLayout,
        font_provider: &dyn FontProvider,
    ) -> Result<ShapedText, FontServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_font_spec() {
        assert_eq!(
            FontSpec::parse("DejaVu Sans 12"),
            FontSpec {
                family: "DejaVu Sans".into(),
                size: 12.0
            }
        );
        assert_eq!(FontSpec::parse("serif").size, 10.0);
        assert_eq!(FontSpec::parse("serif").family, "serif");
        assert_eq!(FontSpec::parse("14").family, "sans-serif");
        assert_eq!(FontSpec::parse("Noto Sans -3").family, "Noto Sans -3");
        assert_eq!(FontSpec::default().family, "sans-serif");
        assert_eq!(FontSpec::default().size, 10.0);
    }
}
