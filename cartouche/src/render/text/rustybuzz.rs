use rustybuzz::ttf_parser::{self, GlyphId, OutlineBuilder};
use rustybuzz::UnicodeBuffer;
use tiny_skia::{PathBuilder, Transform};

use super::font_provider::FontProvider;
use super::text_service::FontServiceError;
use super::{ShapedText, TextLayout, TextShaper};

/// Text shaper that uses `rustybuzz` crate to shape text and `ttf-parser` to outline glyphs.
#[derive(Debug, Default, Copy, Clone)]
pub struct RustybuzzShaper;

impl TextShaper for RustybuzzShaper {
    fn shape(
        &self,
        layout: &TextLayout,
        font_provider: &dyn FontProvider,
    ) -> Result<ShapedText, FontServiceError> {
        if layout.text.is_empty() {
            return Ok(ShapedText {
                path: None,
                width: 0.0,
                height: 0.0,
            });
        }

        let Some((font_data, index)) = font_provider.find_best_match(&layout.font.family) else {
            return Err(FontServiceError::FontNotFound(layout.font.family.clone()));
        };

        let face = ttf_parser::Face::parse(&font_data, index)?;
        let face = rustybuzz::Face::from_face(face);

        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(&layout.text);
        buffer.guess_segment_properties();
        let glyph_buffer = rustybuzz::shape(&face, &[], buffer);

        let scale = layout.font.size / face.units_per_em() as f32;
        let mut builder = GlyphPathBuilder::new();
        let mut advance_x = 0.0;

        for (position, info) in glyph_buffer
            .glyph_positions()
            .iter()
            .zip(glyph_buffer.glyph_infos())
        {
            let x = (position.x_offset as f32 * scale + advance_x).round();
            let y = -(position.y_offset as f32 * scale).round();

            // Glyph outlines are y-up in font units.
            builder.transform = Transform::from_row(scale, 0.0, 0.0, -scale, x, y);
            face.outline_glyph(GlyphId(info.glyph_id as u16), &mut builder);

            advance_x += position.x_advance as f32 * scale + layout.letter_spacing;
        }

        let width = (advance_x - layout.letter_spacing).max(0.0);
        let height = face.ascender() as f32 * scale;

        Ok(ShapedText {
            path: builder.inner.finish(),
            width,
            height,
        })
    }
}

struct GlyphPathBuilder {
    inner: PathBuilder,
    transform: Transform,
}

impl GlyphPathBuilder {
    fn new() -> Self {
        Self {
            inner: PathBuilder::new(),
            transform: Transform::identity(),
        }
    }

    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        let t = self.transform;
        (t.sx * x + t.kx * y + t.tx, t.ky * x + t.sy * y + t.ty)
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.inner.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.inner.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.inner.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.inner.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;

    use super::*;
    use crate::render::text::{FontSpec, FontdbFontProvider};

    struct NoFonts;

    impl FontProvider for NoFonts {
        fn find_best_match(&self, _family: &str) -> Option<(Arc<Vec<u8>>, u32)> {
            None
        }

        fn load_font_data(&self, _font_data: Vec<u8>) {}
    }

    struct BrokenFont;

    impl FontProvider for BrokenFont {
        fn find_best_match(&self, _family: &str) -> Option<(Arc<Vec<u8>>, u32)> {
            Some((Arc::new(vec![0, 1, 2, 3]), 0))
        }

        fn load_font_data(&self, _font_data: Vec<u8>) {}
    }

    fn tuffy() -> FontdbFontProvider {
        let provider = FontdbFontProvider::new();
        provider.load_font_data(include_bytes!("../../../tests/data/fonts/Tuffy.ttf").to_vec());
        provider
    }

    #[test]
    fn shapes_with_loaded_font() {
        let font = FontSpec::parse("Tuffy 20");
        let shaped = RustybuzzShaper
            .shape(&TextLayout::new("Oslo", font), &tuffy())
            .unwrap();

        assert!(shaped.path.is_some());
        assert!(shaped.width > 20.0, "{}", shaped.width);
        assert!(shaped.height > 0.0 && shaped.height <= 20.0, "{}", shaped.height);
    }

    #[test]
    fn letter_spacing_widens_text() {
        let provider = tuffy();
        let font = FontSpec::parse("Tuffy 20");
        let plain = RustybuzzShaper
            .shape(&TextLayout::new("Oslo", font.clone()), &provider)
            .unwrap();
        let spaced = RustybuzzShaper
            .shape(
                &TextLayout::new("Oslo", font).with_letter_spacing(3.0),
                &provider,
            )
            .unwrap();

        // No spacing after the last glyph.
        assert_abs_diff_eq!(spaced.width, plain.width + 3.0 * 3.0, epsilon = 1e-3);
        assert_abs_diff_eq!(spaced.height, plain.height);
    }

    #[test]
    fn empty_text_has_no_outline() {
        let shaped = RustybuzzShaper
            .shape(&TextLayout::new("", FontSpec::default()), &NoFonts)
            .unwrap();
        assert!(shaped.path.is_none());
        assert_eq!(shaped.width, 0.0);
    }

    #[test]
    fn missing_font() {
        let result = RustybuzzShaper.shape(&TextLayout::new("Oslo", FontSpec::default()), &NoFonts);
        assert_matches!(result, Err(FontServiceError::FontNotFound(family)) if family == "sans-serif");
    }

    #[test]
    fn broken_font() {
        let result =
            RustybuzzShaper.shape(&TextLayout::new("Oslo", FontSpec::default()), &BrokenFont);
        assert_matches!(result, Err(FontServiceError::FaceParsingError(_)));
    }
}
