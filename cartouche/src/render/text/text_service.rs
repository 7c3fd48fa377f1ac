//! Process-wide access to text shaping.

use std::sync::OnceLock;

use parking_lot::RwLock;
use rustybuzz::ttf_parser::FaceParsingError;
use thiserror::Error;

use super::{FontProvider, FontdbFontProvider, RustybuzzShaper, ShapedText, TextLayout, TextShaper};

static INSTANCE: OnceLock<TextService> = OnceLock::new();

/// Error from a font service
#[derive(Debug, Error)]
pub enum FontServiceError {
    /// Error parsing font face file
    #[error(transparent)]
    FaceParsingError(#[from] FaceParsingError),

    /// No loaded font matches the requested family
    #[error("no font found for family '{0}'")]
    FontNotFound(String),
}

/// Provides common access to the text shaping engine and the loaded fonts.
pub struct TextService {
    shaper: Box<dyn TextShaper + Send + Sync>,
    provider: RwLock<Box<dyn FontProvider + Send + Sync>>,
}

impl TextService {
    /// Initializes the service with the given shaper and font provider. Must be called before
    /// the first label is drawn, otherwise the call is ignored.
    pub fn initialize(
        shaper: impl TextShaper + Send + Sync + 'static,
        provider: impl FontProvider + Send + Sync + 'static,
    ) {
        if INSTANCE.get().is_some() {
            log::warn!(
                "Text service is already initialized. Second initialization call is ignored."
            );
            return;
        }

        INSTANCE.get_or_init(|| Self::new(Box::new(shaper), Box::new(provider)));
    }

    /// Returns the service, initializing it with `rustybuzz` and the system fonts on the first
    /// call.
    pub fn instance() -> &'static Self {
        INSTANCE.get_or_init(|| {
            log::debug!("Initializing text service with system fonts");
            Self::new(
                Box::new(RustybuzzShaper),
                Box::new(FontdbFontProvider::with_system_fonts()),
            )
        })
    }

    fn new(
        shaper: Box<dyn TextShaper + Send + Sync>,
        provider: Box<dyn FontProvider + Send + Sync>,
    ) -> Self {
        Self {
            shaper,
            provider: RwLock::new(provider),
        }
    }

    /// Shapes the text.
    pub fn shape(&self, layout: &TextLayout) -> Result<ShapedText, FontServiceError> {
        let provider = self.provider.read();
        self.shaper.shape(layout, provider.as_ref())
    }

    /// Loads a font file (TTF, OTF or a collection) from binary data.
    pub fn load_fonts(&self, fonts_data: Vec<u8>) {
        self.provider.write().load_font_data(fonts_data);
    }
}
