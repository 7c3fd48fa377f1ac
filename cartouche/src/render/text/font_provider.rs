use std::sync::Arc;

use fontdb::{Database, Family, Query};
use parking_lot::Mutex;

/// Source of font faces.
pub trait FontProvider {
    /// Finds the face best matching the family. Returns the font file data and the index of the
    /// face in it.
    fn find_best_match(&self, family: &str) -> Option<(Arc<Vec<u8>>, u32)>;

    /// Adds fonts from binary data.
    fn load_font_data(&self, font_data: Vec<u8>);
}

/// Font provider backed by a `fontdb` database.
pub struct FontdbFontProvider {
    db: Mutex<Database>,
}

impl FontdbFontProvider {
    /// Creates a provider without any fonts.
    pub fn new() -> Self {
        Self {
            db: Mutex::new(Database::new()),
        }
    }

    /// Creates a provider with the fonts installed in the system.
    pub fn with_system_fonts() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        log::debug!("Loaded {} system font faces", db.len());

        Self { db: Mutex::new(db) }
    }
}

impl Default for FontdbFontProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FontProvider for FontdbFontProvider {
    fn find_best_match(&self, family: &str) -> Option<(Arc<Vec<u8>>, u32)> {
        let family = match family.to_ascii_lowercase().as_str() {
            "sans" | "sans-serif" => Family::SansSerif,
            "serif" => Family::Serif,
            "mono" | "monospace" => Family::Monospace,
            _ => Family::Name(family),
        };
        let families = [family, Family::SansSerif];
        let query = Query {
            families: &families,
            ..Default::default()
        };

        let db = self.db.lock();
        let id = db.query(&query)?;
        db.with_face_data(id, |data, index| (Arc::new(data.to_vec()), index))
    }

    fn load_font_data(&self, font_data: Vec<u8>) {
        self.db.lock().load_font_data(font_data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_database_has_no_match() {
        let provider = FontdbFontProvider::new();
        assert!(provider.find_best_match("sans-serif").is_none());
        assert!(provider.find_best_match("Some Font").is_none());
    }

    #[test]
    fn finds_loaded_font_by_name() {
        let provider = FontdbFontProvider::new();
        provider.load_font_data(include_bytes!("../../../tests/data/fonts/Tuffy.ttf").to_vec());

        let (data, index) = provider.find_best_match("Tuffy").unwrap();
        assert!(!data.is_empty());
        assert_eq!(index, 0);
    }
}
