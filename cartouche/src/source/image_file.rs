use std::path::{Path, PathBuf};

use cartouche_types::{Bounds, SpatialReference};
use image::RgbaImage;

use super::{RasterSource, SourceError};

/// Image file georeferenced by an ESRI world file.
///
/// The world file sits next to the image and has the same stem. Its extension is made of the
/// first and last letters of the image extension followed by `w` (`.pgw` for `.png`, `.tfw`
/// for `.tif`), the image extension followed by `w` (`.tifw`), or `.wld`.
///
/// World files carry no spatial reference. The extent is taken to be in the map's spatial
/// reference unless one is set with [`ImageFileSource::with_srs`].
#[derive(Debug, Clone)]
pub struct ImageFileSource {
    image: RgbaImage,
    extent: Bounds,
    srs: Option<SpatialReference>,
}

impl ImageFileSource {
    /// Creates a source from decoded pixels covering the given extent.
    pub fn new(image: RgbaImage, extent: Bounds) -> Self {
        Self {
            image,
            extent,
            srs: None,
        }
    }

    /// Sets the spatial reference of the extent.
    pub fn with_srs(mut self, srs: SpatialReference) -> Self {
        self.srs = Some(srs);
        self
    }

    /// Decodes the image file and reads its world file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let world_file = find_world_file(path).ok_or_else(|| SourceError::WorldFile {
            path: path.to_path_buf(),
            reason: "no world file found".into(),
        })?;
        let world = std::fs::read_to_string(&world_file)
            .map_err(|err| SourceError::io(&world_file, err))?;

        let image = image::open(path)
            .map_err(|source| SourceError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();

        let extent = parse_world_file(&world, image.width(), image.height()).map_err(|reason| {
            SourceError::WorldFile {
                path: path.to_path_buf(),
                reason,
            }
        })?;

        log::debug!(
            "Opened {}x{} raster '{}' covering {extent:?}",
            image.width(),
            image.height(),
            path.display()
        );

        Ok(Self::new(image, extent))
    }
}

impl RasterSource for ImageFileSource {
    fn extent(&self) -> Bounds {
        self.extent
    }

    fn srs(&self) -> Option<&SpatialReference> {
        self.srs.as_ref()
    }

    fn image(&self) -> &RgbaImage {
        &self.image
    }
}

fn find_world_file(path: &Path) -> Option<PathBuf> {
    let extension = path.extension()?.to_str()?;
    let mut candidates = vec![format!("{extension}w"), "wld".to_string()];
    if let (Some(first), Some(last)) = (extension.chars().next(), extension.chars().last()) {
        candidates.insert(0, format!("{first}{last}w"));
    }

    candidates
        .into_iter()
        .flat_map(|candidate| [candidate.to_ascii_lowercase(), candidate.to_ascii_uppercase()])
        .map(|candidate| path.with_extension(candidate))
        .find(|candidate| candidate.is_file())
}

/// Computes the extent of a `width` x `height` image from the six world file parameters:
/// pixel width, two rotation terms, pixel height (negative for north-up images) and the
/// center of the upper-left pixel.
fn parse_world_file(world: &str, width: u32, height: u32) -> Result<Bounds, String> {
    let values = world
        .split_whitespace()
        .map(|token| token.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| err.to_string())?;

    let [pixel_width, rotation_y, rotation_x, pixel_height, center_x, center_y] = values[..]
    else {
        return Err(format!("expected 6 parameters, got {}", values.len()));
    };

    if rotation_x != 0.0 || rotation_y != 0.0 {
        return Err("rotated rasters are not supported".into());
    }
    if pixel_width == 0.0 || pixel_height == 0.0 {
        return Err("pixel size cannot be zero".into());
    }

    let left = center_x - pixel_width / 2.0;
    let top = center_y - pixel_height / 2.0;
    let right = left + pixel_width * width as f64;
    let bottom = top + pixel_height * height as f64;

    Ok(Bounds::from_corners(left, top, right, bottom))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn world_file_extent() {
        let extent = parse_world_file("2.0\n0\n0\n-2.0\n101.0\n199.0\n", 10, 5).unwrap();
        assert_abs_diff_eq!(extent.nw().x, 100.0);
        assert_abs_diff_eq!(extent.nw().y, 200.0);
        assert_abs_diff_eq!(extent.se().x, 120.0);
        assert_abs_diff_eq!(extent.se().y, 190.0);
    }

    #[test]
    fn invalid_world_files() {
        assert!(parse_world_file("1 0 0 -1 0", 1, 1).is_err());
        assert!(parse_world_file("1 0.5 0 -1 0 0", 1, 1).is_err());
        assert!(parse_world_file("1 0 0 x 0 0", 1, 1).is_err());
        assert!(parse_world_file("0 0 0 -1 0 0", 1, 1).is_err());
    }

    #[test]
    fn open_png_with_world_file() {
        let dir = std::env::temp_dir().join("cartouche-image-file-source");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("checker.png");

        let image = RgbaImage::from_fn(4, 2, |x, _| {
            if x % 2 == 0 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        });
        image.save(&path).unwrap();
        std::fs::write(dir.join("checker.pgw"), "0.5\n0\n0\n-0.5\n10.25\n20.75\n").unwrap();

        let source = ImageFileSource::open(&path).unwrap();
        assert_eq!(source.image().dimensions(), (4, 2));
        assert_abs_diff_eq!(source.extent().nw().x, 10.0);
        assert_abs_diff_eq!(source.extent().nw().y, 21.0);
        assert_abs_diff_eq!(source.extent().width(), 2.0);
        assert_abs_diff_eq!(source.extent().height(), 1.0);
    }

    #[test]
    fn missing_world_file() {
        assert_matches!(
            ImageFileSource::open("/nonexistent/image.png"),
            Err(SourceError::WorldFile { .. })
        );
    }
}
