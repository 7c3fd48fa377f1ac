use cartouche_types::projection::Transformation;
use cartouche_types::{Bounds, Point2};
use image::RgbaImage;
use nalgebra::Vector2;
use tiny_skia::{ColorU8, Pixmap};

use super::{apply_seamless, MapFrame, ResampleKernel};
use crate::error::CartoucheError;
use crate::render::DrawContext;
use crate::rule::Rule;
use crate::source::RasterSource;
use crate::style::{apply_styles, StyleKind};
use crate::SharedList;

const RASTER_STYLES: &[StyleKind] = &[StyleKind::Blend];

/// Kernels stop widening past this many source pixels per device pixel.
const MAX_KERNEL_SCALE: f64 = 4.0;

pub(super) fn draw(
    source: &dyn RasterSource,
    rules: &SharedList<Rule>,
    resample: ResampleKernel,
    context: &mut DrawContext,
    frame: &MapFrame<'_>,
) -> Result<(), CartoucheError> {
    let Some(placed) = warp(source, resample, context, frame)? else {
        log::debug!("Raster layer is outside of the map bounds");
        return Ok(());
    };

    if rules.is_empty() {
        context.draw_image(placed.image.as_ref(), placed.x, placed.y);
        return Ok(());
    }

    for rule in rules {
        context.save();
        apply_seamless(context, rule);
        apply_styles(context, &rule.styles(), RASTER_STYLES);
        context.draw_image(placed.image.as_ref(), placed.x, placed.y);
        context.restore();
    }

    Ok(())
}

struct PlacedImage {
    image: Pixmap,
    x: i32,
    y: i32,
}

/// Device pixels of the surface, with the user space position of their centers.
struct DeviceGrid {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    origin: Point2,
    step_x: Vector2<f64>,
    step_y: Vector2<f64>,
}

impl DeviceGrid {
    fn center(&self, column: u32, row: u32) -> Point2 {
        self.origin
            + self.step_x * (self.x + column) as f64
            + self.step_y * (self.y + row) as f64
    }
}

/// Samples the image into the device pixels it covers. Only pixels of the surface are sampled,
/// so the result is never larger than the surface.
fn warp(
    source: &dyn RasterSource,
    resample: ResampleKernel,
    context: &DrawContext,
    frame: &MapFrame<'_>,
) -> Result<Option<PlacedImage>, CartoucheError> {
    let image = source.image();
    if image.width() == 0 || image.height() == 0 {
        return Ok(None);
    }

    let transformation = match source.srs() {
        Some(srs) => frame.srs.transformation_to(srs)?,
        None => Transformation::identity(),
    };

    let Some(grid) = device_grid(source.extent(), &transformation, context, frame) else {
        return Ok(None);
    };

    let sampler = Sampler::new(image, source.extent(), resample);
    let scale = sampler.kernel_scale(&grid, &transformation);

    let (width, height) = (grid.width, grid.height);
    let mut pixmap = Pixmap::new(width, height).ok_or(CartoucheError::Surface { width, height })?;
    let mut unprojected = 0usize;
    for (index, target) in pixmap.pixels_mut().iter_mut().enumerate() {
        let column = index as u32 % width;
        let row = index as u32 / width;
        let Some(point) = transformation.transform(&grid.center(column, row)) else {
            unprojected += 1;
            continue;
        };

        if let Some(color) = sampler.sample(&point, scale) {
            *target = color.premultiply();
        }
    }

    if unprojected > 0 {
        log::debug!("{unprojected} raster pixels could not be projected into the image srs");
    }
    log::debug!(
        "Sampled {}x{} raster into {width}x{height} device pixels with {resample:?}",
        image.width(),
        image.height()
    );

    Ok(Some(PlacedImage {
        image: pixmap,
        x: grid.x as i32,
        y: grid.y as i32,
    }))
}

/// Part of the surface the image can cover. Warped images are sampled over the whole surface.
fn device_grid(
    extent: Bounds,
    transformation: &Transformation,
    context: &DrawContext,
    frame: &MapFrame<'_>,
) -> Option<DeviceGrid> {
    let (surface_width, surface_height) = (context.width(), context.height());
    let (x, y, right, bottom) = if transformation.is_identity() {
        let visible = extent.intersection(&frame.bounds)?;
        let nw = context.user_to_device(visible.nw().x, visible.nw().y);
        let se = context.user_to_device(visible.se().x, visible.se().y);

        let clip = |value: f64, limit: u32| value.clamp(0.0, limit as f64) as u32;
        (
            clip(nw.x.min(se.x).floor(), surface_width),
            clip(nw.y.min(se.y).floor(), surface_height),
            clip(nw.x.max(se.x).ceil(), surface_width),
            clip(nw.y.max(se.y).ceil(), surface_height),
        )
    } else {
        (0, 0, surface_width, surface_height)
    };

    if right <= x || bottom <= y {
        return None;
    }

    let origin = context.device_to_user(0.5, 0.5)?;
    let step_x = context.device_to_user(1.5, 0.5)? - origin;
    let step_y = context.device_to_user(0.5, 1.5)? - origin;

    Some(DeviceGrid {
        x,
        y,
        width: right - x,
        height: bottom - y,
        origin,
        step_x,
        step_y,
    })
}

struct Sampler<'a> {
    image: &'a RgbaImage,
    extent: Bounds,
    kernel: ResampleKernel,
    pixels_per_unit: Vector2<f64>,
}

impl<'a> Sampler<'a> {
    fn new(image: &'a RgbaImage, extent: Bounds, kernel: ResampleKernel) -> Self {
        Self {
            image,
            extent,
            kernel,
            pixels_per_unit: Vector2::new(
                image.width() as f64 / extent.width(),
                image.height() as f64 / extent.height(),
            ),
        }
    }

    /// Position of the point in source pixels.
    fn to_pixel(&self, point: &Point2) -> Vector2<f64> {
        Vector2::new(
            (point.x - self.extent.nw().x) * self.pixels_per_unit.x,
            (self.extent.nw().y - point.y) * self.pixels_per_unit.y,
        )
    }

    /// Source pixels per device pixel in the middle of the grid, clamped to
    /// `[1, MAX_KERNEL_SCALE]`.
    fn kernel_scale(&self, grid: &DeviceGrid, transformation: &Transformation) -> Vector2<f64> {
        let column = grid.width / 2;
        let row = grid.height / 2;
        let center = grid.center(column, row);

        let source_step = |step: Vector2<f64>| {
            let from = transformation.transform(&center)?;
            let to = transformation.transform(&(center + step))?;
            Some((self.to_pixel(&to) - self.to_pixel(&from)).abs())
        };

        let step_x = source_step(grid.step_x).map_or(1.0, |step| step.x.max(step.y));
        let step_y = source_step(grid.step_y).map_or(1.0, |step| step.x.max(step.y));
        let clamp = |value: f64| {
            if value.is_finite() {
                value.clamp(1.0, MAX_KERNEL_SCALE)
            } else {
                1.0
            }
        };

        Vector2::new(clamp(step_x), clamp(step_y))
    }

    /// Color of the image at the point. `None` outside of the image.
    fn sample(&self, point: &Point2, scale: Vector2<f64>) -> Option<ColorU8> {
        let position = self.to_pixel(point);
        let (width, height) = (self.image.width() as f64, self.image.height() as f64);
        if !(0.0..width).contains(&position.x) || !(0.0..height).contains(&position.y) {
            return None;
        }

        if self.kernel == ResampleKernel::Nearest {
            let [r, g, b, a] = self
                .image
                .get_pixel(position.x as u32, position.y as u32)
                .0;
            return Some(ColorU8::from_rgba(r, g, b, a));
        }

        // Pixel centers are at half-integer positions.
        let columns = self.taps(position.x - 0.5, scale.x, self.image.width());
        let rows = self.taps(position.y - 0.5, scale.y, self.image.height());

        let mut sum = [0.0; 4];
        let mut total = 0.0;
        for &(row, row_weight) in &rows {
            for &(column, column_weight) in &columns {
                let weight = row_weight * column_weight;
                let pixel = self.image.get_pixel(column, row).0;
                for (channel, value) in sum.iter_mut().zip(pixel) {
                    *channel += weight * value as f64;
                }
                total += weight;
            }
        }

        if total.abs() < f64::EPSILON {
            return None;
        }

        let [r, g, b, a] = sum.map(|value| (value / total).round().clamp(0.0, 255.0) as u8);
        Some(ColorU8::from_rgba(r, g, b, a))
    }

    /// Source pixels under the kernel centered at `center`, with their weights. Positions
    /// outside of the image repeat the edge pixels.
    fn taps(&self, center: f64, scale: f64, size: u32) -> Vec<(u32, f64)> {
        let radius = self.kernel.support() * scale;
        let first = (center - radius).ceil() as i64;
        let last = (center + radius).floor() as i64;

        (first..=last)
            .filter_map(|index| {
                let weight = self.kernel.weight((index as f64 - center) / scale);
                (weight != 0.0).then(|| (index.clamp(0, size as i64 - 1) as u32, weight))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use cartouche_types::{Bounds, SpatialReference};
    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::source::ImageFileSource;

    fn context_for(bounds: &Bounds, width: u32, height: u32) -> DrawContext {
        let mut context = DrawContext::new(width, height).unwrap();
        context.scale(
            width as f64 / bounds.width(),
            -(height as f64) / bounds.height(),
        );
        context.translate(-bounds.nw().x, -bounds.nw().y);
        context
    }

    fn halves() -> ImageFileSource {
        let image = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        ImageFileSource::new(image, Bounds::from_corners(0.0, 0.0, 2.0, 1.0))
    }

    fn pixel(context: &DrawContext, x: u32, y: u32) -> [u8; 4] {
        let pixel = context.pixmap().pixel(x, y).unwrap().demultiply();
        [pixel.red(), pixel.green(), pixel.blue(), pixel.alpha()]
    }

    #[test]
    fn draws_visible_window() {
        let srs = SpatialReference::wgs84();
        // Only the right (blue) half of the image is visible.
        let bounds = Bounds::from_corners(1.0, 0.0, 3.0, 1.0);
        let frame = MapFrame {
            srs: &srs,
            bounds,
        };
        let mut context = context_for(&bounds, 8, 4);

        draw(
            &halves(),
            &SharedList::new(),
            ResampleKernel::Nearest,
            &mut context,
            &frame,
        )
        .unwrap();

        assert_eq!(pixel(&context, 1, 1), [0, 0, 255, 255]);
        assert_eq!(pixel(&context, 3, 2), [0, 0, 255, 255]);
        assert_eq!(pixel(&context, 6, 1)[3], 0);
    }

    #[test]
    fn deep_zoom_samples_only_the_surface() {
        let image = RgbaImage::from_fn(4, 4, |x, _| {
            if x < 2 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let source = ImageFileSource::new(image, Bounds::from_corners(0.0, 0.0, 4.0, 4.0));

        let srs = SpatialReference::wgs84();
        // A single source pixel covers about a million times the surface.
        let bounds = Bounds::from_corners(1.0, 1.0, 1.001, 1.001);
        let frame = MapFrame {
            srs: &srs,
            bounds,
        };

        for kernel in [ResampleKernel::Nearest, ResampleKernel::Bilinear] {
            let mut context = context_for(&bounds, 256, 256);
            draw(&source, &SharedList::new(), kernel, &mut context, &frame).unwrap();

            assert_eq!(pixel(&context, 0, 0), [255, 0, 0, 255], "{kernel:?}");
            assert_eq!(pixel(&context, 255, 255), [255, 0, 0, 255], "{kernel:?}");
        }
    }

    #[test]
    fn geographic_image_on_mercator_map() {
        // Latitude bands of 40 degrees from 80N to 80S.
        let bands = [
            [255, 0, 0, 255],
            [0, 255, 0, 255],
            [0, 0, 255, 255],
            [255, 255, 255, 255],
        ];
        let image = RgbaImage::from_fn(1, 4, |_, y| Rgba(bands[y as usize]));
        let source = ImageFileSource::new(image, Bounds::from_corners(-180.0, -80.0, 180.0, 80.0))
            .with_srs(SpatialReference::wgs84());

        let srs = SpatialReference::web_mercator();
        let bounds = cartouche_types::TileIndex::new(0, 0, 0)
            .unwrap()
            .web_mercator_bounds();
        let frame = MapFrame {
            srs: &srs,
            bounds,
        };
        let mut context = context_for(&bounds, 256, 256);
        draw(
            &source,
            &SharedList::new(),
            ResampleKernel::Nearest,
            &mut context,
            &frame,
        )
        .unwrap();

        // 46.5N, 36N and 17.4S.
        assert_eq!(pixel(&context, 128, 90), bands[0]);
        assert_eq!(pixel(&context, 128, 100), bands[1]);
        assert_eq!(pixel(&context, 128, 140), bands[2]);
        // 83.8N is north of the image.
        assert_eq!(pixel(&context, 128, 10)[3], 0);
    }

    #[test]
    fn outside_of_bounds() {
        let srs = SpatialReference::wgs84();
        let bounds = Bounds::from_corners(10.0, 10.0, 20.0, 20.0);
        let frame = MapFrame {
            srs: &srs,
            bounds,
        };
        let mut context = context_for(&bounds, 4, 4);

        draw(
            &halves(),
            &SharedList::new(),
            ResampleKernel::Lanczos,
            &mut context,
            &frame,
        )
        .unwrap();
        assert_eq!(pixel(&context, 2, 2)[3], 0);
    }

    #[test]
    fn rules_set_operator() {
        let srs = SpatialReference::wgs84();
        let bounds = Bounds::from_corners(0.0, 0.0, 2.0, 1.0);
        let frame = MapFrame {
            srs: &srs,
            bounds,
        };
        let mut context = context_for(&bounds, 4, 2);
        context.set_source(crate::Color::WHITE);
        context.paint();
        assert_eq!(pixel(&context, 0, 0), [255, 255, 255, 255]);

        let mut rules: SharedList<Rule> = SharedList::new();
        let rule = rules.push(Rule::new("")).unwrap();
        rule.add_style("blend", "clear").unwrap();

        draw(
            &halves(),
            &rules,
            ResampleKernel::Bilinear,
            &mut context,
            &frame,
        )
        .unwrap();
        assert_eq!(pixel(&context, 0, 0)[3], 0);
        assert_eq!(pixel(&context, 3, 1)[3], 0);
    }
}
