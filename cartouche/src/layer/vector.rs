use cartouche_types::projection::Transformation;
use cartouche_types::Point2;
use geo_types::{Coord, Geometry, LineString, Polygon};

use super::{apply_seamless, MapFrame};
use crate::error::CartoucheError;
use crate::render::DrawContext;
use crate::rule::Rule;
use crate::source::FeatureSource;
use crate::style::{apply_styles, Style, StyleKind};
use crate::SharedList;

const POLYGON_STYLES: &[StyleKind] = &[
    StyleKind::Blend,
    StyleKind::LineCap,
    StyleKind::LineJoin,
    StyleKind::Weight,
    StyleKind::Fill,
    StyleKind::Stroke,
];

const LINE_STYLES: &[StyleKind] = &[
    StyleKind::Blend,
    StyleKind::LineCap,
    StyleKind::LineJoin,
    StyleKind::Weight,
    StyleKind::Stroke,
];

const POINT_STYLES: &[StyleKind] = &[
    StyleKind::Blend,
    StyleKind::Weight,
    StyleKind::Fill,
    StyleKind::Stroke,
];

/// Radius of point markers, in pixels, when a rule has no `radius` style.
const DEFAULT_POINT_RADIUS: f64 = 2.0;

pub(super) fn draw(
    source: &dyn FeatureSource,
    rules: &SharedList<Rule>,
    context: &mut DrawContext,
    frame: &MapFrame<'_>,
) -> Result<(), CartoucheError> {
    let transformation = source.srs().transformation_to(frame.srs)?;

    for rule in rules {
        let features = source.query(rule.filter())?;
        log::debug!(
            "Rule '{}' selected {} features from '{}'",
            rule.filter(),
            features.len(),
            source.name()
        );

        context.save();
        apply_seamless(context, rule);

        let styles = rule.styles();
        let radius = rule
            .style_arg(StyleKind::Radius)
            .and_then(|arg| arg.trim().parse::<f64>().ok())
            .unwrap_or(DEFAULT_POINT_RADIUS);

        let mut painter = FeaturePainter {
            context: &mut *context,
            styles: &styles,
            transformation: &transformation,
            radius,
            skipped: 0,
        };
        for feature in &features {
            painter.draw_geometry(&feature.geometry);
        }

        if painter.skipped > 0 {
            log::warn!(
                "{} vertices of '{}' could not be projected into the map srs",
                painter.skipped,
                source.name()
            );
        }

        if let Some(field) = rule.style_arg(StyleKind::TextField) {
            labels::draw(context, rule, &styles, &features, &field, &transformation);
        }

        context.restore();
    }

    Ok(())
}

struct FeaturePainter<'a> {
    context: &'a mut DrawContext,
    styles: &'a SharedList<Style>,
    transformation: &'a Transformation,
    radius: f64,
    skipped: usize,
}

impl FeaturePainter<'_> {
    fn draw_geometry(&mut self, geometry: &Geometry<f64>) {
        match geometry {
            Geometry::Point(point) => self.draw_point(point.0),
            Geometry::MultiPoint(points) => {
                for point in points {
                    self.draw_point(point.0);
                }
            }
            Geometry::Line(line) => self.draw_lines([&LineString::from(*line)]),
            Geometry::LineString(line) => self.draw_lines([line]),
            Geometry::MultiLineString(lines) => self.draw_lines(lines),
            Geometry::Polygon(polygon) => self.draw_polygons([polygon]),
            Geometry::MultiPolygon(polygons) => self.draw_polygons(polygons),
            Geometry::Rect(rect) => self.draw_polygons([&rect.to_polygon()]),
            Geometry::Triangle(triangle) => self.draw_polygons([&triangle.to_polygon()]),
            Geometry::GeometryCollection(collection) => {
                for geometry in collection {
                    self.draw_geometry(geometry);
                }
            }
        }
    }

    fn draw_point(&mut self, coord: Coord<f64>) {
        let Some(point) = self.project(coord) else {
            return;
        };

        let radius = self.context.device_to_user_distance(self.radius, 0.0).norm();
        self.context.new_path();
        self.context.circle(point.x, point.y, radius);
        apply_styles(self.context, self.styles, POINT_STYLES);
        self.context.new_path();
    }

    fn draw_lines<'g>(&mut self, lines: impl IntoIterator<Item = &'g LineString<f64>>) {
        self.context.new_path();
        for line in lines {
            self.add_line(line, false);
        }
        apply_styles(self.context, self.styles, LINE_STYLES);
        self.context.new_path();
    }

    fn draw_polygons<'g>(&mut self, polygons: impl IntoIterator<Item = &'g Polygon<f64>>) {
        self.context.new_path();
        for polygon in polygons {
            self.add_line(polygon.exterior(), true);
            for interior in polygon.interiors() {
                self.add_line(interior, true);
            }
        }
        apply_styles(self.context, self.styles, POLYGON_STYLES);
        self.context.new_path();
    }

    fn add_line(&mut self, line: &LineString<f64>, close: bool) {
        let mut started = false;
        for coord in line.coords() {
            let Some(point) = self.project(*coord) else {
                continue;
            };

            if started {
                self.context.line_to(point.x, point.y);
            } else {
                self.context.move_to(point.x, point.y);
                started = true;
            }
        }

        if started && close {
            self.context.close_path();
        }
    }

    fn project(&mut self, coord: Coord<f64>) -> Option<Point2> {
        let projected = self.transformation.transform(&Point2::new(coord.x, coord.y));
        if projected.is_none() {
            self.skipped += 1;
        }
        projected
    }
}

#[cfg(feature = "labels")]
mod labels {
    use cartouche_types::projection::Transformation;
    use cartouche_types::Point2;
    use geo::Centroid;

    use crate::render::text::{FontSpec, TextLayout, TextService, DEFAULT_FONT};
    use crate::render::DrawContext;
    use crate::rule::Rule;
    use crate::source::Feature;
    use crate::style::{apply_styles, Style, StyleKind};
    use crate::SharedList;

    const LABEL_STYLES: &[StyleKind] = &[
        StyleKind::Blend,
        StyleKind::TextStrokeWeight,
        StyleKind::TextStrokeColor,
        StyleKind::Color,
    ];

    /// Prints the `field` attribute of every feature at the centroid of its geometry.
    pub(super) fn draw(
        context: &mut DrawContext,
        rule: &Rule,
        styles: &SharedList<Style>,
        features: &[Feature],
        field: &str,
        transformation: &Transformation,
    ) {
        let font = FontSpec::parse(
            rule.style_arg(StyleKind::Font)
                .as_deref()
                .unwrap_or(DEFAULT_FONT),
        );
        apply_styles(context, styles, &[StyleKind::LetterSpacing]);
        let letter_spacing = context.letter_spacing() as f32;
        let service = TextService::instance();

        for feature in features {
            let Some(text) = feature.property_string(field) else {
                continue;
            };
            let Some(centroid) = feature.geometry.centroid() else {
                continue;
            };
            let Some(anchor) = transformation.transform(&Point2::new(centroid.x(), centroid.y()))
            else {
                continue;
            };

            let layout = TextLayout::new(text, font.clone()).with_letter_spacing(letter_spacing);
            let shaped = match service.shape(&layout) {
                Ok(shaped) => shaped,
                Err(err) => {
                    log::warn!("Skipping label '{}': {err}", layout.text);
                    continue;
                }
            };
            let Some(path) = shaped.path else {
                continue;
            };

            let anchor = context.user_to_device(anchor.x, anchor.y);
            context.new_path();
            context.append_device_path(
                &path,
                (anchor.x as f32 - shaped.width / 2.0).round(),
                (anchor.y as f32 + shaped.height / 2.0).round(),
            );
            apply_styles(context, styles, LABEL_STYLES);
            context.new_path();
        }
    }
}

#[cfg(not(feature = "labels"))]
mod labels {
    use cartouche_types::projection::Transformation;

    use crate::render::DrawContext;
    use crate::rule::Rule;
    use crate::source::Feature;
    use crate::style::Style;
    use crate::SharedList;

    pub(super) fn draw(
        _context: &mut DrawContext,
        rule: &Rule,
        _styles: &SharedList<Style>,
        features: &[Feature],
        _field: &str,
        _transformation: &Transformation,
    ) {
        if !features.is_empty() {
            log::warn!(
                "Rule '{}' has labels, but the crate is built without the `labels` feature",
                rule.filter()
            );
        }
    }
}
