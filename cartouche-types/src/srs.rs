use std::fmt::{Display, Formatter};

use crate::datum::Datum;
use crate::error::CartoucheTypesError;
use crate::projection::{
    AlbersEqualArea, AlbersParameters, GeodesyProjection, GeographicProjection, Projection,
    Transformation, WebMercator,
};

const WEB_SPHERE_RADIUS: f64 = 6_378_137.0;

/// PROJ parameters that carry no information for the projection backends.
const IGNORED_PARAMETERS: &[&str] = &[
    "no_defs", "type", "units", "towgs84", "nadgrids", "wktext", "over", "datum", "init",
];

/// Family of a spatial reference, which decides how coordinates are projected.
#[derive(Debug, Clone, PartialEq)]
pub enum SrsKind {
    /// Longitude/latitude in degrees.
    Geographic,
    /// Spherical mercator (EPSG:3857).
    WebMercator,
    /// Albers equal-area conic (`+proj=aea`).
    AlbersEqualArea(AlbersEqualArea),
    /// Any other projection, given as a geodesy operator definition.
    Geodesy(String),
}

/// Coordinate system of a map, created from user input: a PROJ string such as
/// `+proj=longlat +ellps=GRS80 +no_defs` or an authority code such as `EPSG:3857`.
///
/// The definition is validated when the reference is created: if no projection backend can
/// handle it, creation fails. The original input is kept and returned by
/// [`SpatialReference::definition`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialReference {
    definition: String,
    kind: SrsKind,
}

impl SpatialReference {
    /// WGS84 longitude/latitude.
    pub fn wgs84() -> Self {
        Self {
            definition: "+proj=longlat +datum=WGS84 +no_defs".to_string(),
            kind: SrsKind::Geographic,
        }
    }

    /// Spherical mercator used by web tile services.
    pub fn web_mercator() -> Self {
        Self {
            definition: "+proj=merc +a=6378137 +b=6378137 +lat_ts=0.0 +lon_0=0.0 +x_0=0.0 +y_0=0 +k=1.0 +units=m +nadgrids=@null +wktext +no_defs".to_string(),
            kind: SrsKind::WebMercator,
        }
    }

    /// Parses a spatial reference from a PROJ string or an `EPSG:<code>` identifier.
    pub fn from_user_input(input: &str) -> Result<Self, CartoucheTypesError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(CartoucheTypesError::InvalidSrs(input.to_string()));
        }

        let lowercase = trimmed.to_ascii_lowercase();
        let kind = match lowercase.strip_prefix("epsg:") {
            Some(code) => kind_from_epsg(input, code)?,
            None => kind_from_proj(input, &parse_proj(input)?)?,
        };

        if let SrsKind::Geodesy(definition) = &kind {
            GeodesyProjection::new(definition).map_err(|reason| {
                CartoucheTypesError::UnsupportedSrs {
                    definition: input.to_string(),
                    reason,
                }
            })?;
        }

        log::debug!("Parsed spatial reference '{input}' as {kind:?}");

        Ok(Self {
            definition: input.to_string(),
            kind,
        })
    }

    /// Definition as it was given by the user.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Projection family of the reference.
    pub fn kind(&self) -> &SrsKind {
        &self.kind
    }

    /// Returns true if coordinates are longitude/latitude degrees.
    pub fn is_geographic(&self) -> bool {
        self.kind == SrsKind::Geographic
    }

    /// Returns true if both references produce the same coordinates.
    pub fn is_same(&self, other: &SpatialReference) -> bool {
        self.kind == other.kind
    }

    /// Creates a projection from geographic coordinates into this reference.
    pub fn projection(&self) -> Result<Box<dyn Projection>, CartoucheTypesError> {
        Ok(match &self.kind {
            SrsKind::Geographic => Box::new(GeographicProjection),
            SrsKind::WebMercator => Box::new(WebMercator::new(Datum::WEB_SPHERE)),
            SrsKind::AlbersEqualArea(projection) => Box::new(*projection),
            SrsKind::Geodesy(definition) => Box::new(GeodesyProjection::new(definition).map_err(
                |reason| CartoucheTypesError::UnsupportedSrs {
                    definition: self.definition.clone(),
                    reason,
                },
            )?),
        })
    }

    /// Creates a transformation from coordinates of this reference into coordinates of
    /// `target`.
    pub fn transformation_to(
        &self,
        target: &SpatialReference,
    ) -> Result<Transformation, CartoucheTypesError> {
        if self.is_same(target) {
            return Ok(Transformation::identity());
        }

        Ok(Transformation::new(self.projection()?, target.projection()?))
    }
}

impl Display for SpatialReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.definition)
    }
}

type ProjParameters = Vec<(String, Option<String>)>;

fn parse_proj(input: &str) -> Result<ProjParameters, CartoucheTypesError> {
    let mut parameters = vec![];
    for token in input.split_whitespace() {
        let token = token.strip_prefix('+').unwrap_or(token);
        if token.is_empty() {
            continue;
        }

        let (key, value) = match token.split_once('=') {
            Some((key, value)) => (key, Some(value.to_string())),
            None => (token, None),
        };

        if key.is_empty() {
            return Err(CartoucheTypesError::InvalidSrs(input.to_string()));
        }

        parameters.push((key.to_ascii_lowercase(), value));
    }

    Ok(parameters)
}

fn parameter<'a>(parameters: &'a ProjParameters, key: &str) -> Option<&'a str> {
    parameters
        .iter()
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| v.as_deref())
}

fn kind_from_epsg(input: &str, code: &str) -> Result<SrsKind, CartoucheTypesError> {
    match code.trim() {
        "4326" => Ok(SrsKind::Geographic),
        "3857" | "3785" | "900913" => Ok(SrsKind::WebMercator),
        _ => Err(CartoucheTypesError::UnsupportedSrs {
            definition: input.to_string(),
            reason: format!("authority code EPSG:{code} is not known"),
        }),
    }
}

fn kind_from_proj(
    input: &str,
    parameters: &ProjParameters,
) -> Result<SrsKind, CartoucheTypesError> {
    if let Some(init) = parameter(parameters, "init") {
        if let Some(code) = init.to_ascii_lowercase().strip_prefix("epsg:") {
            return kind_from_epsg(input, code);
        }
    }

    let Some(proj) = parameter(parameters, "proj") else {
        return Err(CartoucheTypesError::InvalidSrs(input.to_string()));
    };

    match proj {
        "longlat" | "latlong" | "lonlat" | "latlon" => return Ok(SrsKind::Geographic),
        "webmerc" => return Ok(SrsKind::WebMercator),
        "merc" if is_web_sphere(parameters) => return Ok(SrsKind::WebMercator),
        "aea" => return albers_from_proj(input, parameters),
        _ => {}
    }

    let mut definition = proj.to_string();
    let has_ellipsoid = parameter(parameters, "ellps").is_some();
    for (key, value) in parameters {
        if key == "proj" || IGNORED_PARAMETERS.contains(&key.as_str()) {
            continue;
        }

        let key = match key.as_str() {
            "k" => "k_0",
            other => other,
        };

        match value {
            Some(value) => definition.push_str(&format!(" {key}={value}")),
            None => definition.push_str(&format!(" {key}")),
        }
    }

    if !has_ellipsoid {
        let ellipsoid = match parameter(parameters, "datum") {
            Some("NAD83") => Some("GRS80"),
            Some("WGS84") => Some("WGS84"),
            Some("NAD27") => Some("clrk66"),
            _ => None,
        };

        if let Some(ellipsoid) = ellipsoid {
            definition.push_str(&format!(" ellps={ellipsoid}"));
        }
    }

    Ok(SrsKind::Geodesy(definition))
}

fn albers_from_proj(
    input: &str,
    parameters: &ProjParameters,
) -> Result<SrsKind, CartoucheTypesError> {
    let number = |key: &str| -> Result<f64, CartoucheTypesError> {
        match parameter(parameters, key) {
            Some(value) => value
                .parse::<f64>()
                .map_err(|_| CartoucheTypesError::InvalidSrs(input.to_string())),
            None => Ok(0.0),
        }
    };

    let albers = AlbersParameters {
        lat_1: number("lat_1")?,
        lat_2: number("lat_2")?,
        lat_0: number("lat_0")?,
        lon_0: number("lon_0")?,
        x_0: number("x_0")?,
        y_0: number("y_0")?,
    };

    let unsupported = |reason: String| CartoucheTypesError::UnsupportedSrs {
        definition: input.to_string(),
        reason,
    };
    let datum = datum_from_proj(parameters).map_err(unsupported)?;
    let projection = AlbersEqualArea::new(datum, &albers).map_err(unsupported)?;

    Ok(SrsKind::AlbersEqualArea(projection))
}

/// Ellipsoid of a PROJ definition: `R`, `ellps` or `datum`, GRS80 when none is given.
fn datum_from_proj(parameters: &ProjParameters) -> Result<Datum, String> {
    if let Some(radius) = parameter(parameters, "r") {
        return radius
            .parse::<f64>()
            .map(|radius| Datum::new(radius, f64::INFINITY))
            .map_err(|_| format!("invalid sphere radius '{radius}'"));
    }

    if let Some(name) = parameter(parameters, "ellps") {
        return Datum::from_ellps_name(name).ok_or_else(|| format!("unknown ellipsoid '{name}'"));
    }

    match parameter(parameters, "datum") {
        Some(name) => Datum::from_datum_name(name).ok_or_else(|| format!("unknown datum '{name}'")),
        None => Ok(Datum::GRS80),
    }
}

fn is_web_sphere(parameters: &ProjParameters) -> bool {
    let axis = |key| {
        parameter(parameters, key)
            .and_then(|value| value.parse::<f64>().ok())
            .is_some_and(|value| value == WEB_SPHERE_RADIUS)
    };

    (axis("a") && axis("b")) || axis("r")
}
