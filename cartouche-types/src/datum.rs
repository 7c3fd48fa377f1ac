/// Reference ellipsoid parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Datum {
    semimajor: f64,
    inv_flattening: f64,
}

impl Datum {
    /// WGS84 ellipsoid.
    pub const WGS84: Self = Datum {
        semimajor: 6_378_137.0,
        inv_flattening: 298.257223563,
    };

    /// GRS 1980 ellipsoid, used by NAD83.
    pub const GRS80: Self = Datum {
        semimajor: 6_378_137.0,
        inv_flattening: 298.257222101,
    };

    /// Clarke 1866 ellipsoid, used by NAD27.
    pub const CLARKE_1866: Self = Datum {
        semimajor: 6_378_206.4,
        inv_flattening: 294.978698214,
    };

    /// Sphere with the WGS84 semimajor axis, as used by spherical (web) mercator.
    pub const WEB_SPHERE: Self = Datum {
        semimajor: 6_378_137.0,
        inv_flattening: f64::INFINITY,
    };

    /// Creates an ellipsoid. A sphere has infinite inverse flattening.
    pub fn new(semimajor: f64, inv_flattening: f64) -> Self {
        Self {
            semimajor,
            inv_flattening,
        }
    }

    /// Looks up an ellipsoid by its PROJ `ellps` name.
    pub fn from_ellps_name(name: &str) -> Option<Self> {
        Some(match name {
            "WGS84" => Self::WGS84,
            "GRS80" => Self::GRS80,
            "clrk66" => Self::CLARKE_1866,
            _ => return None,
        })
    }

    /// Looks up the ellipsoid of a PROJ `datum` name.
    pub fn from_datum_name(name: &str) -> Option<Self> {
        Some(match name {
            "WGS84" => Self::WGS84,
            "NAD83" => Self::GRS80,
            "NAD27" => Self::CLARKE_1866,
            _ => return None,
        })
    }

    /// Semimajor axis in meters.
    pub fn semimajor(&self) -> f64 {
        self.semimajor
    }

    /// Inverse flattening. Infinite for a sphere.
    pub fn inv_flattening(&self) -> f64 {
        self.inv_flattening
    }

    /// Square of the first eccentricity.
    pub fn eccentricity_squared(&self) -> f64 {
        let flattening = 1.0 / self.inv_flattening;
        flattening * (2.0 - flattening)
    }
}

impl Default for Datum {
    fn default() -> Self {
        Self::WGS84
    }
}
