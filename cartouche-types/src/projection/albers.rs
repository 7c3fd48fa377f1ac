use std::f64::consts::{FRAC_PI_2, PI, TAU};

use super::Projection;
use crate::datum::Datum;
use crate::point::{GeoPoint2d, Point2};

const EPSILON: f64 = 1e-10;
const MAX_ITERATIONS: usize = 15;

/// Parameters of an [`AlbersEqualArea`] projection. Angles are in degrees, offsets in meters.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AlbersParameters {
    /// First standard parallel.
    pub lat_1: f64,
    /// Second standard parallel.
    pub lat_2: f64,
    /// Latitude of the origin.
    pub lat_0: f64,
    /// Central meridian.
    pub lon_0: f64,
    /// False easting.
    pub x_0: f64,
    /// False northing.
    pub y_0: f64,
}

/// Albers equal-area conic projection (`+proj=aea`) on an ellipsoid or a sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlbersEqualArea {
    semimajor: f64,
    e: f64,
    e2: f64,
    lon_0: f64,
    x_0: f64,
    y_0: f64,
    n: f64,
    c: f64,
    rho_0: f64,
}

impl AlbersEqualArea {
    /// Creates the projection. Fails if the standard parallels are outside of `[-90, 90]` or
    /// symmetric about the equator.
    pub fn new(datum: Datum, parameters: &AlbersParameters) -> Result<Self, String> {
        let phi_1 = parameters.lat_1.to_radians();
        let phi_2 = parameters.lat_2.to_radians();
        let phi_0 = parameters.lat_0.to_radians();

        if phi_1.abs() > FRAC_PI_2 || phi_2.abs() > FRAC_PI_2 || phi_0.abs() > FRAC_PI_2 {
            return Err("latitudes must be within [-90, 90]".into());
        }
        if (phi_1 + phi_2).abs() < EPSILON {
            return Err("standard parallels are symmetric about the equator".into());
        }

        let e2 = datum.eccentricity_squared();
        let e = e2.sqrt();

        let m_1 = msfn(phi_1, e2);
        let q_1 = qsfn(phi_1.sin(), e, e2);
        let n = if (phi_1 - phi_2).abs() >= EPSILON {
            let m_2 = msfn(phi_2, e2);
            let q_2 = qsfn(phi_2.sin(), e, e2);
            (m_1 * m_1 - m_2 * m_2) / (q_2 - q_1)
        } else {
            phi_1.sin()
        };

        let c = m_1 * m_1 + n * q_1;
        let rho_0 = datum.semimajor() * (c - n * qsfn(phi_0.sin(), e, e2)).sqrt() / n;
        if !rho_0.is_finite() {
            return Err("projection origin cannot be represented".into());
        }

        Ok(Self {
            semimajor: datum.semimajor(),
            e,
            e2,
            lon_0: parameters.lon_0.to_radians(),
            x_0: parameters.x_0,
            y_0: parameters.y_0,
            n,
            c,
            rho_0,
        })
    }

    fn latitude_from_q(&self, q: f64) -> Option<f64> {
        if self.e < EPSILON {
            let sin = q / 2.0;
            return (sin.abs() <= 1.0 + EPSILON).then(|| sin.clamp(-1.0, 1.0).asin());
        }

        let q_pole = qsfn(1.0, self.e, self.e2);
        if (q.abs() - q_pole).abs() < EPSILON {
            return Some(FRAC_PI_2.copysign(q));
        }
        if q.abs() > q_pole {
            return None;
        }

        let mut phi = (q / 2.0).clamp(-1.0, 1.0).asin();
        for _ in 0..MAX_ITERATIONS {
            let sin = phi.sin();
            let con = self.e * sin;
            let com = 1.0 - con * con;
            let delta = 0.5 * com * com / phi.cos()
                * (q / (1.0 - self.e2) - sin / com
                    + 0.5 / self.e * ((1.0 - con) / (1.0 + con)).ln());
            phi += delta;

            if delta.abs() < 1e-12 {
                return Some(phi);
            }
        }

        None
    }
}

impl Projection for AlbersEqualArea {
    fn project(&self, input: &GeoPoint2d) -> Option<Point2> {
        let q = qsfn(input.lat_rad().sin(), self.e, self.e2);
        let rho_squared = self.c - self.n * q;
        if rho_squared < -EPSILON {
            return None;
        }

        let rho = self.semimajor * rho_squared.max(0.0).sqrt() / self.n;
        let theta = self.n * normalize_lon(input.lon_rad() - self.lon_0);

        let x = rho * theta.sin() + self.x_0;
        let y = self.rho_0 - rho * theta.cos() + self.y_0;
        (x.is_finite() && y.is_finite()).then(|| Point2::new(x, y))
    }

    fn unproject(&self, input: &Point2) -> Option<GeoPoint2d> {
        let mut x = input.x - self.x_0;
        let mut y = self.rho_0 - (input.y - self.y_0);
        let mut rho = x.hypot(y);
        if self.n < 0.0 {
            rho = -rho;
            x = -x;
            y = -y;
        }

        let q = (self.c - (rho * self.n / self.semimajor).powi(2)) / self.n;
        let phi = self.latitude_from_q(q)?;
        let lambda = if rho == 0.0 {
            self.lon_0
        } else {
            normalize_lon(x.atan2(y) / self.n + self.lon_0)
        };

        Some(GeoPoint2d::latlon(phi.to_degrees(), lambda.to_degrees()))
    }
}

fn msfn(phi: f64, e2: f64) -> f64 {
    let sin = phi.sin();
    phi.cos() / (1.0 - e2 * sin * sin).sqrt()
}

fn qsfn(sin: f64, e: f64, e2: f64) -> f64 {
    if e < EPSILON {
        return 2.0 * sin;
    }

    let con = e * sin;
    (1.0 - e2) * (sin / (1.0 - con * con) - 0.5 / e * ((1.0 - con) / (1.0 + con)).ln())
}

fn normalize_lon(lambda: f64) -> f64 {
    if (-PI..=PI).contains(&lambda) {
        lambda
    } else {
        (lambda + PI).rem_euclid(TAU) - PI
    }
}
