//! Coordinate reprojection from the national projected CRS to WGS84
//!
//! Track survey data is published in ETRS-TM35FIN (EPSG:3067): a UTM zone 35
//! projection on the GRS80 ellipsoid. The inverse transverse Mercator
//! transform below uses the Krüger series to sixth order in the third
//! flattening, which is accurate to well below a millimeter inside the zone.
//!
//! With the `proj` feature the transform goes through the PROJ library
//! instead (EPSG:3067 to EPSG:4326), falling back to the built-in series if
//! PROJ cannot be initialized or rejects a coordinate.

use geo::{LineString, Point};
use once_cell::sync::Lazy;

/// GRS80 semi-major axis in meters
pub const GRS80_SEMI_MAJOR_AXIS: f64 = 6378137.0;

/// GRS80 inverse flattening
pub const GRS80_INVERSE_FLATTENING: f64 = 298.257222101;

/// UTM scale factor on the central meridian
pub const UTM_SCALE_FACTOR: f64 = 0.9996;

/// UTM false easting in meters
pub const UTM_FALSE_EASTING: f64 = 500000.0;

/// UTM zone of the source CRS
pub const SOURCE_UTM_ZONE: u8 = 35;

const MAX_LATITUDE_ITERATIONS: usize = 16;

/// A coordinate in the source projected CRS, in meters
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProjectedPoint {
    /// Easting in meters
    pub x: f64,
    /// Northing in meters
    pub y: f64,
}

impl ProjectedPoint {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for ProjectedPoint {
    #[inline]
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for ProjectedPoint {
    #[inline]
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Inverse transverse Mercator projection on an ellipsoid
#[derive(Clone, Debug)]
pub struct TransverseMercator {
    /// Longitude of the central meridian in degrees
    central_meridian_deg: f64,
    scale_factor: f64,
    false_easting: f64,
    false_northing: f64,
    /// First eccentricity of the ellipsoid
    eccentricity: f64,
    /// Rectifying radius scaled by the central meridian scale factor
    scaled_radius: f64,
    /// Krüger coefficients for the inverse series
    beta: [f64; 6],
}

impl TransverseMercator {
    /// Northern hemisphere UTM zone on the given ellipsoid
    pub fn utm(semi_major_axis: f64, inverse_flattening: f64, zone: u8) -> Self {
        let f = 1.0 / inverse_flattening;
        let n = f / (2.0 - f);
        let (n2, n3) = (n * n, n * n * n);
        let (n4, n5, n6) = (n2 * n2, n2 * n3, n3 * n3);

        let rectifying_radius =
            semi_major_axis / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0 + n6 / 256.0);

        let beta = [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0 - n4 / 360.0 - 81.0 * n5 / 512.0
                + 96199.0 * n6 / 604800.0,
            n2 / 48.0 + n3 / 15.0 - 437.0 * n4 / 1440.0 + 46.0 * n5 / 105.0
                - 1118711.0 * n6 / 3870720.0,
            17.0 * n3 / 480.0 - 37.0 * n4 / 840.0 - 209.0 * n5 / 4480.0 + 5569.0 * n6 / 90720.0,
            4397.0 * n4 / 161280.0 - 11.0 * n5 / 504.0 - 830251.0 * n6 / 7257600.0,
            4583.0 * n5 / 161280.0 - 108847.0 * n6 / 3991680.0,
            20648693.0 * n6 / 638668800.0,
        ];

        Self {
            central_meridian_deg: zone_central_meridian(zone),
            scale_factor: UTM_SCALE_FACTOR,
            false_easting: UTM_FALSE_EASTING,
            false_northing: 0.0,
            eccentricity: (f * (2.0 - f)).sqrt(),
            scaled_radius: UTM_SCALE_FACTOR * rectifying_radius,
            beta,
        }
    }

    /// Longitude of the central meridian in degrees
    #[inline]
    pub fn central_meridian(&self) -> f64 {
        self.central_meridian_deg
    }

    /// Scale factor on the central meridian
    #[inline]
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Convert projected meters to a WGS84 point (x = longitude, y = latitude)
    pub fn inverse(&self, p: ProjectedPoint) -> Point<f64> {
        let xi = (p.y - self.false_northing) / self.scaled_radius;
        let eta = (p.x - self.false_easting) / self.scaled_radius;

        let mut xi_prime = xi;
        let mut eta_prime = eta;
        for (j, beta) in self.beta.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi_prime -= beta * (k * xi).sin() * (k * eta).cosh();
            eta_prime -= beta * (k * xi).cos() * (k * eta).sinh();
        }

        // Conformal latitude
        let chi = (xi_prime.sin() / eta_prime.cosh()).asin();
        let lat = self.geodetic_latitude(chi);
        let lon = self.central_meridian_deg + eta_prime.sinh().atan2(xi_prime.cos()).to_degrees();

        Point::new(lon, lat.to_degrees())
    }

    /// Solve the conformal latitude relation for the geodetic latitude (radians)
    fn geodetic_latitude(&self, chi: f64) -> f64 {
        let e = self.eccentricity;
        let conformal_term = (std::f64::consts::FRAC_PI_4 + chi / 2.0).tan();

        let mut phi = chi;
        for _ in 0..MAX_LATITUDE_ITERATIONS {
            let e_sin = e * phi.sin();
            let next = 2.0 * (conformal_term * ((1.0 + e_sin) / (1.0 - e_sin)).powf(e / 2.0)).atan()
                - std::f64::consts::FRAC_PI_2;
            if (next - phi).abs() < 1e-15 {
                return next;
            }
            phi = next;
        }
        phi
    }
}

/// Central meridian (degrees) of a UTM zone
#[inline]
pub fn zone_central_meridian(zone: u8) -> f64 {
    f64::from(zone) * 6.0 - 183.0
}

/// Process-wide registration of the source CRS, resolved on first use
static SOURCE_CRS: Lazy<TransverseMercator> = Lazy::new(|| {
    tracing::debug!(
        "Registering source CRS: UTM zone {} on GRS80 (central meridian {}°)",
        SOURCE_UTM_ZONE,
        zone_central_meridian(SOURCE_UTM_ZONE)
    );
    TransverseMercator::utm(
        GRS80_SEMI_MAJOR_AXIS,
        GRS80_INVERSE_FLATTENING,
        SOURCE_UTM_ZONE,
    )
});

/// The registered source CRS
#[inline]
pub fn source_crs() -> &'static TransverseMercator {
    &SOURCE_CRS
}

#[cfg(feature = "proj")]
mod proj_backend {
    use super::ProjectedPoint;
    use geo::Point;
    use proj::Proj;

    pub(super) const SOURCE_EPSG: &str = "EPSG:3067";
    pub(super) const TARGET_EPSG: &str = "EPSG:4326";

    // PROJ contexts cannot be shared between threads, so each thread
    // registers its own transformer on first use
    thread_local! {
        static TRANSFORMER: Option<Proj> = match Proj::new_known_crs(SOURCE_EPSG, TARGET_EPSG, None) {
            Ok(proj) => {
                tracing::debug!("Registered PROJ transform {} -> {}", SOURCE_EPSG, TARGET_EPSG);
                Some(proj)
            }
            Err(e) => {
                tracing::warn!("PROJ init failed, using built-in transverse Mercator: {}", e);
                None
            }
        };
    }

    /// Longitude/latitude through PROJ, or `None` to use the fallback
    pub(super) fn inverse(p: ProjectedPoint) -> Option<Point<f64>> {
        TRANSFORMER.with(|transformer| {
            let transformer = transformer.as_ref()?;
            match transformer.convert((p.x, p.y)) {
                Ok((lon, lat)) => Some(Point::new(lon, lat)),
                Err(e) => {
                    tracing::debug!("PROJ transform of ({}, {}) failed: {}", p.x, p.y, e);
                    None
                }
            }
        })
    }
}

/// Reproject a source CRS coordinate to WGS84
///
/// Pure and deterministic. No range validation is performed: coordinates far
/// outside the zone produce finite but meaningless output.
#[inline]
pub fn reproject(p: ProjectedPoint) -> Point<f64> {
    #[cfg(feature = "proj")]
    {
        if let Some(point) = proj_backend::inverse(p) {
            return point;
        }
    }

    SOURCE_CRS.inverse(p)
}

/// Reproject a whole polyline, preserving point order
pub fn reproject_line(points: &[ProjectedPoint]) -> LineString<f64> {
    points.iter().map(|&p| reproject(p).0).collect()
}
