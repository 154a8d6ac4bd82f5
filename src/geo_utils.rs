//! # Geographic Utilities
//!
//! Core geographic computation shared by the route model, the projector and the
//! corridor builder.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two points, in kilometers |
//! | [`polyline_length`] | Total length of a track in kilometers |
//! | [`compute_bounds`] | Bounding box of a track |
//! | [`km_to_degrees`] | Convert kilometers to approximate degrees at a latitude |
//! | [`LocalPlane`] | Equirectangular kilometer frame for planar geometry |
//!
//! ## Example
//!
//! ```rust
//! use route_corridor::{GeoPoint, geo_utils};
//!
//! let track = vec![
//!     GeoPoint::new(0.0, 0.0),
//!     GeoPoint::new(0.0, 1.0),
//!     GeoPoint::new(0.0, 2.0),
//! ];
//!
//! // One degree of longitude on the equator is ~111 km
//! let length = geo_utils::polyline_length(&track);
//! assert!((length - 222.39).abs() < 0.1);
//! ```
//!
//! ## Algorithm Notes
//!
//! Distances use the haversine formula on a sphere with a fixed radius of
//! [`EARTH_RADIUS_KM`]. Every stage of the pipeline reports kilometers measured
//! with this one metric, so corridor containment and reported distances agree.
//!
//! Planar work (segment projection parameters, buffering) happens in a
//! [`LocalPlane`]: an equirectangular projection scaled to kilometers around a
//! reference latitude. It is accurate for corridor-sized neighborhoods and
//! degrades towards the poles.

use geo::Coord;
use crate::{Bounds, LatLon};

/// Mean Earth radius used for all distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometers per degree of latitude on the [`EARTH_RADIUS_KM`] sphere.
pub const KM_PER_DEGREE: f64 = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

// Below this cosine, longitude scaling is clamped (within ~0.6° of a pole).
const MIN_COS_LAT: f64 = 0.01;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two points using the Haversine formula.
///
/// Returns the distance in kilometers along the surface of a sphere with radius
/// [`EARTH_RADIUS_KM`].
///
/// # Example
///
/// ```rust
/// use route_corridor::{GeoPoint, geo_utils};
///
/// let munich = GeoPoint::new(48.137154, 11.576124);
/// let augsburg = GeoPoint::new(48.370545, 10.897790);
///
/// let distance = geo_utils::haversine_distance(&munich, &augsburg);
/// assert!((distance - 56.0).abs() < 2.0);
/// ```
#[inline]
pub fn haversine_distance<A: LatLon, B: LatLon>(a: &A, b: &B) -> f64 {
    let lat1 = a.lat().to_radians();
    let lat2 = b.lat().to_radians();
    let dlat = (b.lat() - a.lat()).to_radians();
    let dlon = (b.lon() - a.lon()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    // Clamp guards asin against rounding just above 1.0 for antipodal points
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Calculate the total length of a polyline in kilometers.
///
/// Empty or single-point tracks return 0.0.
pub fn polyline_length<P: LatLon>(points: &[P]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Convert kilometers to approximate degrees of longitude at a given latitude.
///
/// Longitude degrees shrink with `cos(latitude)`, so this is the larger of the
/// two conversions and safe to use for square search boxes.
#[inline]
pub fn km_to_degrees(km: f64, latitude: f64) -> f64 {
    let km_per_degree = KM_PER_DEGREE * latitude.to_radians().cos().max(MIN_COS_LAT);
    km / km_per_degree
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a track.
///
/// For empty input, returns a bounds with MIN/MAX values that contains nothing.
pub fn compute_bounds<P: LatLon>(points: &[P]) -> Bounds {
    Bounds::from_points(points).unwrap_or(Bounds {
        min_lat: f64::MAX,
        max_lat: f64::MIN,
        min_lon: f64::MAX,
        max_lon: f64::MIN,
    })
}

// =============================================================================
// Local Planar Frame
// =============================================================================

/// Equirectangular projection to a kilometer plane around a reference point.
///
/// `x` grows eastwards and `y` northwards; one unit is one kilometer at the
/// reference latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalPlane {
    origin_lat: f64,
    origin_lon: f64,
    cos_lat: f64,
}

impl LocalPlane {
    /// A plane with its origin at the given point.
    pub fn new(origin_lat: f64, origin_lon: f64) -> Self {
        Self {
            origin_lat,
            origin_lon,
            cos_lat: origin_lat.to_radians().cos().max(MIN_COS_LAT),
        }
    }

    /// A plane centred on the bounding box of the points. `None` for empty input.
    pub fn centred_on<P: LatLon>(points: &[P]) -> Option<Self> {
        let center = Bounds::from_points(points)?.center();
        Some(Self::new(center.lat, center.lon))
    }

    /// Project a geographic position into the plane.
    #[inline]
    pub fn to_plane(&self, lat: f64, lon: f64) -> Coord<f64> {
        Coord {
            x: (lon - self.origin_lon) * KM_PER_DEGREE * self.cos_lat,
            y: (lat - self.origin_lat) * KM_PER_DEGREE,
        }
    }

    /// Map a plane coordinate back to geographic `x = lon`, `y = lat`.
    #[inline]
    pub fn to_geographic(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: self.origin_lon + c.x / (KM_PER_DEGREE * self.cos_lat),
            y: self.origin_lat + c.y / KM_PER_DEGREE,
        }
    }

    /// Largest factor by which plane distances overstate ground distances for
    /// points no further than `max_abs_lat` degrees from the equator.
    ///
    /// East-west distances are scaled by the reference latitude's cosine, which
    /// is too large polewards of the reference. Never less than 1.0.
    pub fn max_stretch(&self, max_abs_lat: f64) -> f64 {
        let cos_poleward = max_abs_lat.min(90.0).to_radians().cos().max(MIN_COS_LAT);
        (self.cos_lat / cos_poleward).max(1.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
