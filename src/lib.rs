//! # Route Corridor
//!
//! Spatial analysis of a GPS track against a set of points of interest (POIs).
//!
//! This library provides:
//! - Lenient GPX track parsing into ordered samples
//! - A distance-indexed route model with interpolation and slicing
//! - Nearest-point projection of arbitrary points onto the route
//! - Corridor buffering around a route segment
//! - POI enrichment: containment filtering plus distance, route position and snapped point
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel per-POI projection with rayon
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use route_corridor::{enrich, parse_track, Poi, PoiKind, Route};
//!
//! let gpx = r#"<gpx><trk><trkseg>
//!     <trkpt lat="0.0" lon="0.0"><ele>10</ele></trkpt>
//!     <trkpt lat="0.0" lon="0.1"><ele>12</ele></trkpt>
//! </trkseg></trk></gpx>"#;
//!
//! let route = Route::new(parse_track(gpx).unwrap());
//! let segment = route.slice(0.0, route.total_length()).unwrap();
//!
//! let pois = vec![
//!     Poi::new(1, "Camp", 0.01, 0.05, "by the river", PoiKind::Tent),
//!     Poi::new(2, "Far away", 1.0, 0.05, "", PoiKind::Hotel),
//! ];
//!
//! let nearby = enrich(&pois, &segment, 2.0).unwrap();
//! assert_eq!(nearby.len(), 1);
//! assert!(nearby[0].min_distance.unwrap() < 1.2);
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{CorridorError, Result};

// Geographic helpers shared by every stage
pub mod geo_utils;

// Track Parser
pub mod track;
pub use track::{parse_track, parse_track_bytes};

// Route Model
pub mod route;
pub use route::{ProfilePoint, Route, RouteSegment};

// Nearest-Point Projector
pub mod projection;
pub use projection::{project, Polyline, Projection};

// Corridor Builder
pub mod corridor;
pub use corridor::{buffer, Corridor};

// POI Enrichment Pipeline
pub mod enrich;
pub use enrich::{
    enrich, enrich_cancellable, enrich_with_config, EnrichConfig, Poi, PoiKind,
    BOUNDARY_TOLERANCE_KM,
};

#[cfg(feature = "parallel")]
pub use enrich::enrich_parallel;

// Display ordering for enriched POIs
pub mod present;
pub use present::{sort_pois, SortColumn, SortOrder};

// Recompute-on-change entry point
pub mod session;
pub use session::{Analysis, AnalysisParams, RouteSession};

// GeoJSON output for map rendering
pub mod export;

#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("RouteCorridorRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// Anything with a WGS84 latitude/longitude in degrees.
pub trait LatLon {
    fn lat(&self) -> f64;
    fn lon(&self) -> f64;
}

/// A geographic coordinate without elevation.
///
/// # Example
/// ```
/// use route_corridor::GeoPoint;
/// let point = GeoPoint::new(48.137154, 11.576124); // Munich
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl LatLon for GeoPoint {
    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

/// One recorded track point. Immutable once parsed; order is track order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Sample {
    pub lat: f64,
    pub lon: f64,
    /// Elevation in meters (0.0 when the track has none)
    pub elevation: f64,
}

impl Sample {
    pub fn new(lat: f64, lon: f64, elevation: f64) -> Self {
        Self { lat, lon, elevation }
    }

    /// The sample's position without elevation.
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

impl LatLon for Sample {
    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

/// Bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Bounds {
    /// Create bounds from points. `None` for empty input.
    pub fn from_points<P: LatLon>(points: &[P]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lon = f64::MAX;
        let mut max_lon = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.lat());
            max_lat = max_lat.max(p.lat());
            min_lon = min_lon.min(p.lon());
            max_lon = max_lon.max(p.lon());
        }

        Some(Self { min_lat, max_lat, min_lon, max_lon })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// Grow the box by a margin in degrees on every side.
    pub fn expanded(&self, lat_deg: f64, lon_deg: f64) -> Self {
        Self {
            min_lat: self.min_lat - lat_deg,
            max_lat: self.max_lat + lat_deg,
            min_lon: self.min_lon - lon_deg,
            max_lon: self.max_lon + lon_deg,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
