//! POI enrichment: corridor containment plus nearest-point projection.
//!
//! For a route segment and a radius, every POI inside the corridor is returned
//! as a new record carrying its distance to the route, its route position and
//! the snapped closest point. Input order is preserved; the input slice is never
//! modified.
//!
//! ## Admission policy
//!
//! The boundary is inclusive. A POI is admitted when it lies inside (or on)
//! the corridor polygon and its projected distance is at most
//! `radius_km + boundary_tolerance_km`.
//!
//! The polygon is a superset of the radius (see [`crate::corridor`]), so the
//! distance check is what fixes the corridor's edge at exactly `radius_km`
//! and keeps every returned `min_distance` within it.
//!
//! ## Pipeline
//!
//! ```text
//! POIs ──▶ R-tree envelope prefilter ──▶ project onto segment ──▶ admit ──▶ enriched POIs
//!                  ▲                                                ▲
//!           corridor bounds                                  corridor polygon
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::corridor::{buffer, Corridor};
use crate::error::{validate_radius, CorridorError, Result};
use crate::geo_utils::{km_to_degrees, KM_PER_DEGREE};
use crate::projection::{project, Projection};
use crate::route::RouteSegment;
use crate::{GeoPoint, LatLon};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Distances within this many km of the radius count as on the boundary.
pub const BOUNDARY_TOLERANCE_KM: f64 = 1e-6;

// ============================================================================
// Types
// ============================================================================

/// Category of a point of interest.
///
/// Serialized as a lowercase string. Unrecognised strings are kept verbatim in
/// [`PoiKind::Other`] so they survive enrichment and export.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(from = "String", into = "String")]
pub enum PoiKind {
    House,
    Tent,
    Hotel,
    Other(String),
}

impl From<String> for PoiKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "house" => PoiKind::House,
            "tent" => PoiKind::Tent,
            "hotel" => PoiKind::Hotel,
            _ => PoiKind::Other(kind),
        }
    }
}

impl From<PoiKind> for String {
    fn from(kind: PoiKind) -> Self {
        match kind {
            PoiKind::House => "house".to_string(),
            PoiKind::Tent => "tent".to_string(),
            PoiKind::Hotel => "hotel".to_string(),
            PoiKind::Other(other) => other,
        }
    }
}

/// A point of interest, optionally enriched with its relation to the route.
///
/// The three optional fields are `None` until the POI passes through
/// [`enrich`]; enrichment always produces new records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct Poi {
    /// Caller-assigned identity, unique within a POI set
    pub id: u64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: PoiKind,
    /// Great-circle distance to the route segment in km
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_distance: Option<f64>,
    /// Km along the parent route of the closest point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_position: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closest_point: Option<GeoPoint>,
}

impl Poi {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        lat: f64,
        lon: f64,
        description: impl Into<String>,
        kind: PoiKind,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            lat,
            lon,
            description: description.into(),
            kind,
            min_distance: None,
            route_position: None,
            closest_point: None,
        }
    }

    pub fn is_enriched(&self) -> bool {
        self.min_distance.is_some()
    }

    /// A copy of this POI carrying the projection's results.
    fn enriched_with(&self, projection: &Projection) -> Self {
        Self {
            min_distance: Some(projection.distance_to_route),
            route_position: Some(projection.route_position),
            closest_point: Some(projection.point),
            ..self.clone()
        }
    }
}

impl LatLon for Poi {
    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

/// Configuration for POI enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct EnrichConfig {
    /// Corridor radius in km. Must be positive. Default: 5.0
    pub radius_km: f64,

    /// How far past the radius a projected distance may fall and still count
    /// as on the boundary, in km. Default: 1e-6 (one millimetre)
    pub boundary_tolerance_km: f64,

    /// Extra margin around the corridor's bounding box for the spatial
    /// prefilter, as a fraction of the radius. Default: 0.05
    pub envelope_margin_ratio: f64,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            radius_km: 5.0,
            boundary_tolerance_km: BOUNDARY_TOLERANCE_KM,
            envelope_margin_ratio: 0.05,
        }
    }
}

impl EnrichConfig {
    /// Default settings with the given radius.
    pub fn with_radius(radius_km: f64) -> Self {
        Self {
            radius_km,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        validate_radius(self.radius_km)?;
        if !self.boundary_tolerance_km.is_finite() || self.boundary_tolerance_km < 0.0 {
            return Err(CorridorError::invalid(
                "boundary_tolerance_km",
                format!("must be a non-negative number, got {}", self.boundary_tolerance_km),
            ));
        }
        if !self.envelope_margin_ratio.is_finite() || self.envelope_margin_ratio < 0.0 {
            return Err(CorridorError::invalid(
                "envelope_margin_ratio",
                format!("must be a non-negative number, got {}", self.envelope_margin_ratio),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Spatial prefilter
// ============================================================================

/// A POI position with its index in the input slice.
#[derive(Debug, Clone, Copy)]
struct IndexedPoi {
    idx: usize,
    lat: f64,
    lon: f64,
}

impl RTreeObject for IndexedPoi {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lon, self.lat])
    }
}

/// Indices of POIs inside the corridor's bounding box (plus margin), ascending.
fn candidate_indices(pois: &[Poi], corridor: &Corridor, config: &EnrichConfig) -> Vec<usize> {
    let bounds = match corridor.bounds() {
        Some(b) => b,
        None => return vec![],
    };

    let margin_km = (config.envelope_margin_ratio * config.radius_km).max(config.boundary_tolerance_km);
    let widest_lat = bounds.min_lat.abs().max(bounds.max_lat.abs());
    let search = bounds.expanded(margin_km / KM_PER_DEGREE, km_to_degrees(margin_km, widest_lat));

    let indexed: Vec<IndexedPoi> = pois
        .iter()
        .enumerate()
        .filter(|(_, p)| p.lat.is_finite() && p.lon.is_finite())
        .map(|(idx, p)| IndexedPoi { idx, lat: p.lat, lon: p.lon })
        .collect();
    let rtree = RTree::bulk_load(indexed);

    let envelope = AABB::from_corners(
        [search.min_lon, search.min_lat],
        [search.max_lon, search.max_lat],
    );

    let mut candidates: Vec<usize> = rtree
        .locate_in_envelope_intersecting(&envelope)
        .map(|p| p.idx)
        .collect();

    // R-tree order is arbitrary; output must follow input order
    candidates.sort_unstable();
    candidates
}

// ============================================================================
// Enrichment
// ============================================================================

/// Everything the per-POI step needs, built once per call.
struct Prepared<'a> {
    segment: &'a RouteSegment,
    corridor: Corridor,
    config: &'a EnrichConfig,
    candidates: Vec<usize>,
}

impl<'a> Prepared<'a> {
    /// Validate, buffer and prefilter. `None` when nothing can qualify.
    fn new(pois: &[Poi], segment: &'a RouteSegment, config: &'a EnrichConfig) -> Result<Option<Self>> {
        config.validate()?;

        if pois.is_empty() || segment.is_degenerate() {
            debug!(
                "[RouteCorridor] Nothing to enrich ({} POIs, degenerate segment: {})",
                pois.len(),
                segment.is_degenerate()
            );
            return Ok(None);
        }

        let corridor = buffer(segment, config.radius_km)?;
        let candidates = candidate_indices(pois, &corridor, config);

        debug!(
            "[RouteCorridor] {} of {} POIs inside corridor envelope (radius {:.3} km)",
            candidates.len(),
            pois.len(),
            config.radius_km
        );

        Ok(Some(Self { segment, corridor, config, candidates }))
    }

    /// Apply the admission policy to one POI.
    fn evaluate(&self, poi: &Poi) -> Option<Poi> {
        if !self.corridor.contains(poi.lat, poi.lon) {
            return None;
        }

        let projection = project(poi, self.segment)?;
        if projection.distance_to_route > self.config.radius_km + self.config.boundary_tolerance_km {
            return None;
        }

        Some(poi.enriched_with(&projection))
    }
}

/// Enrich the POIs within `radius_km` of `segment`, in input order.
///
/// Returns an empty list when no POI qualifies or the segment is degenerate.
///
/// # Errors
/// - [`CorridorError::InvalidParameter`] if `radius_km` is not positive
/// - [`CorridorError::Geometry`] if the corridor could not be buffered
///
/// # Example
/// ```
/// use route_corridor::{enrich, Poi, PoiKind, Route, Sample};
///
/// let route = Route::new(vec![Sample::new(0.0, 0.0, 0.0), Sample::new(0.0, 1.0, 0.0)]);
/// let segment = route.slice(0.0, route.total_length()).unwrap();
/// let pois = vec![
///     Poi::new(1, "Near", 0.01, 0.5, "", PoiKind::House),
///     Poi::new(2, "Far", 0.5, 0.5, "", PoiKind::House),
/// ];
///
/// let enriched = enrich(&pois, &segment, 5.0).unwrap();
/// assert_eq!(enriched.len(), 1);
/// assert_eq!(enriched[0].id, 1);
/// assert!(enriched[0].min_distance.unwrap() <= 5.0);
/// ```
pub fn enrich(pois: &[Poi], segment: &RouteSegment, radius_km: f64) -> Result<Vec<Poi>> {
    enrich_with_config(pois, segment, &EnrichConfig::with_radius(radius_km))
}

/// Enrich with full configuration.
pub fn enrich_with_config(pois: &[Poi], segment: &RouteSegment, config: &EnrichConfig) -> Result<Vec<Poi>> {
    let prepared = match Prepared::new(pois, segment, config)? {
        Some(p) => p,
        None => return Ok(vec![]),
    };

    let enriched: Vec<Poi> = prepared
        .candidates
        .iter()
        .filter_map(|&i| prepared.evaluate(&pois[i]))
        .collect();

    debug!("[RouteCorridor] Enriched {} POIs", enriched.len());
    Ok(enriched)
}

/// Enrich, checking `cancel` between POIs.
///
/// Returns [`CorridorError::Cancelled`] as soon as the flag is observed set,
/// so a superseded computation stops early and yields no partial result.
pub fn enrich_cancellable(
    pois: &[Poi],
    segment: &RouteSegment,
    config: &EnrichConfig,
    cancel: &AtomicBool,
) -> Result<Vec<Poi>> {
    let prepared = match Prepared::new(pois, segment, config)? {
        Some(p) => p,
        None => return Ok(vec![]),
    };

    let mut enriched = Vec::new();
    for &i in &prepared.candidates {
        if cancel.load(Ordering::Relaxed) {
            debug!("[RouteCorridor] Enrichment cancelled after {} POIs", enriched.len());
            return Err(CorridorError::Cancelled { stage: "enrich" });
        }
        if let Some(poi) = prepared.evaluate(&pois[i]) {
            enriched.push(poi);
        }
    }

    Ok(enriched)
}

/// Enrich with per-POI projection spread over the rayon thread pool.
///
/// Output is identical to [`enrich_with_config`], including order.
#[cfg(feature = "parallel")]
pub fn enrich_parallel(pois: &[Poi], segment: &RouteSegment, config: &EnrichConfig) -> Result<Vec<Poi>> {
    let prepared = match Prepared::new(pois, segment, config)? {
        Some(p) => p,
        None => return Ok(vec![]),
    };

    // Indexed parallel collect keeps candidate (= input) order
    let results: Vec<Option<Poi>> = prepared
        .candidates
        .par_iter()
        .map(|&i| prepared.evaluate(&pois[i]))
        .collect();

    let enriched: Vec<Poi> = results.into_iter().flatten().collect();
    debug!("[RouteCorridor] Enriched {} POIs (parallel)", enriched.len());
    Ok(enriched)
}

// ============================================================================
// Unit Tests
// ============================================================================
