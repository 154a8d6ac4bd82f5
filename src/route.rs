//! Route model: a distance-indexed polyline built from track samples.
//!
//! A [`Route`] pairs every sample with its cumulative haversine distance from
//! the first sample. All positions along a route are kilometers from the
//! start of the PARENT route, including positions on a [`RouteSegment`], so a
//! POI's route position means the same thing whichever window it was found in.

use serde::{Deserialize, Serialize};

use crate::error::{validate_range, Result};
use crate::geo_utils::haversine_distance;
use crate::{Bounds, GeoPoint, Sample};

/// One point of the elevation profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ProfilePoint {
    /// Kilometers from the route start
    pub distance_km: f64,
    /// Elevation in meters
    pub elevation: f64,
}

/// A continuous route derived from an ordered track.
///
/// Created once per uploaded track. Degenerate routes (zero or one sample)
/// are valid and have a total length of 0.
///
/// Deserializing reads only `samples` and recomputes the distance table, so a
/// payload cannot pair samples with a table of another length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RouteSamples")]
pub struct Route {
    samples: Vec<Sample>,
    cumulative_distance: Vec<f64>,
}

#[derive(Deserialize)]
struct RouteSamples {
    samples: Vec<Sample>,
}

impl From<RouteSamples> for Route {
    fn from(raw: RouteSamples) -> Self {
        Route::new(raw.samples)
    }
}

impl Route {
    /// Build a route, computing cumulative distances in O(n).
    pub fn new(samples: Vec<Sample>) -> Self {
        let mut cumulative_distance = Vec::with_capacity(samples.len());
        let mut total = 0.0;

        for (i, sample) in samples.iter().enumerate() {
            if i > 0 {
                total += haversine_distance(&samples[i - 1], sample);
            }
            cumulative_distance.push(total);
        }

        Self { samples, cumulative_distance }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Cumulative distance in km for every sample; same length as [`Route::samples`].
    pub fn cumulative_distance(&self) -> &[f64] {
        &self.cumulative_distance
    }

    pub fn total_length(&self) -> f64 {
        self.cumulative_distance.last().copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.samples)
    }

    /// The point `distance_km` along the route.
    ///
    /// Out-of-range distances are clamped to `[0, total_length]`. Returns the
    /// single sample for a one-point route and `None` for an empty route.
    ///
    /// # Example
    /// ```
    /// use route_corridor::{Route, Sample};
    ///
    /// let route = Route::new(vec![
    ///     Sample::new(0.0, 0.0, 100.0),
    ///     Sample::new(0.0, 1.0, 200.0),
    /// ]);
    ///
    /// let mid = route.point_at_distance(route.total_length() / 2.0).unwrap();
    /// assert!((mid.lon - 0.5).abs() < 1e-9);
    /// assert!((mid.elevation - 150.0).abs() < 1e-9);
    /// ```
    pub fn point_at_distance(&self, distance_km: f64) -> Option<Sample> {
        point_at(&self.samples, &self.cumulative_distance, distance_km)
    }

    /// Restrict the route to the window `[start_km, end_km]`.
    ///
    /// The endpoints are synthesized with [`Route::point_at_distance`]; every
    /// original sample strictly between them is kept in order. Bounds are
    /// clamped to the route. Fails only when `start_km > end_km`.
    pub fn slice(&self, start_km: f64, end_km: f64) -> Result<RouteSegment> {
        validate_range(start_km, end_km)?;

        let total = self.total_length();
        let start_km = start_km.clamp(0.0, total);
        let end_km = end_km.clamp(0.0, total);

        let (first, last) = match (self.point_at_distance(start_km), self.point_at_distance(end_km)) {
            (Some(first), Some(last)) => (first, last),
            _ => return Ok(RouteSegment::empty()),
        };

        let mut samples = vec![first];
        let mut cumulative_distance = vec![start_km];

        for (sample, &d) in self.samples.iter().zip(&self.cumulative_distance) {
            if d > start_km && d < end_km {
                samples.push(*sample);
                cumulative_distance.push(d);
            }
        }

        samples.push(last);
        cumulative_distance.push(end_km);

        Ok(RouteSegment {
            samples,
            cumulative_distance,
            start_km,
            end_km,
        })
    }

    /// Cumulative distance / elevation pairs for charting.
    pub fn profile(&self) -> Vec<ProfilePoint> {
        profile_of(&self.samples, &self.cumulative_distance)
    }
}

/// A route window between two cumulative-distance positions.
///
/// A disposable view: recomputed, never mutated, whenever the range changes.
/// Cumulative distances are those of the parent route, so they start at
/// `start_km` rather than at zero. Only built by [`Route::slice`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSegment {
    samples: Vec<Sample>,
    cumulative_distance: Vec<f64>,
    start_km: f64,
    end_km: f64,
}

impl RouteSegment {
    /// The segment of an empty route.
    pub fn empty() -> Self {
        Self {
            samples: Vec::new(),
            cumulative_distance: Vec::new(),
            start_km: 0.0,
            end_km: 0.0,
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Parent-route cumulative distance for every sample.
    pub fn cumulative_distance(&self) -> &[f64] {
        &self.cumulative_distance
    }

    pub fn start_km(&self) -> f64 {
        self.start_km
    }

    pub fn end_km(&self) -> f64 {
        self.end_km
    }

    pub fn length(&self) -> f64 {
        self.end_km - self.start_km
    }

    /// True when the segment has no extent to analyse.
    pub fn is_degenerate(&self) -> bool {
        self.samples.len() < 2 || self.length() <= 0.0
    }

    pub fn points(&self) -> Vec<GeoPoint> {
        self.samples.iter().map(Sample::point).collect()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.samples)
    }

    /// The point at a parent-route distance, clamped to this window.
    pub fn point_at_distance(&self, distance_km: f64) -> Option<Sample> {
        point_at(&self.samples, &self.cumulative_distance, distance_km)
    }

    /// Profile pairs for the window, in parent-route kilometers.
    pub fn profile(&self) -> Vec<ProfilePoint> {
        profile_of(&self.samples, &self.cumulative_distance)
    }
}

/// Linear interpolation along a cumulative-distance table.
fn point_at(samples: &[Sample], cumulative: &[f64], distance_km: f64) -> Option<Sample> {
    let first = *samples.first()?;
    let (lo, hi) = (cumulative[0], cumulative[cumulative.len() - 1]);
    if samples.len() == 1 || distance_km.is_nan() {
        return Some(first);
    }
    let d = distance_km.clamp(lo, hi);

    // First index whose cumulative distance reaches d
    let idx = cumulative.partition_point(|&c| c < d);
    if idx == 0 {
        return Some(first);
    }
    if idx >= samples.len() {
        return samples.last().copied();
    }

    let (a, b) = (&samples[idx - 1], &samples[idx]);
    let span = cumulative[idx] - cumulative[idx - 1];
    let t = if span > 0.0 { (d - cumulative[idx - 1]) / span } else { 0.0 };

    Some(Sample {
        lat: a.lat + t * (b.lat - a.lat),
        lon: a.lon + t * (b.lon - a.lon),
        elevation: a.elevation + t * (b.elevation - a.elevation),
    })
}

fn profile_of(samples: &[Sample], cumulative: &[f64]) -> Vec<ProfilePoint> {
    samples
        .iter()
        .zip(cumulative)
        .map(|(s, &d)| ProfilePoint { distance_km: d, elevation: s.elevation })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::KM_PER_DEGREE;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn equator_route() -> Route {
        Route::new(vec![
            Sample::new(0.0, 0.0, 10.0),
            Sample::new(0.0, 1.0, 20.0),
            Sample::new(0.0, 2.0, 40.0),
        ])
    }

    #[test]
    fn test_cumulative_distance() {
        let route = equator_route();
        let cum = route.cumulative_distance();

        assert_eq!(cum.len(), route.samples().len());
        assert_eq!(cum[0], 0.0);
        assert!(cum.windows(2).all(|w| w[0] <= w[1]));
        assert!(approx_eq(cum[1], KM_PER_DEGREE, 1e-9));
        assert!(approx_eq(route.total_length(), 2.0 * KM_PER_DEGREE, 1e-9));
    }

    #[test]
    fn test_repeated_samples_keep_distance_flat() {
        let route = Route::new(vec![
            Sample::new(1.0, 1.0, 0.0),
            Sample::new(1.0, 1.0, 0.0),
            Sample::new(1.0, 1.1, 0.0),
        ]);
        let cum = route.cumulative_distance();
        assert_eq!(cum[0], cum[1]);
        assert!(cum[2] > cum[1]);
    }

    #[test]
    fn test_degenerate_routes() {
        let empty = Route::new(vec![]);
        assert_eq!(empty.total_length(), 0.0);
        assert!(empty.point_at_distance(1.0).is_none());
        assert!(empty.slice(0.0, 1.0).unwrap().is_degenerate());
        assert!(empty.profile().is_empty());

        let single = Route::new(vec![Sample::new(48.0, 11.0, 500.0)]);
        assert_eq!(single.total_length(), 0.0);
        assert_eq!(single.point_at_distance(3.0), Some(Sample::new(48.0, 11.0, 500.0)));
        assert!(single.slice(0.0, 0.0).unwrap().is_degenerate());
    }

    #[test]
    fn test_point_at_distance_interpolates() {
        let route = equator_route();
        let p = route.point_at_distance(1.5 * KM_PER_DEGREE).unwrap();
        assert!(approx_eq(p.lon, 1.5, 1e-9));
        assert!(approx_eq(p.lat, 0.0, 1e-12));
        assert!(approx_eq(p.elevation, 30.0, 1e-9));
    }

    #[test]
    fn test_point_at_distance_hits_vertices() {
        let route = equator_route();
        let p = route.point_at_distance(route.cumulative_distance()[1]).unwrap();
        assert_eq!(p, route.samples()[1]);
    }

    #[test]
    fn test_point_at_distance_clamps() {
        let route = equator_route();
        assert_eq!(route.point_at_distance(-5.0), Some(route.samples()[0]));
        assert_eq!(route.point_at_distance(1e6), Some(route.samples()[2]));
    }

    #[test]
    fn test_slice_window() {
        let route = equator_route();
        let seg = route.slice(0.5 * KM_PER_DEGREE, 1.5 * KM_PER_DEGREE).unwrap();

        let lons: Vec<f64> = seg.samples().iter().map(|s| s.lon).collect();
        assert_eq!(lons.len(), 3);
        assert!(approx_eq(lons[0], 0.5, 1e-9));
        assert_eq!(lons[1], 1.0);
        assert!(approx_eq(lons[2], 1.5, 1e-9));

        assert!(approx_eq(seg.start_km(), 0.5 * KM_PER_DEGREE, 1e-9));
        assert!(approx_eq(seg.length(), KM_PER_DEGREE, 1e-9));
        assert!(seg.cumulative_distance().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_slice_full_route_is_equivalent() {
        let route = equator_route();
        let seg = route.slice(0.0, route.total_length()).unwrap();

        assert_eq!(seg.samples(), route.samples());
        assert_eq!(seg.cumulative_distance(), route.cumulative_distance());
        assert_eq!(seg.start_km(), 0.0);
        assert_eq!(seg.end_km(), route.total_length());
    }

    #[test]
    fn test_slice_clamps_out_of_range_bounds() {
        let route = equator_route();
        let seg = route.slice(-10.0, 1e6).unwrap();
        assert_eq!(seg.start_km(), 0.0);
        assert_eq!(seg.end_km(), route.total_length());
    }

    #[test]
    fn test_slice_rejects_reversed_range() {
        let route = equator_route();
        assert!(route.slice(20.0, 10.0).unwrap_err().is_invalid_parameter());
    }

    #[test]
    fn test_zero_length_slice_is_degenerate() {
        let route = equator_route();
        let seg = route.slice(50.0, 50.0).unwrap();
        assert_eq!(seg.samples().len(), 2);
        assert!(seg.is_degenerate());
    }

    #[test]
    fn test_segment_point_at_distance_uses_parent_positions() {
        let route = equator_route();
        let seg = route.slice(KM_PER_DEGREE, 2.0 * KM_PER_DEGREE).unwrap();
        let p = seg.point_at_distance(1.25 * KM_PER_DEGREE).unwrap();
        assert!(approx_eq(p.lon, 1.25, 1e-9));
        // Below the window clamps to the window start
        assert!(approx_eq(seg.point_at_distance(0.0).unwrap().lon, 1.0, 1e-9));
    }

    #[test]
    fn test_profile() {
        let route = equator_route();
        let profile = route.profile();
        assert_eq!(profile.len(), 3);
        assert_eq!(profile[0], ProfilePoint { distance_km: 0.0, elevation: 10.0 });
        assert_eq!(profile[2].elevation, 40.0);

        let seg_profile = route.slice(KM_PER_DEGREE / 2.0, route.total_length()).unwrap().profile();
        assert!(approx_eq(seg_profile[0].distance_km, KM_PER_DEGREE / 2.0, 1e-9));
        assert!(approx_eq(seg_profile[0].elevation, 15.0, 1e-9));
    }

    #[test]
    fn test_deserialize_rebuilds_distance_table() {
        let json = r#"{
            "samples": [
                {"lat": 0.0, "lon": 0.0, "elevation": 0.0},
                {"lat": 0.0, "lon": 1.0, "elevation": 0.0}
            ],
            "cumulative_distance": []
        }"#;
        let route: Route = serde_json::from_str(json).unwrap();

        assert_eq!(route.cumulative_distance().len(), route.samples().len());
        assert!(approx_eq(route.total_length(), KM_PER_DEGREE, 1e-9));

        let hit = crate::project(&GeoPoint::new(0.0, 0.5), &route).unwrap();
        assert!(approx_eq(hit.route_position, KM_PER_DEGREE / 2.0, 1e-6));

        // Serialized form reads back to the same route
        let round = serde_json::to_string(&equator_route()).unwrap();
        assert_eq!(serde_json::from_str::<Route>(&round).unwrap(), equator_route());
    }
}
