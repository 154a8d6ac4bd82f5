//! Nearest-point projection onto a route polyline.
//!
//! For every consecutive vertex pair the query point is projected onto the
//! segment (clamped to the segment, not the infinite line) in a local
//! cos-latitude-scaled plane, and the great-circle distance to that projected
//! location is measured. The closest segment wins; on a tie (within
//! [`TIE_EPSILON_KM`]) the earliest segment wins, so route positions are
//! deterministic and follow route order.
//!
//! The per-query loop is O(n) and allocation-free: enrichment runs it once per
//! POI, which makes it the dominant cost of the pipeline.

use serde::{Deserialize, Serialize};

use crate::geo_utils::haversine_distance;
use crate::route::{Route, RouteSegment};
use crate::{GeoPoint, LatLon, Sample};

/// A later segment must be closer by more than this to replace the best.
pub const TIE_EPSILON_KM: f64 = 1e-9;

// Squared planar length (degrees²) below which a segment is treated as a point
const DEGENERATE_SEGMENT_SQ: f64 = 1e-24;

/// A polyline with a cumulative-distance table, i.e. a [`Route`] or a [`RouteSegment`].
pub trait Polyline {
    fn samples(&self) -> &[Sample];

    /// Cumulative distance (km) per sample, same length as [`Polyline::samples`].
    fn cumulative_distance(&self) -> &[f64];
}

impl Polyline for Route {
    fn samples(&self) -> &[Sample] {
        Route::samples(self)
    }

    fn cumulative_distance(&self) -> &[f64] {
        Route::cumulative_distance(self)
    }
}

impl Polyline for RouteSegment {
    fn samples(&self) -> &[Sample] {
        RouteSegment::samples(self)
    }

    fn cumulative_distance(&self) -> &[f64] {
        RouteSegment::cumulative_distance(self)
    }
}

/// Result of projecting a point onto a polyline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Closest point on the polyline
    pub point: GeoPoint,
    /// Great-circle distance from the query point to `point`, in km
    pub distance_to_route: f64,
    /// Route position of `point`: km from the start of the parent route
    pub route_position: f64,
    /// Index of the winning segment's first vertex
    pub segment_index: usize,
}

/// Project `point` onto the closest location of `line`.
///
/// Returns `None` for an empty polyline. A single-vertex polyline projects
/// onto that vertex.
///
/// # Example
/// ```
/// use route_corridor::{project, GeoPoint, Route, Sample};
///
/// let route = Route::new(vec![
///     Sample::new(0.0, 0.0, 0.0),
///     Sample::new(0.0, 1.0, 0.0),
///     Sample::new(0.0, 2.0, 0.0),
/// ]);
///
/// let hit = project(&GeoPoint::new(0.001, 0.5), &route).unwrap();
/// assert!((hit.route_position - 55.6).abs() < 0.1);
/// assert!((hit.distance_to_route - 0.111).abs() < 0.001);
/// ```
pub fn project<P: LatLon, L: Polyline + ?Sized>(point: &P, line: &L) -> Option<Projection> {
    let samples = line.samples();
    let cumulative = line.cumulative_distance();
    let first = samples.first()?;

    let mut best = Projection {
        point: first.point(),
        distance_to_route: haversine_distance(point, first),
        route_position: cumulative[0],
        segment_index: 0,
    };

    for (i, pair) in samples.windows(2).enumerate() {
        let (a, b) = (&pair[0], &pair[1]);
        let t = segment_parameter(point, a, b);
        let projected = GeoPoint::new(a.lat + t * (b.lat - a.lat), a.lon + t * (b.lon - a.lon));
        let distance = haversine_distance(point, &projected);

        // Strictly closer (beyond tolerance) to replace: earliest segment wins ties.
        // Segment 0 always replaces the vertex seed, which is its own t = 0 case.
        if i == 0 || distance < best.distance_to_route - TIE_EPSILON_KM {
            best = Projection {
                point: projected,
                distance_to_route: distance,
                route_position: cumulative[i] + t * (cumulative[i + 1] - cumulative[i]),
                segment_index: i,
            };
        }
    }

    Some(best)
}

/// Clamped position (0..=1) of the point's perpendicular foot on segment a→b.
///
/// Uses a planar approximation scaled by the segment's mean-latitude cosine,
/// accurate for the short segments of a recorded track.
#[inline]
fn segment_parameter<P: LatLon>(p: &P, a: &Sample, b: &Sample) -> f64 {
    let cos_lat = ((a.lat + b.lat) / 2.0).to_radians().cos();

    let dx = (b.lon - a.lon) * cos_lat;
    let dy = b.lat - a.lat;
    let px = (p.lon() - a.lon) * cos_lat;
    let py = p.lat() - a.lat;

    let seg_len_sq = dx * dx + dy * dy;
    if seg_len_sq < DEGENERATE_SEGMENT_SQ {
        return 0.0;
    }

    ((px * dx + py * dy) / seg_len_sq).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::KM_PER_DEGREE;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn route(points: &[(f64, f64)]) -> Route {
        Route::new(points.iter().map(|&(lat, lon)| Sample::new(lat, lon, 0.0)).collect())
    }

    #[test]
    fn test_midpoint_scenario() {
        let r = route(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]);
        let hit = project(&GeoPoint::new(0.001, 0.5), &r).unwrap();

        assert!(approx_eq(hit.route_position, 0.5 * KM_PER_DEGREE, 1e-6));
        assert!(approx_eq(hit.distance_to_route, 0.001 * KM_PER_DEGREE, 1e-6));
        assert!(approx_eq(hit.point.lat, 0.0, 1e-12));
        assert!(approx_eq(hit.point.lon, 0.5, 1e-9));
        assert_eq!(hit.segment_index, 0);
    }

    #[test]
    fn test_point_on_route_has_zero_distance() {
        let r = route(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]);
        let hit = project(&GeoPoint::new(0.0, 1.25), &r).unwrap();
        assert!(hit.distance_to_route < 1e-9);
        assert!(approx_eq(hit.route_position, 1.25 * KM_PER_DEGREE, 1e-6));

        let vertex = project(&GeoPoint::new(0.0, 1.0), &r).unwrap();
        assert_eq!(vertex.distance_to_route, 0.0);
    }

    #[test]
    fn test_projection_clamps_to_segment_ends() {
        let r = route(&[(48.0, 16.0), (48.0, 17.0)]);

        let before = project(&GeoPoint::new(48.0, 15.5), &r).unwrap();
        assert_eq!(before.route_position, 0.0);
        assert!(approx_eq(before.point.lon, 16.0, 1e-12));

        let after = project(&GeoPoint::new(48.0, 17.5), &r).unwrap();
        assert!(approx_eq(after.route_position, r.total_length(), 1e-9));
        assert!(approx_eq(after.point.lon, 17.0, 1e-12));
    }

    #[test]
    fn test_multi_segment_picks_closest() {
        // L-shaped: east then north
        let r = route(&[(48.0, 16.0), (48.0, 17.0), (49.0, 17.0)]);
        let hit = project(&GeoPoint::new(48.5, 17.1), &r).unwrap();

        assert_eq!(hit.segment_index, 1);
        assert!(approx_eq(hit.point.lon, 17.0, 1e-9));
        assert!(hit.route_position > r.cumulative_distance()[1]);
    }

    #[test]
    fn test_tie_prefers_earliest_segment() {
        // Out-and-back: the same line is travelled twice
        let r = route(&[(0.0, 0.0), (0.0, 1.0), (0.0, 0.0)]);
        let hit = project(&GeoPoint::new(0.01, 0.5), &r).unwrap();

        assert_eq!(hit.segment_index, 0);
        assert!(hit.route_position < r.cumulative_distance()[1]);
    }

    #[test]
    fn test_route_position_stays_in_range() {
        let r = route(&[(48.0, 11.0), (48.01, 11.02), (48.03, 11.01), (48.05, 11.04)]);
        for &(lat, lon) in &[(47.0, 10.0), (48.02, 11.015), (49.0, 12.0), (48.0, 11.0)] {
            let hit = project(&GeoPoint::new(lat, lon), &r).unwrap();
            assert!(hit.distance_to_route >= 0.0);
            assert!(hit.route_position >= 0.0);
            assert!(hit.route_position <= r.total_length());
        }
    }

    #[test]
    fn test_segment_positions_are_parent_positions() {
        let r = route(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]);
        let seg = r.slice(KM_PER_DEGREE, 2.0 * KM_PER_DEGREE).unwrap();

        let hit = project(&GeoPoint::new(0.0, 1.5), &seg).unwrap();
        assert!(approx_eq(hit.route_position, 1.5 * KM_PER_DEGREE, 1e-6));

        // A point before the window snaps to the window start
        let early = project(&GeoPoint::new(0.0, 0.2), &seg).unwrap();
        assert!(approx_eq(early.route_position, seg.start_km(), 1e-9));
    }

    #[test]
    fn test_degenerate_polylines() {
        let empty = route(&[]);
        assert!(project(&GeoPoint::new(0.0, 0.0), &empty).is_none());

        let single = route(&[(10.0, 10.0)]);
        let hit = project(&GeoPoint::new(10.0, 11.0), &single).unwrap();
        assert_eq!(hit.point, GeoPoint::new(10.0, 10.0));
        assert_eq!(hit.route_position, 0.0);
        assert!(hit.distance_to_route > 100.0);
    }

    #[test]
    fn test_zero_length_segment_is_skipped_safely() {
        let r = route(&[(0.0, 0.0), (0.0, 0.0), (0.0, 1.0)]);
        let hit = project(&GeoPoint::new(0.0, 0.5), &r).unwrap();
        assert!(hit.distance_to_route < 1e-9);
        assert!(approx_eq(hit.route_position, 0.5 * KM_PER_DEGREE, 1e-6));
    }
}
