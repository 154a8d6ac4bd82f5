//! Corridor builder: the region within a radius of a route segment.
//!
//! The segment is laid out in a [`LocalPlane`] centred on its bounding box,
//! buffered there with geo's `Buffer` (round joins and caps) and mapped back to
//! geographic coordinates for display. Containment tests run in the plane.
//!
//! The polygon is a superset of the true corridor: every point within
//! `radius_km` (great-circle) of the segment is inside it. Two things would
//! otherwise shrink it:
//! - the plane overstates east-west distances polewards of its reference
//!   latitude, so the buffer distance is scaled by [`LocalPlane::max_stretch`];
//! - round caps and joins are polygonal, their chords sit inside the circle.
//!
//! After buffering, the distance from the polygon boundary to the segment is
//! measured. If it falls short of the scaled radius the buffer is widened and
//! rebuilt. Callers that need the exact radius (enrichment) trim with the
//! projected distance.

use geo::{BoundingRect, Buffer, Coord, Intersects, LineString, MapCoords, MultiPolygon, Point};
use log::debug;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::error::{validate_radius, CorridorError, Result};
use crate::geo_utils::{compute_bounds, LocalPlane, KM_PER_DEGREE};
use crate::route::RouteSegment;
use crate::Bounds;

/// Relative slack on top of the frame stretch, for spherical vs planar drift.
const FRAME_SLACK: f64 = 1e-3;

/// Initial widening of the buffer distance so cap chords clear the radius.
const CHORD_ALLOWANCE: f64 = 0.01;

/// Buffers attempted before giving up on reaching the radius.
const MAX_BUFFER_ATTEMPTS: usize = 4;

/// The buffered region around a route segment.
///
/// An empty corridor (from a degenerate segment) contains nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Corridor {
    radius_km: f64,
    plane: Option<LocalPlane>,
    /// Kilometer-plane polygon used for containment
    polygon_plane: MultiPolygon<f64>,
    /// Same polygon with `x = lon`, `y = lat`
    polygon_geo: MultiPolygon<f64>,
}

/// Buffer `segment` by `radius_km` kilometers.
///
/// # Errors
/// - [`CorridorError::InvalidParameter`] when `radius_km` is not a positive number
/// - [`CorridorError::Geometry`] when the buffer backend returns an unusable polygon
///   or one that cannot be widened to cover the radius
///
/// A degenerate segment yields an empty corridor rather than an error.
pub fn buffer(segment: &RouteSegment, radius_km: f64) -> Result<Corridor> {
    validate_radius(radius_km)?;

    let plane = match LocalPlane::centred_on(segment.samples()) {
        Some(plane) if !segment.is_degenerate() => plane,
        _ => return Ok(Corridor::empty(radius_km)),
    };

    let line: LineString<f64> = segment
        .samples()
        .iter()
        .map(|s| plane.to_plane(s.lat, s.lon))
        .collect();

    let bounds = compute_bounds(segment.samples());
    let poleward = bounds.min_lat.abs().max(bounds.max_lat.abs()) + radius_km / KM_PER_DEGREE;
    let required = radius_km * plane.max_stretch(poleward) * (1.0 + FRAME_SLACK);

    let route_edges = RTree::bulk_load(edges(&line));
    let mut distance = required * (1.0 + CHORD_ALLOWANCE);

    for attempt in 1..=MAX_BUFFER_ATTEMPTS {
        let polygon_plane = line.buffer(distance);
        validate_polygon(&polygon_plane)?;

        let reach = boundary_reach(&line, &route_edges, &polygon_plane);
        if reach >= required {
            let polygon_geo = polygon_plane.map_coords(|c| plane.to_geographic(c));

            debug!(
                "[RouteCorridor] Buffered {} samples by {:.3} km ({:.3} km planar, attempt {}) into {} polygon(s)",
                segment.samples().len(),
                radius_km,
                distance,
                attempt,
                polygon_plane.0.len()
            );

            return Ok(Corridor {
                radius_km,
                plane: Some(plane),
                polygon_plane,
                polygon_geo,
            });
        }

        if reach <= 0.0 {
            break;
        }

        debug!(
            "[RouteCorridor] Buffer boundary {:.6} km from route, need {:.6} km; widening",
            reach, required
        );
        distance *= required / reach * (1.0 + FRAME_SLACK);
    }

    Err(CorridorError::geometry(
        "buffer",
        format!("polygon does not reach {:.6} km from the route", radius_km),
    ))
}

fn validate_polygon(polygon: &MultiPolygon<f64>) -> Result<()> {
    if polygon.0.is_empty() {
        return Err(CorridorError::geometry("buffer", "buffer produced an empty polygon"));
    }

    for (i, p) in polygon.0.iter().enumerate() {
        let ring = p.exterior();
        if ring.0.len() < 4 {
            return Err(CorridorError::geometry(
                "buffer",
                format!("polygon {} has a ring with {} coordinates", i, ring.0.len()),
            ));
        }
        let all_finite = std::iter::once(ring)
            .chain(p.interiors())
            .flat_map(|r| r.coords())
            .all(|c| c.x.is_finite() && c.y.is_finite());
        if !all_finite {
            return Err(CorridorError::geometry(
                "buffer",
                format!("polygon {} has non-finite coordinates", i),
            ));
        }
    }

    Ok(())
}

// ============================================================================
// Boundary reach
// ============================================================================

/// A straight edge in the kilometer plane.
#[derive(Debug, Clone, Copy)]
struct PlaneEdge {
    a: [f64; 2],
    b: [f64; 2],
}

impl RTreeObject for PlaneEdge {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.a, self.b)
    }
}

impl PointDistance for PlaneEdge {
    fn distance_2(&self, p: &[f64; 2]) -> f64 {
        let (dx, dy) = (self.b[0] - self.a[0], self.b[1] - self.a[1]);
        let len_2 = dx * dx + dy * dy;
        let t = if len_2 > 0.0 {
            (((p[0] - self.a[0]) * dx + (p[1] - self.a[1]) * dy) / len_2).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let (ex, ey) = (self.a[0] + t * dx - p[0], self.a[1] + t * dy - p[1]);
        ex * ex + ey * ey
    }
}

fn edges(line: &LineString<f64>) -> Vec<PlaneEdge> {
    line.lines()
        .map(|l| PlaneEdge {
            a: [l.start.x, l.start.y],
            b: [l.end.x, l.end.y],
        })
        .collect()
}

fn nearest(tree: &RTree<PlaneEdge>, c: Coord<f64>) -> f64 {
    let p = [c.x, c.y];
    tree.nearest_neighbor(&p)
        .map_or(f64::INFINITY, |edge| edge.distance_2(&p).sqrt())
}

/// Smallest planar distance between the polygon's rings and the route.
///
/// Two non-crossing segments are closest at an endpoint of one of them, so
/// checking ring vertices against route edges and route vertices against
/// ring edges covers every pair.
fn boundary_reach(line: &LineString<f64>, route_edges: &RTree<PlaneEdge>, polygon: &MultiPolygon<f64>) -> f64 {
    let rings: Vec<&LineString<f64>> = polygon
        .0
        .iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .collect();

    let ring_edges = RTree::bulk_load(rings.iter().flat_map(|r| edges(r)).collect());

    let from_rings = rings
        .iter()
        .flat_map(|r| r.coords())
        .map(|&c| nearest(route_edges, c))
        .fold(f64::INFINITY, f64::min);

    let from_route = line
        .coords()
        .map(|&c| nearest(&ring_edges, c))
        .fold(f64::INFINITY, f64::min);

    from_rings.min(from_route)
}

impl Corridor {
    fn empty(radius_km: f64) -> Self {
        Self {
            radius_km,
            plane: None,
            polygon_plane: MultiPolygon::new(vec![]),
            polygon_geo: MultiPolygon::new(vec![]),
        }
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    pub fn is_empty(&self) -> bool {
        self.polygon_plane.0.is_empty()
    }

    /// Boundary-inclusive containment test.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        match self.plane {
            Some(plane) => self
                .polygon_plane
                .intersects(&Point::from(plane.to_plane(lat, lon))),
            None => false,
        }
    }

    /// The corridor polygon in geographic coordinates (`x = lon`, `y = lat`).
    pub fn polygon(&self) -> &MultiPolygon<f64> {
        &self.polygon_geo
    }

    /// Geographic bounding box of the polygon. `None` when empty.
    pub fn bounds(&self) -> Option<Bounds> {
        self.polygon_geo.bounding_rect().map(|rect| {
            let (min, max): (Coord<f64>, Coord<f64>) = (rect.min(), rect.max());
            Bounds {
                min_lat: min.y,
                max_lat: max.y,
                min_lon: min.x,
                max_lon: max.x,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::KM_PER_DEGREE;
    use crate::{Route, Sample};

    fn equator_segment() -> RouteSegment {
        let route = Route::new(vec![
            Sample::new(0.0, 0.0, 0.0),
            Sample::new(0.0, 0.5, 0.0),
            Sample::new(0.0, 1.0, 0.0),
        ]);
        route.slice(0.0, route.total_length()).unwrap()
    }

    fn km_north(km: f64) -> f64 {
        km / KM_PER_DEGREE
    }

    #[test]
    fn test_buffer_contains_route_and_excludes_far_points() {
        let corridor = buffer(&equator_segment(), 5.0).unwrap();
        assert!(!corridor.is_empty());

        assert!(corridor.contains(0.0, 0.5));
        assert!(corridor.contains(km_north(4.0), 0.5));
        assert!(corridor.contains(-km_north(4.0), 0.25));
        assert!(!corridor.contains(km_north(10.0), 0.5));
        assert!(!corridor.contains(0.0, -0.1));
    }

    #[test]
    fn test_round_caps_extend_past_endpoints() {
        let corridor = buffer(&equator_segment(), 5.0).unwrap();
        // 3 km beyond the start, on the route axis
        assert!(corridor.contains(0.0, -km_north(3.0)));
    }

    #[test]
    fn test_rejects_non_positive_radius() {
        let segment = equator_segment();
        for radius in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = buffer(&segment, radius).unwrap_err();
            assert!(err.is_invalid_parameter(), "radius {} accepted", radius);
        }
    }

    #[test]
    fn test_radius_checked_before_degeneracy() {
        assert!(buffer(&RouteSegment::empty(), 0.0).unwrap_err().is_invalid_parameter());
    }

    #[test]
    fn test_degenerate_segment_gives_empty_corridor() {
        let corridor = buffer(&RouteSegment::empty(), 5.0).unwrap();
        assert!(corridor.is_empty());
        assert!(corridor.bounds().is_none());
        assert!(!corridor.contains(0.0, 0.0));

        let route = Route::new(vec![Sample::new(0.0, 0.0, 0.0), Sample::new(0.0, 1.0, 0.0)]);
        let zero = route.slice(30.0, 30.0).unwrap();
        assert!(buffer(&zero, 5.0).unwrap().is_empty());
    }

    #[test]
    fn test_bounds_cover_the_radius() {
        let corridor = buffer(&equator_segment(), 5.0).unwrap();
        let bounds = corridor.bounds().unwrap();

        assert!(bounds.max_lat > km_north(4.9));
        assert!(bounds.min_lat < -km_north(4.9));
        assert!(bounds.min_lon < 0.0);
        assert!(bounds.max_lon > 1.0);
        assert!(bounds.max_lat < km_north(5.5));
    }

    /// `count` points evenly spaced on a circle of `distance_km` around (`lat`, `lon`).
    fn ring_around(lat: f64, lon: f64, distance_km: f64, count: usize) -> Vec<(f64, f64)> {
        (0..count)
            .map(|i| {
                let angle = i as f64 / count as f64 * std::f64::consts::TAU;
                let north = distance_km * angle.sin() / KM_PER_DEGREE;
                let east = distance_km * angle.cos() / (KM_PER_DEGREE * lat.to_radians().cos());
                (lat + north, lon + east)
            })
            .collect()
    }

    #[test]
    fn test_points_just_inside_round_cap_are_contained() {
        let route = Route::new(vec![Sample::new(0.0, 0.0, 0.0), Sample::new(0.0, 1.0, 0.0)]);
        let segment = route.slice(0.0, route.total_length()).unwrap();
        let corridor = buffer(&segment, 5.0).unwrap();

        for (lat, lon) in ring_around(0.0, 1.0, 4.995, 64) {
            assert!(corridor.contains(lat, lon), "({}, {}) dropped", lat, lon);
        }
        for (lat, lon) in ring_around(0.0, 0.0, 4.99, 720) {
            assert!(corridor.contains(lat, lon), "({}, {}) dropped", lat, lon);
        }
    }

    #[test]
    fn test_high_latitude_north_south_route_covers_radius() {
        // ~100 km due north from 60°N
        let end_lat = 60.0 + 100.0 / KM_PER_DEGREE;
        let samples: Vec<Sample> = (0..=10)
            .map(|i| Sample::new(60.0 + (end_lat - 60.0) * i as f64 / 10.0, 10.0, 0.0))
            .collect();
        let route = Route::new(samples);
        let segment = route.slice(0.0, route.total_length()).unwrap();
        let corridor = buffer(&segment, 5.0).unwrap();

        for lat in [60.05, 60.4, 60.44, 60.85] {
            let east = 4.95 / (KM_PER_DEGREE * f64::to_radians(lat).cos());
            assert!(corridor.contains(lat, 10.0 + east), "east of {} dropped", lat);
            assert!(corridor.contains(lat, 10.0 - east), "west of {} dropped", lat);
        }
        assert!(corridor.contains(end_lat + km_north(4.99), 10.0));
        assert!(corridor.contains(60.0 - km_north(4.99), 10.0));

        // Still a corridor, not the whole map
        let east = 6.0 / (KM_PER_DEGREE * f64::to_radians(60.4).cos());
        assert!(!corridor.contains(60.4, 10.0 + east));
        assert!(!corridor.contains(end_lat + km_north(6.0), 10.0));
    }

    #[test]
    fn test_boundary_reach_of_plain_buffer() {
        let line: LineString<f64> = vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 0.0 }].into();
        let route_edges = RTree::bulk_load(edges(&line));
        let polygon = line.buffer(2.0);

        let reach = boundary_reach(&line, &route_edges, &polygon);
        assert!(reach <= 2.0 + 1e-9);
        assert!(reach > 1.9);
    }

    #[test]
    fn test_polygon_rings_are_closed() {
        let corridor = buffer(&equator_segment(), 1.0).unwrap();
        for polygon in &corridor.polygon().0 {
            let ring = &polygon.exterior().0;
            assert!(ring.len() >= 4);
            assert_eq!(ring.first(), ring.last());
        }
    }
}
