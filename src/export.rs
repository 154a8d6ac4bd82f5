//! GeoJSON output for map rendering.
//!
//! Positions are written `[lon, lat]` as GeoJSON requires; elevation is not
//! written.

use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};

use crate::corridor::Corridor;
use crate::enrich::Poi;
use crate::route::RouteSegment;

/// The segment as a `LineString` feature with its window in the properties.
pub fn segment_feature(segment: &RouteSegment) -> Feature {
    let line: Vec<Vec<f64>> = segment.samples().iter().map(|s| vec![s.lon, s.lat]).collect();

    let mut properties = JsonObject::new();
    properties.insert("startKm".to_string(), JsonValue::from(segment.start_km()));
    properties.insert("endKm".to_string(), JsonValue::from(segment.end_km()));

    feature(Value::LineString(line), properties, None)
}

/// The corridor as a `MultiPolygon` feature.
pub fn corridor_feature(corridor: &Corridor) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("radiusKm".to_string(), JsonValue::from(corridor.radius_km()));

    feature(Value::from(corridor.polygon()), properties, None)
}

/// One `Point` feature per POI, keyed by POI id.
///
/// Properties carry the POI fields, plus `minDistance`, `routePosition` and
/// `closestPoint` for enriched POIs.
pub fn pois_feature_collection(pois: &[Poi]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: pois.iter().map(poi_feature).collect(),
        foreign_members: None,
    }
}

fn poi_feature(poi: &Poi) -> Feature {
    // The POI's own JSON shape minus the coordinates, which become the geometry
    let mut properties = match serde_json::to_value(poi) {
        Ok(JsonValue::Object(map)) => map,
        _ => JsonObject::new(),
    };
    properties.remove("lat");
    properties.remove("lon");

    feature(
        Value::Point(vec![poi.lon, poi.lat]),
        properties,
        Some(Id::Number(poi.id.into())),
    )
}

fn feature(value: Value, properties: JsonObject, id: Option<Id>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Segment, corridor and POIs as one serialized `FeatureCollection`.
pub fn analysis_geojson(segment: &RouteSegment, corridor: &Corridor, pois: &[Poi]) -> String {
    let mut features = vec![segment_feature(segment), corridor_feature(corridor)];
    features.extend(pois.iter().map(poi_feature));

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
    .to_string()
}
