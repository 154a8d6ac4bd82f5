//! Mobile bindings (uniffi).
//!
//! Thin wrappers over the library entry points. Geometry crosses the boundary
//! as GeoJSON strings so the map layer can hand it straight to its renderer.

use std::time::Instant;

use log::{debug, info};

use crate::export::{corridor_feature, pois_feature_collection, segment_feature};
use crate::{
    enrich::EnrichConfig, init_logging, parse_track, sort_pois, AnalysisParams, CorridorError,
    Poi, ProfilePoint, Route, RouteSession, Sample, SortColumn, SortOrder,
};

/// Result of one analysis, shaped for a presentation layer.
#[derive(Debug, Clone, uniffi::Record)]
pub struct AnalysisResult {
    /// Route segment as a GeoJSON `Feature` (LineString)
    pub segment_geojson: String,
    /// Corridor as a GeoJSON `Feature` (MultiPolygon)
    pub corridor_geojson: String,
    /// Enriched POIs as a GeoJSON `FeatureCollection`
    pub pois_geojson: String,
    /// Enriched POIs in input order
    pub pois: Vec<Poi>,
    /// Elevation profile of the whole route
    pub route_profile: Vec<ProfilePoint>,
    pub route_length_km: f64,
}

/// Parse GPX text into track samples.
#[uniffi::export]
pub fn parse_track_samples(gpx: String) -> Result<Vec<Sample>, CorridorError> {
    init_logging();
    info!("[RouteCorridor] parse_track_samples called with {} bytes", gpx.len());
    let samples = parse_track(&gpx)?;
    info!("[RouteCorridor] Parsed {} samples", samples.len());
    Ok(samples)
}

/// Elevation profile of a parsed track.
#[uniffi::export]
pub fn route_profile(samples: Vec<Sample>) -> Vec<ProfilePoint> {
    init_logging();
    Route::new(samples).profile()
}

/// Run the full pipeline on GPX text: slice, buffer, enrich.
#[uniffi::export]
pub fn analyze_track(
    gpx: String,
    pois: Vec<Poi>,
    params: AnalysisParams,
) -> Result<AnalysisResult, CorridorError> {
    init_logging();
    info!(
        "[RouteCorridor] analyze_track called: {} bytes, {} POIs, radius {:.2} km, window {:.2}-{:.2} km",
        gpx.len(),
        pois.len(),
        params.radius_km,
        params.start_km,
        params.end_km
    );

    let start = Instant::now();
    let mut session = RouteSession::from_track_text(&gpx)?;
    let result = build_result(&mut session, &pois, &params)?;

    info!(
        "[RouteCorridor] analyze_track found {} POIs in {:?}",
        result.pois.len(),
        start.elapsed()
    );
    Ok(result)
}

/// Run the pipeline on already parsed samples.
#[uniffi::export]
pub fn analyze_samples(
    samples: Vec<Sample>,
    pois: Vec<Poi>,
    params: AnalysisParams,
) -> Result<AnalysisResult, CorridorError> {
    init_logging();
    debug!(
        "[RouteCorridor] analyze_samples called: {} samples, {} POIs",
        samples.len(),
        pois.len()
    );
    let mut session = RouteSession::from_samples(samples);
    build_result(&mut session, &pois, &params)
}

/// Enrich POIs against a window of the route, spread over threads.
#[uniffi::export]
pub fn enrich_pois(
    samples: Vec<Sample>,
    pois: Vec<Poi>,
    params: AnalysisParams,
) -> Result<Vec<Poi>, CorridorError> {
    init_logging();
    info!(
        "[RouteCorridor] enrich_pois called with {} samples, {} POIs",
        samples.len(),
        pois.len()
    );

    let start = Instant::now();
    let route = Route::new(samples);
    let segment = route.slice(params.start_km, params.end_km)?;
    let config = EnrichConfig::with_radius(params.radius_km);

    #[cfg(feature = "parallel")]
    let enriched = {
        info!("[RouteCorridor] Using PARALLEL enrichment (rayon)");
        crate::enrich::enrich_parallel(&pois, &segment, &config)?
    };

    #[cfg(not(feature = "parallel"))]
    let enriched = {
        info!("[RouteCorridor] Using sequential enrichment");
        crate::enrich::enrich_with_config(&pois, &segment, &config)?
    };

    info!(
        "[RouteCorridor] Enriched {} of {} POIs in {:?}",
        enriched.len(),
        pois.len(),
        start.elapsed()
    );
    Ok(enriched)
}

/// Sort POIs for a table view.
#[uniffi::export]
pub fn sort_poi_table(pois: Vec<Poi>, column: SortColumn, order: SortOrder) -> Vec<Poi> {
    let mut pois = pois;
    sort_pois(&mut pois, column, order);
    pois
}

/// Default analysis parameters (5 km radius, first 20 km).
#[uniffi::export]
pub fn default_analysis_params() -> AnalysisParams {
    init_logging();
    info!("[RouteCorridor] default_analysis_params called - Rust is active!");
    AnalysisParams::default()
}

fn build_result(
    session: &mut RouteSession,
    pois: &[Poi],
    params: &AnalysisParams,
) -> Result<AnalysisResult, CorridorError> {
    let analysis = session.analyze(pois, params)?;

    Ok(AnalysisResult {
        segment_geojson: segment_feature(&analysis.segment).to_string(),
        corridor_geojson: corridor_feature(&analysis.corridor).to_string(),
        pois_geojson: pois_feature_collection(&analysis.pois).to_string(),
        pois: analysis.pois.clone(),
        route_profile: session.profile(),
        route_length_km: session.route().total_length(),
    })
}
