//! Recompute-on-change entry point for a presentation layer.
//!
//! A [`RouteSession`] holds the parsed route for as long as a track is loaded.
//! Every change of POIs, radius or position range calls [`RouteSession::analyze`],
//! which replaces segment, corridor and enriched POIs wholesale. When the inputs
//! equal those of the previous call, the previous result is returned; a hash of
//! the inputs is compared first so a change is usually spotted without walking
//! the POI list.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::corridor::{buffer, Corridor};
use crate::enrich::{enrich_cancellable, enrich_with_config, EnrichConfig, Poi};
use crate::error::{validate_radius, Result};
use crate::route::{ProfilePoint, Route, RouteSegment};
use crate::track::parse_track;
use crate::Sample;

/// User-controlled analysis inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct AnalysisParams {
    /// Corridor radius in km. Default: 5.0
    pub radius_km: f64,
    /// Window start, km along the route. Default: 0.0
    pub start_km: f64,
    /// Window end, km along the route (clamped to the route length). Default: 20.0
    pub end_km: f64,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            radius_km: 5.0,
            start_km: 0.0,
            end_km: 20.0,
        }
    }
}

/// Everything derived for one set of inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub segment: RouteSegment,
    pub corridor: Corridor,
    /// Enriched POIs in input order
    pub pois: Vec<Poi>,
    /// Elevation profile of the segment
    pub profile: Vec<ProfilePoint>,
}

/// A loaded track plus the most recent analysis of it.
#[derive(Debug, Clone)]
pub struct RouteSession {
    route: Route,
    config: EnrichConfig,
    last: Option<CachedAnalysis>,
}

/// The previous analysis with the inputs it was computed from.
#[derive(Debug, Clone)]
struct CachedAnalysis {
    key: u64,
    params: AnalysisParams,
    pois: Vec<Poi>,
    analysis: Arc<Analysis>,
}

impl CachedAnalysis {
    fn matches(&self, key: u64, pois: &[Poi], params: &AnalysisParams) -> bool {
        self.key == key && self.params == *params && self.pois == pois
    }
}

impl RouteSession {
    /// Parse track text and start a session on it.
    pub fn from_track_text(text: &str) -> Result<Self> {
        Ok(Self::from_samples(parse_track(text)?))
    }

    pub fn from_samples(samples: Vec<Sample>) -> Self {
        let route = Route::new(samples);
        info!(
            "[RouteCorridor] Session started: {} samples, {:.2} km",
            route.samples().len(),
            route.total_length()
        );
        Self {
            route,
            config: EnrichConfig::default(),
            last: None,
        }
    }

    /// Override tolerance and prefilter settings. The radius always comes
    /// from [`AnalysisParams`].
    pub fn with_config(mut self, config: EnrichConfig) -> Self {
        self.config = config;
        self.last = None;
        self
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Elevation profile of the whole route.
    pub fn profile(&self) -> Vec<ProfilePoint> {
        self.route.profile()
    }

    /// Drop the cached analysis.
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    /// Analyse `pois` against the window and radius in `params`.
    ///
    /// Returns the cached result when `pois` and `params` are unchanged since
    /// the previous call.
    pub fn analyze(&mut self, pois: &[Poi], params: &AnalysisParams) -> Result<Arc<Analysis>> {
        self.run(pois, params, None)
    }

    /// Like [`RouteSession::analyze`], giving up with
    /// [`crate::CorridorError::Cancelled`] once `cancel` is set.
    pub fn analyze_cancellable(
        &mut self,
        pois: &[Poi],
        params: &AnalysisParams,
        cancel: &AtomicBool,
    ) -> Result<Arc<Analysis>> {
        self.run(pois, params, Some(cancel))
    }

    fn run(
        &mut self,
        pois: &[Poi],
        params: &AnalysisParams,
        cancel: Option<&AtomicBool>,
    ) -> Result<Arc<Analysis>> {
        let key = input_hash(pois, params);
        if let Some(cached) = &self.last {
            if cached.matches(key, pois, params) {
                debug!("[RouteCorridor] Inputs unchanged, reusing previous analysis");
                return Ok(Arc::clone(&cached.analysis));
            }
        }

        let start = Instant::now();
        validate_radius(params.radius_km)?;

        let segment = self.route.slice(params.start_km, params.end_km)?;
        let corridor = buffer(&segment, params.radius_km)?;

        let config = EnrichConfig {
            radius_km: params.radius_km,
            ..self.config.clone()
        };
        let enriched = match cancel {
            Some(flag) => enrich_cancellable(pois, &segment, &config, flag)?,
            None => enrich_with_config(pois, &segment, &config)?,
        };

        let analysis = Arc::new(Analysis {
            profile: segment.profile(),
            segment,
            corridor,
            pois: enriched,
        });

        info!(
            "[RouteCorridor] Analysed {:.2}-{:.2} km at {:.2} km radius: {} of {} POIs in {:?}",
            analysis.segment.start_km(),
            analysis.segment.end_km(),
            params.radius_km,
            analysis.pois.len(),
            pois.len(),
            start.elapsed()
        );

        self.last = Some(CachedAnalysis {
            key,
            params: *params,
            pois: pois.to_vec(),
            analysis: Arc::clone(&analysis),
        });
        Ok(analysis)
    }
}

fn input_hash(pois: &[Poi], params: &AnalysisParams) -> u64 {
    let mut hasher = DefaultHasher::new();

    params.radius_km.to_bits().hash(&mut hasher);
    params.start_km.to_bits().hash(&mut hasher);
    params.end_km.to_bits().hash(&mut hasher);

    pois.len().hash(&mut hasher);
    for poi in pois {
        poi.id.hash(&mut hasher);
        poi.name.hash(&mut hasher);
        poi.lat.to_bits().hash(&mut hasher);
        poi.lon.to_bits().hash(&mut hasher);
        poi.description.hash(&mut hasher);
        poi.kind.hash(&mut hasher);
    }

    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::PoiKind;
    use crate::geo_utils::KM_PER_DEGREE;
    use crate::CorridorError;

    const GPX: &str = r#"<?xml version="1.0"?>
<gpx version="1.1" creator="test">
  <trk><trkseg>
    <trkpt lat="0.0" lon="0.0"><ele>100</ele></trkpt>
    <trkpt lat="0.0" lon="0.1"><ele>120</ele></trkpt>
    <trkpt lat="0.0" lon="0.2"><ele>110</ele></trkpt>
    <trkpt lat="0.0" lon="0.3"><ele>150</ele></trkpt>
  </trkseg></trk>
</gpx>"#;

    fn pois() -> Vec<Poi> {
        vec![
            Poi::new(1, "Early", 1.0 / KM_PER_DEGREE, 0.05, "", PoiKind::House),
            Poi::new(2, "Late", 1.0 / KM_PER_DEGREE, 0.28, "", PoiKind::Hotel),
            Poi::new(3, "Remote", 0.5, 0.1, "", PoiKind::Tent),
        ]
    }

    #[test]
    fn test_analyze_window() {
        let mut session = RouteSession::from_track_text(GPX).unwrap();
        assert_eq!(session.route().samples().len(), 4);

        let params = AnalysisParams { radius_km: 2.0, start_km: 0.0, end_km: 20.0 };
        let analysis = session.analyze(&pois(), &params).unwrap();

        let ids: Vec<u64> = analysis.pois.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1]);
        assert!(!analysis.corridor.is_empty());
        assert!((analysis.segment.end_km() - 20.0).abs() < 1e-9);
        assert_eq!(analysis.profile.first().map(|p| p.elevation), Some(100.0));
    }

    #[test]
    fn test_full_route_window() {
        let mut session = RouteSession::from_track_text(GPX).unwrap();
        let total = session.route().total_length();
        let params = AnalysisParams { radius_km: 2.0, start_km: 0.0, end_km: total };

        let analysis = session.analyze(&pois(), &params).unwrap();
        let ids: Vec<u64> = analysis.pois.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(session.profile().len(), 4);
    }

    #[test]
    fn test_unchanged_inputs_reuse_result() {
        let mut session = RouteSession::from_track_text(GPX).unwrap();
        let params = AnalysisParams::default();

        let first = session.analyze(&pois(), &params).unwrap();
        let second = session.analyze(&pois(), &params).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let wider = AnalysisParams { radius_km: 8.0, ..params };
        let third = session.analyze(&pois(), &wider).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));

        session.invalidate();
        let fourth = session.analyze(&pois(), &wider).unwrap();
        assert!(!Arc::ptr_eq(&third, &fourth));
        assert_eq!(*third, *fourth);
    }

    #[test]
    fn test_equal_hash_with_different_inputs_recomputes() {
        let mut session = RouteSession::from_track_text(GPX).unwrap();
        let params = AnalysisParams::default();
        let first = session.analyze(&pois(), &params).unwrap();

        // Make the cached entry's hash collide with different POIs
        let moved = vec![Poi::new(9, "Moved", 1.0 / KM_PER_DEGREE, 0.15, "", PoiKind::Tent)];
        if let Some(cached) = session.last.as_mut() {
            cached.key = input_hash(&moved, &params);
        }

        let second = session.analyze(&moved, &params).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        let ids: Vec<u64> = second.pois.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![9]);

        // The recomputed entry is reused as usual
        let third = session.analyze(&moved, &params).unwrap();
        assert!(Arc::ptr_eq(&second, &third));
    }

    #[test]
    fn test_invalid_params() {
        let mut session = RouteSession::from_track_text(GPX).unwrap();

        let bad_radius = AnalysisParams { radius_km: 0.0, ..AnalysisParams::default() };
        assert!(session.analyze(&pois(), &bad_radius).unwrap_err().is_invalid_parameter());

        let reversed = AnalysisParams { start_km: 10.0, end_km: 5.0, ..AnalysisParams::default() };
        assert!(session.analyze(&pois(), &reversed).unwrap_err().is_invalid_parameter());
    }

    #[test]
    fn test_empty_track_is_not_an_error() {
        let mut session = RouteSession::from_track_text("<gpx></gpx>").unwrap();
        let analysis = session.analyze(&pois(), &AnalysisParams::default()).unwrap();
        assert!(analysis.pois.is_empty());
        assert!(analysis.corridor.is_empty());
        assert!(analysis.segment.is_degenerate());
    }

    #[test]
    fn test_parse_error_propagates() {
        let err = RouteSession::from_track_text("<gpx><trk></gpx>").unwrap_err();
        assert!(matches!(err, CorridorError::Parse { .. }));
    }

    #[test]
    fn test_cancelled_analysis_is_not_cached() {
        let mut session = RouteSession::from_track_text(GPX).unwrap();
        let params = AnalysisParams::default();

        let cancel = AtomicBool::new(true);
        assert!(session.analyze_cancellable(&pois(), &params, &cancel).is_err());

        let analysis = session.analyze(&pois(), &params).unwrap();
        assert_eq!(analysis.pois.len(), 1);
    }
}
