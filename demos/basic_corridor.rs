//! Basic example of finding POIs along a GPX track.
//!
//! Run with: cargo run --example basic_corridor

use route_corridor::{
    export, sort_pois, AnalysisParams, Poi, PoiKind, RouteSession, SortColumn, SortOrder,
};

const GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="basic_corridor">
  <trk>
    <name>Lake loop</name>
    <trkseg>
      <trkpt lat="47.3769" lon="8.5417"><ele>408</ele></trkpt>
      <trkpt lat="47.3600" lon="8.5550"><ele>410</ele></trkpt>
      <trkpt lat="47.3400" lon="8.5700"><ele>415</ele></trkpt>
      <trkpt lat="47.3200" lon="8.5900"><ele>430</ele></trkpt>
      <trkpt lat="47.3000" lon="8.6100"><ele>445</ele></trkpt>
      <trkpt lat="47.2800" lon="8.6300"><ele>470</ele></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

fn main() {
    env_logger::init();

    let mut session = match RouteSession::from_track_text(GPX) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Could not read track: {}", e);
            return;
        }
    };

    println!("Route Corridor Example\n");
    println!(
        "Track: {} samples, {:.2} km\n",
        session.route().samples().len(),
        session.route().total_length()
    );

    let pois = vec![
        Poi::new(1, "Harbour Inn", 47.3610, 8.5590, "rooms by the water", PoiKind::Hotel),
        Poi::new(2, "Forest camp", 47.3150, 8.6000, "tent pitches", PoiKind::Tent),
        Poi::new(3, "Mountain hut", 47.2000, 8.9000, "too far out", PoiKind::House),
        Poi::new(4, "farm stay", 47.2850, 8.6200, "", PoiKind::House),
    ];

    let params = AnalysisParams {
        radius_km: 2.0,
        start_km: 0.0,
        end_km: 20.0,
    };

    let analysis = match session.analyze(&pois, &params) {
        Ok(analysis) => analysis,
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            return;
        }
    };

    println!(
        "Window {:.2}-{:.2} km, radius {:.1} km: {} of {} POIs\n",
        analysis.segment.start_km(),
        analysis.segment.end_km(),
        params.radius_km,
        analysis.pois.len(),
        pois.len()
    );

    let mut table = analysis.pois.clone();
    sort_pois(&mut table, SortColumn::RoutePosition, SortOrder::Asc);

    println!("{:<14} {:>10} {:>10}", "Name", "Distance", "Position");
    for poi in &table {
        println!(
            "{:<14} {:>8.2}km {:>8.2}km",
            poi.name,
            poi.min_distance.unwrap_or(f64::NAN),
            poi.route_position.unwrap_or(f64::NAN)
        );
    }

    println!("\nElevation profile:");
    for point in &analysis.profile {
        println!("  {:>6.2} km  {:>5.0} m", point.distance_km, point.elevation);
    }

    let geojson = export::analysis_geojson(&analysis.segment, &analysis.corridor, &analysis.pois);
    println!("\nGeoJSON: {} bytes", geojson.len());
}
