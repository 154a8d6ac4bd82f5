//! Example of enriching a large POI set against a long route.
//!
//! Run with: cargo run --example batch_enrichment --features parallel

use route_corridor::{
    enrich_parallel, enrich_with_config, EnrichConfig, Poi, PoiKind, Route, Sample,
};
use std::time::Instant;

fn main() {
    env_logger::init();

    println!("Batch POI Enrichment Example\n");

    // ~150 km zig-zag through the Alps, one sample every ~100 m
    let samples: Vec<Sample> = (0..1500)
        .map(|i| {
            let t = i as f64 / 1500.0;
            Sample::new(
                46.0 + 0.6 * t + 0.02 * (t * 40.0).sin(),
                7.0 + 1.5 * t,
                800.0 + 600.0 * (t * 12.0).sin().abs(),
            )
        })
        .collect();
    let route = Route::new(samples);

    println!(
        "Route: {} samples, {:.1} km\n",
        route.samples().len(),
        route.total_length()
    );

    let pois = scatter_pois(&route, 50_000);
    println!("Scattered {} POIs around the route\n", pois.len());

    let segment = match route.slice(20.0, 120.0) {
        Ok(segment) => segment,
        Err(e) => {
            eprintln!("Slice failed: {}", e);
            return;
        }
    };
    let config = EnrichConfig::with_radius(3.0);

    let start = Instant::now();
    let sequential = enrich_with_config(&pois, &segment, &config);
    let sequential_time = start.elapsed();

    let start = Instant::now();
    let parallel = enrich_parallel(&pois, &segment, &config);
    let parallel_time = start.elapsed();

    match (sequential, parallel) {
        (Ok(seq), Ok(par)) => {
            println!("Sequential: {} POIs in {:?}", seq.len(), sequential_time);
            println!("Parallel:   {} POIs in {:?}", par.len(), parallel_time);
            println!("Identical output: {}", seq == par);

            let closest = par
                .iter()
                .filter_map(|p| p.min_distance.map(|d| (d, p)))
                .min_by(|a, b| a.0.total_cmp(&b.0));
            if let Some((distance, poi)) = closest {
                println!(
                    "\nClosest: '{}' {:.3} km from the route at km {:.2}",
                    poi.name,
                    distance,
                    poi.route_position.unwrap_or(f64::NAN)
                );
            }
        }
        (Err(e), _) | (_, Err(e)) => eprintln!("Enrichment failed: {}", e),
    }
}

/// Spread POIs deterministically within ~10 km of the route
fn scatter_pois(route: &Route, count: usize) -> Vec<Poi> {
    let total = route.total_length();
    let kinds = [
        PoiKind::House,
        PoiKind::Tent,
        PoiKind::Hotel,
        PoiKind::Other("hut".to_string()),
    ];

    (0..count)
        .filter_map(|i| {
            let along = total * ((i as f64 * 0.618_033_988_7) % 1.0);
            let anchor = route.point_at_distance(along)?;
            let offset = ((i as f64 * 0.414_213_562_3) % 1.0 - 0.5) * 0.18;
            Some(Poi::new(
                i as u64,
                format!("poi-{}", i),
                anchor.lat + offset,
                anchor.lon - offset * 0.5,
                "",
                kinds[i % kinds.len()].clone(),
            ))
        })
        .collect()
}
