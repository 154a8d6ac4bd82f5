//! Display ordering for enriched POIs.
//!
//! Enrichment returns POIs in input order; tables re-sort them by a column.
//! The sort is stable, so equal keys keep their enrichment order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::enrich::Poi;

/// Sortable POI table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "camelCase")]
pub enum SortColumn {
    Name,
    MinDistance,
    RoutePosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Sort POIs in place by `column`.
///
/// Names compare case-insensitively. A POI without the numeric value (not yet
/// enriched) sorts as if the value were +∞: last ascending, first descending.
pub fn sort_pois(pois: &mut [Poi], column: SortColumn, order: SortOrder) {
    pois.sort_by(|a, b| {
        let ordering = compare(a, b, column);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

fn compare(a: &Poi, b: &Poi, column: SortColumn) -> Ordering {
    match column {
        SortColumn::Name => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
        SortColumn::MinDistance => key(a.min_distance).total_cmp(&key(b.min_distance)),
        SortColumn::RoutePosition => key(a.route_position).total_cmp(&key(b.route_position)),
    }
}

#[inline]
fn key(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::INFINITY)
}
