use std::cmp::Ordering;
use std::collections::HashSet;

use crate::models::{Distance, RankedServiceList, Service, UrgencyLevel};

pub const MAX_RANKED_SERVICES: usize = 10;
pub const METERS_PER_MILE: f64 = 1609.34;

/// Meters to miles, rounded to one decimal place.
pub fn meters_to_distance(meters: Option<f64>) -> Distance {
    match meters {
        Some(value) if value.is_finite() && value >= 0.0 => {
            Distance::Miles((value / METERS_PER_MILE * 10.0).round() / 10.0)
        }
        _ => Distance::Unknown,
    }
}

/// Urgency of a service judged only by its own category label.
pub fn urgency_for_label(label: &str) -> UrgencyLevel {
    let lower = label.to_lowercase();
    if lower.contains("hospital") || lower.contains("emergency") {
        UrgencyLevel::Critical
    } else if lower.contains("urgent care") {
        UrgencyLevel::Urgent
    } else {
        UrgencyLevel::Standard
    }
}

/// Dedup by id (first wins), tag urgency, stable-sort by distance with
/// unknown distances last, truncate.
pub fn rank<I>(services: I) -> RankedServiceList
where
    I: IntoIterator<Item = Service>,
{
    let mut seen = HashSet::new();
    let mut ranked = services
        .into_iter()
        .filter(|service| seen.insert(service.id.clone()))
        .map(|mut service| {
            service.urgency = urgency_for_label(&service.category);
            service
        })
        .collect::<Vec<_>>();

    ranked.sort_by(|a, b| compare_distance(a.distance, b.distance));
    ranked.truncate(MAX_RANKED_SERVICES);

    RankedServiceList(ranked)
}

fn compare_distance(a: Distance, b: Distance) -> Ordering {
    match (a, b) {
        (Distance::Miles(a), Distance::Miles(b)) => a.total_cmp(&b),
        (Distance::Miles(_), Distance::Unknown) => Ordering::Less,
        (Distance::Unknown, Distance::Miles(_)) => Ordering::Greater,
        (Distance::Unknown, Distance::Unknown) => Ordering::Equal,
    }
}
