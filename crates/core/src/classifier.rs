use crate::models::{Classification, EmergencyCategory};
use crate::taxonomy::{profile, profiles, DEFAULT_CATEGORY};

/// Keyword classification over free text. Total and deterministic.
pub fn classify_heuristic(text: &str) -> Classification {
    profile(detect_category(text)).classification()
}

/// First category in priority order with a keyword contained in `text`,
/// case-insensitively.
pub fn detect_category(text: &str) -> EmergencyCategory {
    let lower = text.to_lowercase();

    profiles()
        .find(|entry| contains_any(&lower, entry.keywords))
        .map(|entry| entry.category)
        .unwrap_or(DEFAULT_CATEGORY)
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}
