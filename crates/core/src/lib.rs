pub mod classifier;
pub mod error;
pub mod models;
pub mod ranking;
pub mod taxonomy;

pub use classifier::{classify_heuristic, detect_category};
pub use error::{TriageError, CALL_911_NOTICE};
pub use models::*;
pub use ranking::{meters_to_distance, rank, urgency_for_label, MAX_RANKED_SERVICES};
pub use taxonomy::{profile, search_spec, search_spec_for_label, unavailable_fallback, CategoryProfile};
