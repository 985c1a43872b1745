use serde::Serialize;

use crate::models::{Classification, EmergencyCategory, ServiceSearchSpec, UrgencyLevel};

/// Everything the engine knows about one emergency category.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryProfile {
    pub category: EmergencyCategory,
    pub keywords: &'static [&'static str],
    pub search: ServiceSearchSpec,
    pub default_urgency: UrgencyLevel,
    pub actions: &'static [&'static str],
    pub narrative: &'static str,
}

impl CategoryProfile {
    /// Canned classification for this category.
    pub fn classification(&self) -> Classification {
        Classification {
            category: self.category,
            urgency: self.default_urgency,
            recommended_search: self.search.query.to_string(),
            immediate_actions: self.actions.iter().map(|step| step.to_string()).collect(),
            narrative: self.narrative.to_string(),
        }
    }
}

pub const DEFAULT_CATEGORY: EmergencyCategory = EmergencyCategory::General;

const HOSPITAL_SEARCH: ServiceSearchSpec = ServiceSearchSpec {
    query: "hospital",
    category_codes: &["15014"],
};

static MEDICAL_CARDIAC: CategoryProfile = CategoryProfile {
    category: EmergencyCategory::MedicalCardiac,
    keywords: &["heart", "chest pain", "cardiac"],
    search: ServiceSearchSpec {
        query: "hospital emergency room",
        category_codes: &["15014"],
    },
    default_urgency: UrgencyLevel::Critical,
    actions: &[
        "Call 911 immediately if symptoms are severe",
        "Have the patient sit down and rest",
        "If prescribed, take nitroglycerin",
        "Chew aspirin if not allergic",
    ],
    narrative: "CARDIAC EMERGENCY DETECTED. Call 911 immediately if symptoms are severe. \
                Keep the patient seated and calm while help is on the way. \
                The nearest hospitals with emergency rooms are listed below.",
};

static MEDICAL_TRAUMA: CategoryProfile = CategoryProfile {
    category: EmergencyCategory::MedicalTrauma,
    keywords: &["accident", "injury", "injured", "bleeding"],
    search: ServiceSearchSpec {
        query: "hospital emergency room",
        category_codes: &["15014", "15013"],
    },
    default_urgency: UrgencyLevel::Critical,
    actions: &[
        "Call 911 for severe injuries",
        "Apply direct pressure to bleeding",
        "Do not move the patient unless necessary",
        "Keep the patient warm and calm",
    ],
    narrative: "TRAUMA EMERGENCY DETECTED. Call 911 for severe injuries and apply direct \
                pressure to any bleeding. The nearest hospitals and urgent care centers \
                are listed below.",
};

static FIRE: CategoryProfile = CategoryProfile {
    category: EmergencyCategory::Fire,
    keywords: &["fire", "smoke", "burning"],
    search: ServiceSearchSpec {
        query: "fire station",
        category_codes: &["15015"],
    },
    default_urgency: UrgencyLevel::Critical,
    actions: &[
        "Call 911 immediately",
        "Evacuate the building safely",
        "Stay low if there is smoke",
        "Do not use elevators",
        "Meet at the designated assembly point",
    ],
    narrative: "FIRE EMERGENCY DETECTED. Call 911 and get everyone out. \
                Do not re-enter the building until the fire department clears it. \
                The nearest fire stations are listed below.",
};

static POLICE: CategoryProfile = CategoryProfile {
    category: EmergencyCategory::Police,
    keywords: &[
        "crime", "theft", "assault", "break-in", "robbery", "burglar", "intruder",
    ],
    search: ServiceSearchSpec {
        query: "police station",
        category_codes: &["15016"],
    },
    default_urgency: UrgencyLevel::Urgent,
    actions: &[
        "Call 911 if you are in danger or a crime is in progress",
        "Move to a safe location",
        "Do not confront the suspect",
        "Note descriptions of people and vehicles involved",
    ],
    narrative: "SAFETY EMERGENCY DETECTED. If a crime is in progress or you are in danger, \
                call 911 now and move somewhere safe. The nearest police stations are \
                listed below.",
};

static GENERAL: CategoryProfile = CategoryProfile {
    category: EmergencyCategory::General,
    keywords: &[],
    search: HOSPITAL_SEARCH,
    default_urgency: UrgencyLevel::Urgent,
    actions: &[
        "Call 911 if life-threatening",
        "Stay calm",
        "Provide clear location",
    ],
    narrative: "I've analyzed your emergency situation and found the nearest appropriate \
                emergency services. For life-threatening emergencies, always call 911 first.",
};

pub fn profile(category: EmergencyCategory) -> &'static CategoryProfile {
    match category {
        EmergencyCategory::MedicalCardiac => &MEDICAL_CARDIAC,
        EmergencyCategory::MedicalTrauma => &MEDICAL_TRAUMA,
        EmergencyCategory::Fire => &FIRE,
        EmergencyCategory::Police => &POLICE,
        EmergencyCategory::General => &GENERAL,
    }
}

/// All profiles in heuristic priority order.
pub fn profiles() -> impl Iterator<Item = &'static CategoryProfile> {
    EmergencyCategory::PRIORITY.into_iter().map(profile)
}

pub fn search_spec(category: EmergencyCategory) -> &'static ServiceSearchSpec {
    &profile(category).search
}

/// Search parameters for a free-form label. Unrecognized labels get the
/// hospital search.
pub fn search_spec_for_label(label: &str) -> &'static ServiceSearchSpec {
    search_spec(EmergencyCategory::from_label(label))
}

/// Returned when service lookup fails outright and nothing else can be said.
pub fn unavailable_fallback() -> Classification {
    Classification {
        category: DEFAULT_CATEGORY,
        urgency: UrgencyLevel::Urgent,
        recommended_search: HOSPITAL_SEARCH.query.to_string(),
        immediate_actions: GENERAL.actions.iter().map(|step| step.to_string()).collect(),
        narrative: "Unable to find nearby emergency services at this time. \
                    For life-threatening emergencies, call 911 immediately."
            .to_string(),
    }
}
