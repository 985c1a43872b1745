use serde::{Deserialize, Serialize};

use crate::error::TriageError;

/// Location substituted when a report arrives without geolocation.
pub const DEFAULT_LOCATION: GeoPoint = GeoPoint {
    latitude: 40.7128,
    longitude: -74.006,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmergencyCategory {
    #[serde(rename = "medical-cardiac")]
    MedicalCardiac,
    #[serde(rename = "medical-trauma")]
    MedicalTrauma,
    #[serde(rename = "fire")]
    Fire,
    #[serde(rename = "police")]
    Police,
    #[serde(rename = "general")]
    General,
}

impl EmergencyCategory {
    /// Heuristic priority order. The first category whose keywords match wins.
    pub const PRIORITY: [Self; 5] = [
        Self::MedicalCardiac,
        Self::Fire,
        Self::Police,
        Self::MedicalTrauma,
        Self::General,
    ];

    /// Strict parse of the glossary name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "medical-cardiac" => Some(Self::MedicalCardiac),
            "medical-trauma" => Some(Self::MedicalTrauma),
            "fire" => Some(Self::Fire),
            "police" => Some(Self::Police),
            "general" => Some(Self::General),
            _ => None,
        }
    }

    /// Lenient parse for labels coming from outside: accepts the legacy
    /// `medical` label and separator variants, and resolves anything else
    /// to `General`.
    pub fn from_label(value: &str) -> Self {
        let normalized = value.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "medical" => Self::MedicalTrauma,
            "cardiac" => Self::MedicalCardiac,
            "trauma" => Self::MedicalTrauma,
            other => Self::parse(other).unwrap_or(Self::General),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MedicalCardiac => "medical-cardiac",
            Self::MedicalTrauma => "medical-trauma",
            Self::Fire => "fire",
            Self::Police => "police",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for EmergencyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Critical,
    Urgent,
    Standard,
}

impl UrgencyLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "urgent" => Some(Self::Urgent),
            "standard" => Some(Self::Standard),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Urgent => "urgent",
            Self::Standard => "standard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// `lat,lon` as expected by place-search `ll` parameters.
    pub fn to_ll(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// Validated emergency input. Construct through [`EmergencyReport::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmergencyReport {
    text: String,
    location: GeoPoint,
    location_defaulted: bool,
}

impl EmergencyReport {
    pub fn new(text: &str, location: Option<GeoPoint>) -> Result<Self, TriageError> {
        let text = normalize_text(text);
        if text.is_empty() {
            return Err(TriageError::InvalidReport(
                "emergency description is empty".to_string(),
            ));
        }

        let (location, location_defaulted) = match location {
            Some(point) if point.is_valid() => (point, false),
            Some(point) => {
                return Err(TriageError::InvalidReport(format!(
                    "location out of range: {}, {}",
                    point.latitude, point.longitude
                )))
            }
            None => (DEFAULT_LOCATION, true),
        };

        Ok(Self {
            text,
            location,
            location_defaulted,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn location(&self) -> GeoPoint {
        self.location
    }

    pub fn location_defaulted(&self) -> bool {
        self.location_defaulted
    }
}

pub fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: EmergencyCategory,
    pub urgency: UrgencyLevel,
    pub recommended_search: String,
    pub immediate_actions: Vec<String>,
    pub narrative: String,
}

/// Query parameters for one place-search call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSearchSpec {
    pub query: &'static str,
    pub category_codes: &'static [&'static str],
}

impl ServiceSearchSpec {
    pub fn codes_param(&self) -> String {
        self.category_codes.join(",")
    }
}

/// Distance in miles, or `Unknown` when the provider did not report one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DistanceRepr", into = "DistanceRepr")]
pub enum Distance {
    Miles(f64),
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DistanceRepr {
    Miles(f64),
    Label(String),
}

impl TryFrom<DistanceRepr> for Distance {
    type Error = String;

    fn try_from(value: DistanceRepr) -> Result<Self, Self::Error> {
        match value {
            DistanceRepr::Miles(miles) if miles.is_finite() => Ok(Self::Miles(miles)),
            DistanceRepr::Miles(miles) => Err(format!("non-finite distance {miles}")),
            DistanceRepr::Label(label) if label.eq_ignore_ascii_case("unknown") => {
                Ok(Self::Unknown)
            }
            DistanceRepr::Label(label) => Err(format!("unrecognized distance label {label:?}")),
        }
    }
}

impl From<Distance> for DistanceRepr {
    fn from(value: Distance) -> Self {
        match value {
            Distance::Miles(miles) => Self::Miles(miles),
            Distance::Unknown => Self::Label("unknown".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub category: String,
    pub address: String,
    pub distance: Distance,
    pub phone: Option<String>,
    pub hours: String,
    pub specialties: Vec<String>,
    pub urgency: UrgencyLevel,
}

/// Services ordered by distance, unique by id, at most
/// [`crate::ranking::MAX_RANKED_SERVICES`] long. Only built by
/// [`crate::ranking::rank`].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct RankedServiceList(pub(crate) Vec<Service>);

impl RankedServiceList {
    pub fn as_slice(&self) -> &[Service] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Service> {
        self.0.iter()
    }
}

impl IntoIterator for RankedServiceList {
    type Item = Service;
    type IntoIter = std::vec::IntoIter<Service>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Result of one full triage cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TriageOutcome {
    Ranked {
        classification: Classification,
        services: RankedServiceList,
    },
    Failed {
        error: String,
        fallback: Classification,
    },
}

impl TriageOutcome {
    pub fn classification(&self) -> &Classification {
        match self {
            Self::Ranked { classification, .. } => classification,
            Self::Failed { fallback, .. } => fallback,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
