pub mod ai;
pub mod places;

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use triage_core::{
    rank, search_spec_for_label, unavailable_fallback, EmergencyReport, GeoPoint,
    RankedServiceList, TriageError, TriageOutcome,
};
use triage_observability::AppMetrics;
use triage_providers::{CompletionClient, PlaceSearchClient};
use uuid::Uuid;

pub use ai::{AiClassifier, ClassificationSource, ClassifierVerdict, DegradeReason};
pub use places::PlaceSearchAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageStage {
    Idle,
    Classifying,
    Searching,
    Ranked,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    pub ai_classification: bool,
    pub ai_model: Option<String>,
    pub place_search: bool,
}

/// Runs emergency reports through classification, place search and
/// ranking. Holds no per-request state.
#[derive(Clone)]
pub struct TriageAgent {
    classifier: AiClassifier,
    places: PlaceSearchAdapter,
    metrics: Arc<AppMetrics>,
}

impl TriageAgent {
    pub fn new(
        completion: Option<Arc<dyn CompletionClient>>,
        place_search: Option<Arc<dyn PlaceSearchClient>>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            classifier: AiClassifier::new(completion, metrics.clone()),
            places: PlaceSearchAdapter::new(place_search),
            metrics,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            ai_classification: self.classifier.is_configured(),
            ai_model: self.classifier.model_name().map(str::to_string),
            place_search: self.places.is_configured(),
        }
    }

    /// Full cycle. `InvalidReport` is the only error; a failed search comes
    /// back as [`TriageOutcome::Failed`].
    #[instrument(skip_all)]
    pub async fn triage(
        &self,
        text: &str,
        location: Option<GeoPoint>,
    ) -> Result<TriageOutcome, TriageError> {
        self.metrics.inc_request();
        let report = EmergencyReport::new(text, location)?;
        Ok(self.run(report).await)
    }

    pub async fn run(&self, report: EmergencyReport) -> TriageOutcome {
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        enter(request_id, TriageStage::Idle);

        enter(request_id, TriageStage::Classifying);
        let verdict = self.classifier.classify_detailed(&report).await;
        let classification = verdict.classification;

        enter(request_id, TriageStage::Searching);
        let outcome = match self
            .places
            .search(report.location(), classification.category)
            .await
        {
            Ok(services) => {
                let services = rank(services);
                self.metrics.add_services_returned(services.len());
                enter(request_id, TriageStage::Ranked);
                info!(
                    request_id = %request_id,
                    category = %classification.category,
                    urgency = classification.urgency.as_str(),
                    source = ?verdict.source,
                    location_defaulted = report.location_defaulted(),
                    services = services.len(),
                    "triage ranked"
                );
                TriageOutcome::Ranked {
                    classification,
                    services,
                }
            }
            Err(error) => {
                self.metrics.inc_search_failure();
                enter(request_id, TriageStage::Failed);
                warn!(
                    request_id = %request_id,
                    category = %classification.category,
                    error = %error,
                    "triage failed at service search"
                );
                TriageOutcome::Failed {
                    error: error.to_string(),
                    fallback: unavailable_fallback(),
                }
            }
        };

        self.metrics.observe_latency(started.elapsed());
        outcome
    }

    /// Classification only. Never fails once the report is valid.
    #[instrument(skip_all)]
    pub async fn classify(
        &self,
        text: &str,
        location: Option<GeoPoint>,
    ) -> Result<ClassifierVerdict, TriageError> {
        self.metrics.inc_request();
        let report = EmergencyReport::new(text, location)?;
        Ok(self.classifier.classify_detailed(&report).await)
    }

    /// Place search and ranking for an arbitrary category label. Unknown
    /// labels search hospitals.
    #[instrument(skip(self))]
    pub async fn find_services(
        &self,
        location: GeoPoint,
        category_label: &str,
    ) -> Result<RankedServiceList, TriageError> {
        self.metrics.inc_request();
        if !location.is_valid() {
            return Err(TriageError::InvalidReport(format!(
                "location out of range: {}, {}",
                location.latitude, location.longitude
            )));
        }

        let spec = search_spec_for_label(category_label);
        match self.places.search_with_spec(location, spec).await {
            Ok(services) => {
                let services = rank(services);
                self.metrics.add_services_returned(services.len());
                Ok(services)
            }
            Err(error) => {
                self.metrics.inc_search_failure();
                warn!(error = %error, "service lookup failed");
                Err(error)
            }
        }
    }
}

fn enter(request_id: Uuid, stage: TriageStage) {
    debug!(request_id = %request_id, stage = ?stage, "triage stage");
}
