//! Scripted collaborators shared by the integration suites.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use triage_agents::TriageAgent;
use triage_api::{build_router, ApiState};
use triage_observability::AppMetrics;
use triage_providers::{
    CompletionClient, PlaceQuery, PlaceSearchClient, ProviderError, RawCategory, RawPlace,
};

/// Returns `output` verbatim, or a decode error when there is none.
#[derive(Default)]
pub struct ScriptedCompletion {
    pub output: Option<String>,
    pub calls: AtomicUsize,
}

impl ScriptedCompletion {
    pub fn returning(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _instructions: &str, _prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output
            .clone()
            .ok_or_else(|| ProviderError::Decode("no scripted output".to_string()))
    }
}

/// Four places out of order: two hospitals, an urgent care and a pharmacy
/// with no distance.
#[derive(Default)]
pub struct StaticPlaces {
    pub calls: AtomicUsize,
}

impl StaticPlaces {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaceSearchClient for StaticPlaces {
    async fn search(&self, _query: &PlaceQuery) -> Result<Vec<RawPlace>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            place("c", "Urgent Care", Some(3380.0)),
            place("a", "Hospital", Some(1287.0)),
            place("d", "Pharmacy", None),
            place("b", "Hospital", Some(1931.0)),
        ])
    }
}

fn place(id: &str, label: &str, meters: Option<f64>) -> RawPlace {
    RawPlace {
        fsq_id: Some(id.to_string()),
        name: Some(format!("{label} #{id}")),
        categories: vec![RawCategory {
            name: Some(label.to_string()),
        }],
        distance: meters,
        tel: Some("+1-212-555-0100".to_string()),
        ..RawPlace::default()
    }
}

pub fn app(
    completion: Option<Arc<dyn CompletionClient>>,
    places: Option<Arc<dyn PlaceSearchClient>>,
) -> Router {
    let metrics = AppMetrics::shared();
    let agent = TriageAgent::new(completion, places, metrics.clone());
    build_router(ApiState::new(agent, metrics))
}
