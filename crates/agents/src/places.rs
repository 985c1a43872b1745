use std::sync::Arc;

use tracing::debug;
use triage_core::{
    meters_to_distance, search_spec, urgency_for_label, EmergencyCategory, GeoPoint, Service,
    ServiceSearchSpec, TriageError,
};
use triage_providers::{PlaceQuery, PlaceSearchClient, RawPlace, PLACE_RESULT_LIMIT};

const DEFAULT_NAME: &str = "Unnamed location";
const DEFAULT_CATEGORY_LABEL: &str = "Emergency Service";
const DEFAULT_ADDRESS: &str = "Address not available";
const DEFAULT_HOURS: &str = "Hours not available";

#[derive(Clone)]
pub struct PlaceSearchAdapter {
    client: Option<Arc<dyn PlaceSearchClient>>,
}

impl PlaceSearchAdapter {
    pub fn new(client: Option<Arc<dyn PlaceSearchClient>>) -> Self {
        Self { client }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub async fn search(
        &self,
        location: GeoPoint,
        category: EmergencyCategory,
    ) -> Result<Vec<Service>, TriageError> {
        self.search_with_spec(location, search_spec(category)).await
    }

    /// One provider call, no pagination. Every provider failure becomes
    /// `ServiceSearchUnavailable`.
    pub async fn search_with_spec(
        &self,
        location: GeoPoint,
        spec: &ServiceSearchSpec,
    ) -> Result<Vec<Service>, TriageError> {
        let client = self.client.as_ref().ok_or_else(|| {
            TriageError::ServiceSearchUnavailable("place search is not configured".to_string())
        })?;

        let query = PlaceQuery {
            location,
            query: spec.query.to_string(),
            category_codes: spec.codes_param(),
            limit: PLACE_RESULT_LIMIT,
        };

        let places = client
            .search(&query)
            .await
            .map_err(|error| TriageError::ServiceSearchUnavailable(error.to_string()))?;

        debug!(results = places.len(), query = %query.query, "place search returned");

        Ok(places
            .into_iter()
            .enumerate()
            .map(|(index, place)| normalize_place(index, place))
            .collect())
    }
}

/// Maps a raw provider record onto a [`Service`]. Never fails; missing
/// fields get defaults and a missing id is assigned from the position.
pub fn normalize_place(index: usize, place: RawPlace) -> Service {
    let specialties = place
        .categories
        .iter()
        .filter_map(|category| category.name.clone())
        .collect::<Vec<_>>();
    let category = place
        .categories
        .first()
        .and_then(|category| category.name.clone())
        .unwrap_or_else(|| DEFAULT_CATEGORY_LABEL.to_string());

    Service {
        id: place
            .fsq_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("result-{}", index + 1)),
        name: place.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
        urgency: urgency_for_label(&category),
        category,
        address: place
            .location
            .and_then(|location| location.formatted_address)
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
        distance: meters_to_distance(place.distance),
        phone: place.tel,
        hours: place
            .hours
            .and_then(|hours| hours.display)
            .unwrap_or_else(|| DEFAULT_HOURS.to_string()),
        specialties,
    }
}
