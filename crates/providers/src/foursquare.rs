use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::{env_non_empty, parse_base_url, PlaceQuery, PlaceSearchClient, ProviderError, RawPlace};

const DEFAULT_BASE_URL: &str = "https://api.foursquare.com";

#[derive(Debug, Clone)]
pub struct FoursquareConfig {
    pub api_key: String,
    pub base_url: Url,
}

impl FoursquareConfig {
    pub fn new(api_key: impl Into<String>, base_url: Option<&str>) -> Result<Self, ProviderError> {
        Ok(Self {
            api_key: api_key.into(),
            base_url: parse_base_url(base_url.unwrap_or(DEFAULT_BASE_URL))?,
        })
    }

    /// `None` when `TRIAGE_FOURSQUARE_API_KEY` is unset.
    pub fn from_env() -> Result<Option<Self>, ProviderError> {
        let Some(api_key) = env_non_empty("TRIAGE_FOURSQUARE_API_KEY") else {
            return Ok(None);
        };
        let base_url = env_non_empty("TRIAGE_FOURSQUARE_BASE_URL");
        Self::new(api_key, base_url.as_deref()).map(Some)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Option<Vec<RawPlace>>,
}

pub struct FoursquarePlacesClient {
    http: Client,
    config: FoursquareConfig,
}

impl FoursquarePlacesClient {
    pub fn new(http: Client, config: FoursquareConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl PlaceSearchClient for FoursquarePlacesClient {
    async fn search(&self, query: &PlaceQuery) -> Result<Vec<RawPlace>, ProviderError> {
        let url = self.config.base_url.join("v3/places/search")?;
        let params = [
            ("query", query.query.clone()),
            ("ll", query.location.to_ll()),
            ("categories", query.category_codes.clone()),
            ("limit", query.limit.to_string()),
            ("sort", "DISTANCE".to_string()),
        ];

        debug!(query = %query.query, categories = %query.category_codes, "place search request");

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, self.config.api_key.as_str())
            .header(ACCEPT, "application/json")
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|error| ProviderError::Decode(error.to_string()))?;
        Ok(body.results.unwrap_or_default())
    }
}
