mod foursquare;
mod openai;

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use triage_core::GeoPoint;
use url::Url;

pub use foursquare::{FoursquareConfig, FoursquarePlacesClient};
pub use openai::{extract_output_text, OpenAiCompletionClient, OpenAiConfig};

/// Result cap requested from the place-search provider.
pub const PLACE_RESULT_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("non-success status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("undecodable response: {0}")]
    Decode(String),
    #[error("invalid base url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Text-completion collaborator.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    fn model_name(&self) -> &str;

    async fn complete(&self, instructions: &str, prompt: &str) -> Result<String, ProviderError>;
}

/// Place-search collaborator.
#[async_trait]
pub trait PlaceSearchClient: Send + Sync {
    async fn search(&self, query: &PlaceQuery) -> Result<Vec<RawPlace>, ProviderError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceQuery {
    pub location: GeoPoint,
    pub query: String,
    pub category_codes: String,
    pub limit: usize,
}

/// Place record as the provider returns it. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawPlace {
    #[serde(default)]
    pub fsq_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub categories: Vec<RawCategory>,
    #[serde(default)]
    pub location: Option<RawLocation>,
    /// Meters from the query point.
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub tel: Option<String>,
    #[serde(default)]
    pub hours: Option<RawHours>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawCategory {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawLocation {
    #[serde(default)]
    pub formatted_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawHours {
    #[serde(default)]
    pub display: Option<String>,
}

pub fn build_http_client() -> Result<Client, ProviderError> {
    Ok(Client::builder()
        .connect_timeout(Duration::from_secs(6))
        .timeout(Duration::from_secs(20))
        .build()?)
}

pub(crate) fn parse_base_url(value: &str) -> Result<Url, ProviderError> {
    let trimmed = value.trim();
    let mut url = Url::parse(trimmed)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub(crate) fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
