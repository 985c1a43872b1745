use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use triage_core::{
    classify_heuristic, profile, Classification, EmergencyCategory, EmergencyReport, GeoPoint,
    TriageError, UrgencyLevel,
};
use triage_observability::AppMetrics;
use triage_providers::CompletionClient;

const INSTRUCTIONS: &str = "You are an emergency response AI assistant. \
    Reply with exactly one JSON object and no other text.";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("completion output is empty")]
    Empty,
    #[error("completion output does not match the classification schema: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Why a classification fell back to the keyword heuristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradeReason {
    NotConfigured,
    Collaborator(String),
    Malformed(String),
}

impl DegradeReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::Collaborator(_) => "collaborator_failed",
            Self::Malformed(_) => "malformed_output",
        }
    }
}

impl From<DegradeReason> for TriageError {
    fn from(reason: DegradeReason) -> Self {
        let detail = match reason {
            DegradeReason::NotConfigured => "completion collaborator is not configured".to_string(),
            DegradeReason::Collaborator(detail) | DegradeReason::Malformed(detail) => detail,
        };
        TriageError::ClassificationDegraded(detail)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Ai,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierVerdict {
    pub classification: Classification,
    pub source: ClassificationSource,
    pub degraded: Option<DegradeReason>,
}

/// Shape the completion collaborator is asked to return.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AiClassificationPayload {
    emergency_type: String,
    immediate_actions: Vec<String>,
    urgency_level: String,
    recommended_services: String,
    ai_response: String,
}

impl AiClassificationPayload {
    /// Unknown categories become `general`; unknown urgencies take the
    /// category's default. Blank fields are filled from the taxonomy.
    fn into_classification(self) -> Classification {
        let category = EmergencyCategory::from_label(&self.emergency_type);
        let entry = profile(category);

        let urgency = UrgencyLevel::parse(&self.urgency_level).unwrap_or(entry.default_urgency);

        let mut immediate_actions = self
            .immediate_actions
            .into_iter()
            .map(|step| step.trim().to_string())
            .filter(|step| !step.is_empty())
            .collect::<Vec<_>>();
        if immediate_actions.is_empty() {
            immediate_actions = entry.actions.iter().map(|step| step.to_string()).collect();
        }

        let recommended_search = match self.recommended_services.trim() {
            "" => entry.search.query.to_string(),
            value => value.to_string(),
        };
        let narrative = match self.ai_response.trim() {
            "" => entry.narrative.to_string(),
            value => value.to_string(),
        };

        Classification {
            category,
            urgency,
            recommended_search,
            immediate_actions,
            narrative,
        }
    }
}

pub fn build_prompt(text: &str, location: GeoPoint, local_guess: EmergencyCategory) -> String {
    format!(
        "Analyze this emergency situation and provide:\n\
         1. Emergency type classification (medical-cardiac, medical-trauma, fire, police, general)\n\
         2. Immediate action steps\n\
         3. Urgency level (critical, urgent, standard)\n\
         4. Recommended emergency services to search for\n\n\
         Emergency description: \"{text}\"\n\
         Location: {lat}, {lon}\n\
         Local keyword pre-classification: {local_guess}\n\n\
         Respond in JSON format with: emergencyType, immediateActions (array), urgencyLevel, \
         recommendedServices, aiResponse (user-friendly explanation)",
        text = text.replace('"', "'"),
        lat = location.latitude,
        lon = location.longitude,
    )
}

/// Parses completion output into a classification. Tolerates a surrounding
/// markdown code fence; anything else must be the exact object shape.
pub fn parse_classification(raw: &str) -> Result<Classification, ParseError> {
    let body = strip_code_fence(raw.trim());
    if body.is_empty() {
        return Err(ParseError::Empty);
    }
    let payload: AiClassificationPayload = serde_json::from_str(body)?;
    Ok(payload.into_classification())
}

fn strip_code_fence(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Clone)]
pub struct AiClassifier {
    client: Option<Arc<dyn CompletionClient>>,
    metrics: Arc<AppMetrics>,
}

impl AiClassifier {
    pub fn new(client: Option<Arc<dyn CompletionClient>>, metrics: Arc<AppMetrics>) -> Self {
        Self { client, metrics }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.client.as_deref().map(|client| client.model_name())
    }

    /// Always yields a classification; collaborator trouble degrades to the
    /// heuristic result for the same text.
    pub async fn classify(&self, report: &EmergencyReport) -> Classification {
        self.classify_detailed(report).await.classification
    }

    pub async fn classify_detailed(&self, report: &EmergencyReport) -> ClassifierVerdict {
        let local = classify_heuristic(report.text());

        match self.try_classify(report, local.category).await {
            Ok(classification) => {
                self.metrics.inc_ai_classification();
                debug!(category = %classification.category, "ai classification accepted");
                ClassifierVerdict {
                    classification,
                    source: ClassificationSource::Ai,
                    degraded: None,
                }
            }
            Err(reason) => {
                self.metrics.inc_classification_degraded(reason.label());
                warn!(
                    reason = reason.label(),
                    error = %TriageError::from(reason.clone()),
                    category = %local.category,
                    "falling back to heuristic classification"
                );
                ClassifierVerdict {
                    classification: local,
                    source: ClassificationSource::Heuristic,
                    degraded: Some(reason),
                }
            }
        }
    }

    async fn try_classify(
        &self,
        report: &EmergencyReport,
        local_guess: EmergencyCategory,
    ) -> Result<Classification, DegradeReason> {
        let client = self.client.as_ref().ok_or(DegradeReason::NotConfigured)?;
        let prompt = build_prompt(report.text(), report.location(), local_guess);
        debug!(
            model = client.model_name(),
            local_guess = %local_guess,
            "requesting ai classification"
        );

        let output = client
            .complete(INSTRUCTIONS, &prompt)
            .await
            .map_err(|error| DegradeReason::Collaborator(error.to_string()))?;

        parse_classification(&output).map_err(|error| DegradeReason::Malformed(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use triage_providers::ProviderError;

    use super::*;

    struct CannedCompletion(Result<String, u16>);

    #[async_trait]
    impl CompletionClient for CannedCompletion {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _instructions: &str, _prompt: &str) -> Result<String, ProviderError> {
            self.0.clone().map_err(|status| ProviderError::Status {
                status,
                body: "unavailable".to_string(),
            })
        }
    }

    fn classifier(output: Result<String, u16>) -> AiClassifier {
        AiClassifier::new(Some(Arc::new(CannedCompletion(output))), AppMetrics::shared())
    }

    fn report(text: &str) -> EmergencyReport {
        EmergencyReport::new(text, None).unwrap()
    }

    const VALID: &str = r#"{
        "emergencyType": "fire",
        "immediateActions": ["Call 911 immediately", "Get out"],
        "urgencyLevel": "critical",
        "recommendedServices": "fire station",
        "aiResponse": "Leave the building now."
    }"#;

    #[test]
    fn parses_well_formed_payload() {
        let parsed = parse_classification(VALID).unwrap();
        assert_eq!(parsed.category, EmergencyCategory::Fire);
        assert_eq!(parsed.urgency, UrgencyLevel::Critical);
        assert_eq!(parsed.immediate_actions.len(), 2);
        assert_eq!(parsed.narrative, "Leave the building now.");
    }

    #[test]
    fn accepts_fenced_json() {
        let fenced = format!("```json\n{VALID}\n```");
        assert_eq!(parse_classification(&fenced).unwrap().category, EmergencyCategory::Fire);

        let upper = format!("```JSON\n{VALID}\n```");
        assert_eq!(parse_classification(&upper).unwrap().category, EmergencyCategory::Fire);

        let bare = format!("```\n{VALID}\n```");
        assert_eq!(parse_classification(&bare).unwrap().category, EmergencyCategory::Fire);
    }

    #[test]
    fn rejects_missing_fields_and_prose() {
        assert!(matches!(
            parse_classification(r#"{"emergencyType":"fire"}"#),
            Err(ParseError::Malformed(_))
        ));
        assert!(parse_classification("It sounds like a fire, call 911").is_err());
        assert!(matches!(parse_classification("  "), Err(ParseError::Empty)));
    }

    #[test]
    fn coerces_out_of_vocabulary_values() {
        let parsed = parse_classification(
            r#"{"emergencyType":"earthquake","immediateActions":[],"urgencyLevel":"extreme",
               "recommendedServices":"","aiResponse":""}"#,
        )
        .unwrap();
        assert_eq!(parsed.category, EmergencyCategory::General);
        assert_eq!(parsed.urgency, UrgencyLevel::Urgent);
        assert_eq!(parsed.recommended_search, "hospital");
        assert!(!parsed.immediate_actions.is_empty());
    }

    #[test]
    fn prompt_carries_location_and_local_guess() {
        let prompt = build_prompt(
            "smoke in \"hallway\"",
            GeoPoint {
                latitude: 40.0,
                longitude: -74.0,
            },
            EmergencyCategory::Fire,
        );
        assert!(prompt.contains("Location: 40, -74"));
        assert!(prompt.contains("pre-classification: fire"));
        assert!(prompt.contains("smoke in 'hallway'"));
    }

    #[tokio::test]
    async fn invalid_json_falls_back_to_heuristic() {
        let text = "Severe chest pain and shortness of breath";
        let verdict = classifier(Ok("not json at all".to_string()))
            .classify_detailed(&report(text))
            .await;
        assert_eq!(verdict.classification, classify_heuristic(text));
        assert_eq!(verdict.source, ClassificationSource::Heuristic);
        assert!(matches!(verdict.degraded, Some(DegradeReason::Malformed(_))));
    }

    #[tokio::test]
    async fn collaborator_error_falls_back_to_heuristic() {
        let text = "someone broke in, there was a robbery";
        let result = classifier(Err(503)).classify(&report(text)).await;
        assert_eq!(result, classify_heuristic(text));
        assert_eq!(result.category, EmergencyCategory::Police);
    }

    #[tokio::test]
    async fn unconfigured_client_uses_heuristic() {
        let metrics = AppMetrics::shared();
        let ai = AiClassifier::new(None, metrics.clone());
        let verdict = ai.classify_detailed(&report("house fire")).await;
        assert_eq!(verdict.degraded, Some(DegradeReason::NotConfigured));
        assert_eq!(metrics.snapshot().classification_degraded_total, 1);
    }

    #[tokio::test]
    async fn valid_output_is_used_directly() {
        let verdict = classifier(Ok(VALID.to_string()))
            .classify_detailed(&report("my heart hurts"))
            .await;
        assert_eq!(verdict.source, ClassificationSource::Ai);
        assert_eq!(verdict.classification.category, EmergencyCategory::Fire);
    }
}
