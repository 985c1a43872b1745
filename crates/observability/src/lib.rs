use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Process-wide counters. Each increment is mirrored to the `metrics`
/// facade so a host-installed exporter sees the same numbers.
#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    ai_classifications_total: AtomicU64,
    classification_degraded_total: AtomicU64,
    search_failures_total: AtomicU64,
    services_returned_total: AtomicU64,
    total_latency_millis: AtomicU64,
    latency_samples: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub ai_classifications_total: u64,
    pub classification_degraded_total: u64,
    pub search_failures_total: u64,
    pub services_returned_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("triage_requests_total").increment(1);
    }

    pub fn inc_ai_classification(&self) {
        self.ai_classifications_total
            .fetch_add(1, Ordering::Relaxed);
        metrics::counter!("triage_ai_classifications_total").increment(1);
    }

    pub fn inc_classification_degraded(&self, reason: &'static str) {
        self.classification_degraded_total
            .fetch_add(1, Ordering::Relaxed);
        metrics::counter!("triage_classification_degraded_total", "reason" => reason).increment(1);
    }

    pub fn inc_search_failure(&self) {
        self.search_failures_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("triage_search_failures_total").increment(1);
    }

    pub fn add_services_returned(&self, count: usize) {
        self.services_returned_total
            .fetch_add(count as u64, Ordering::Relaxed);
        metrics::counter!("triage_services_returned_total").increment(count as u64);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
        metrics::histogram!("triage_request_duration_seconds").record(duration.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let samples = self.latency_samples.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            ai_classifications_total: self.ai_classifications_total.load(Ordering::Relaxed),
            classification_degraded_total: self
                .classification_degraded_total
                .load(Ordering::Relaxed),
            search_failures_total: self.search_failures_total.load(Ordering::Relaxed),
            services_returned_total: self.services_returned_total.load(Ordering::Relaxed),
            avg_latency_millis: if samples == 0 {
                0.0
            } else {
                latency as f64 / samples as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,triage_api=info,triage_agents=info,triage_providers=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
