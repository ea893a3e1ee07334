//! Prometheus metrics for authentication and request activity

use nimbus_api::Method;
use nimbus_core::{ClientError, Result};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

fn metrics_error(e: prometheus::Error) -> ClientError {
    ClientError::Internal(format!("metrics: {}", e))
}

/// Per-client metrics, kept in a registry owned by the client
pub struct ClientMetrics {
    /// Authentication attempts by outcome (success, rejected, catalog, timeout)
    pub authentications_total: IntCounterVec,
    /// Requests dispatched through `send_request`, by method
    pub requests_total: IntCounterVec,
    /// Requests retried after the token was rejected
    pub unauthorized_retries_total: IntCounter,
    /// Version discovery lookups by outcome (versioned, unversioned, error)
    pub version_discovery_total: IntCounterVec,
    /// Prometheus registry for metrics
    pub registry: Arc<Registry>,
}

impl ClientMetrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let authentications_total = IntCounterVec::new(
            Opts::new("nimbus_authentications_total", "Authentication attempts by outcome"),
            &["outcome"],
        )
        .map_err(metrics_error)?;

        let requests_total = IntCounterVec::new(
            Opts::new("nimbus_requests_total", "Requests sent by method"),
            &["method"],
        )
        .map_err(metrics_error)?;

        let unauthorized_retries_total = IntCounter::new(
            "nimbus_unauthorized_retries_total",
            "Requests retried after re-authentication",
        )
        .map_err(metrics_error)?;

        let version_discovery_total = IntCounterVec::new(
            Opts::new("nimbus_version_discovery_total", "API version resolutions by outcome"),
            &["outcome"],
        )
        .map_err(metrics_error)?;

        registry
            .register(Box::new(authentications_total.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(requests_total.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(unauthorized_retries_total.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(version_discovery_total.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            authentications_total,
            requests_total,
            unauthorized_retries_total,
            version_discovery_total,
            registry,
        })
    }

    pub fn record_authentication(&self, outcome: &str) {
        self.authentications_total
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn record_request(&self, method: Method) {
        self.requests_total
            .with_label_values(&[method.as_str()])
            .inc();
    }

    pub fn record_unauthorized_retry(&self) {
        self.unauthorized_retries_total.inc();
    }

    pub fn record_version_resolution(&self, outcome: &str) {
        self.version_discovery_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| ClientError::Internal(format!("metrics: {}", e)))
    }
}

impl Clone for ClientMetrics {
    fn clone(&self) -> Self {
        // Share the same registry and metrics across clones
        Self {
            authentications_total: self.authentications_total.clone(),
            requests_total: self.requests_total.clone(),
            unauthorized_retries_total: self.unauthorized_retries_total.clone(),
            version_discovery_total: self.version_discovery_total.clone(),
            registry: self.registry.clone(),
        }
    }
}
