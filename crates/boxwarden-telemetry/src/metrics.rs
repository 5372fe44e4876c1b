//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Every label is low-cardinality by construction (see design note
//!   "Cardinality of telemetry attributes"): operation/outcome/backend-kind
//!   strings, never transfer IDs or filenames.

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: std::sync::Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    backend_calls_total: IntCounterVec,
    repository_calls_total: IntCounterVec,
    torrent_add_requests_total: IntCounterVec,
    downloads_in_flight: IntGauge,
    queue_depth: IntGauge,
}

/// Snapshot of selected gauges for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Number of files currently being downloaded.
    pub downloads_in_flight: i64,
    /// Depth of the orchestrator-to-downloader work queue.
    pub queue_depth: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let backend_calls_total = IntCounterVec::new(
            Opts::new("backend_calls_total", "Backend client calls by outcome"),
            &["backend", "operation", "outcome"],
        )?;
        let repository_calls_total = IntCounterVec::new(
            Opts::new(
                "repository_calls_total",
                "State repository calls by outcome",
            ),
            &["operation", "outcome"],
        )?;
        let torrent_add_requests_total = IntCounterVec::new(
            Opts::new(
                "torrent_add_requests_total",
                "Transmission-RPC torrent-add requests by type and outcome",
            ),
            &["torrent_type", "outcome"],
        )?;
        let downloads_in_flight = IntGauge::with_opts(Opts::new(
            "downloads_in_flight",
            "Number of files currently being downloaded",
        ))?;
        let queue_depth = IntGauge::with_opts(Opts::new(
            "queue_depth",
            "Depth of the orchestrator-to-downloader work queue",
        ))?;

        registry.register(Box::new(backend_calls_total.clone()))?;
        registry.register(Box::new(repository_calls_total.clone()))?;
        registry.register(Box::new(torrent_add_requests_total.clone()))?;
        registry.register(Box::new(downloads_in_flight.clone()))?;
        registry.register(Box::new(queue_depth.clone()))?;

        Ok(Self {
            inner: std::sync::Arc::new(MetricsInner {
                registry,
                backend_calls_total,
                repository_calls_total,
                torrent_add_requests_total,
                downloads_in_flight,
                queue_depth,
            }),
        })
    }

    /// Record a backend client call outcome (`outcome` is `ok` or `error`).
    pub fn inc_backend_call(&self, backend: &str, operation: &str, outcome: &str) {
        self.inner
            .backend_calls_total
            .with_label_values(&[backend, operation, outcome])
            .inc();
    }

    /// Record a repository call outcome.
    pub fn inc_repository_call(&self, operation: &str, outcome: &str) {
        self.inner
            .repository_calls_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Record a `torrent-add` request (`torrent_type` is `magnet` or `metainfo`).
    pub fn inc_torrent_add(&self, torrent_type: &str, outcome: &str) {
        self.inner
            .torrent_add_requests_total
            .with_label_values(&[torrent_type, outcome])
            .inc();
    }

    /// Set the in-flight download gauge.
    pub fn set_downloads_in_flight(&self, count: i64) {
        self.inner.downloads_in_flight.set(count);
    }

    /// Adjust the queue depth gauge by a signed delta.
    pub fn add_queue_depth(&self, delta: i64) {
        self.inner.queue_depth.add(delta);
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode Prometheus metrics")?;
        String::from_utf8(buffer).context("metrics output was not valid UTF-8")
    }

    /// Take a point-in-time snapshot of the most relevant gauges.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            downloads_in_flight: self.inner.downloads_in_flight.get(),
            queue_depth: self.inner.queue_depth.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_backend_call("putio", "get_tagged_transfers", "ok");
        metrics.inc_repository_call("claim_transfer", "ok");
        metrics.inc_torrent_add("metainfo", "ok");
        metrics.set_downloads_in_flight(3);
        metrics.add_queue_depth(2);
        metrics.add_queue_depth(-1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.downloads_in_flight, 3);
        assert_eq!(snapshot.queue_depth, 1);

        let rendered = metrics.render()?;
        assert!(rendered.contains("backend_calls_total"));
        assert!(rendered.contains("repository_calls_total"));
        assert!(rendered.contains("torrent_add_requests_total"));
        Ok(())
    }
}
