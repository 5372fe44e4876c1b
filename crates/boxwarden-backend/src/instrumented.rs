//! Generic instrumentation wrapper for backend clients (§4.B "Instrumentation
//! wrapper"). Every method call is recorded as a `backend_calls_total{backend,
//! operation,outcome}` counter without altering the wrapped trait's errors.

use async_trait::async_trait;
use boxwarden_telemetry::{Metrics, instrumented};

use crate::error::BackendResult;
use crate::model::{Transfer, TransferFile};
use crate::traits::{ByteStream, DiscoverBackend, MutationBackend};

/// Wraps any [`DiscoverBackend`] or [`MutationBackend`], recording a span and
/// a counter around every call. `backend` is the low-cardinality label
/// (`deluge` or `putio`).
pub struct Instrumented<B> {
    inner: B,
    backend: &'static str,
    metrics: Metrics,
}

impl<B> Instrumented<B> {
    /// Wrap `inner`, labelling every recorded call with `backend`.
    pub const fn new(inner: B, backend: &'static str, metrics: Metrics) -> Self {
        Self {
            inner,
            backend,
            metrics,
        }
    }

    fn record_call(metrics: &Metrics, backend: &str, operation: &str, outcome: &str) {
        metrics.inc_backend_call(backend, operation, outcome);
    }
}

#[async_trait]
impl<B: DiscoverBackend> DiscoverBackend for Instrumented<B> {
    async fn authenticate(&self) -> BackendResult<()> {
        let backend = self.backend;
        instrumented(
            &self.metrics,
            move |metrics, operation, outcome| Self::record_call(metrics, backend, operation, outcome),
            backend,
            "authenticate",
            || self.inner.authenticate(),
        )
        .await
    }

    async fn get_tagged_transfers(&self, label: &str) -> BackendResult<Vec<Transfer>> {
        let backend = self.backend;
        instrumented(
            &self.metrics,
            move |metrics, operation, outcome| Self::record_call(metrics, backend, operation, outcome),
            backend,
            "get_tagged_transfers",
            || self.inner.get_tagged_transfers(label),
        )
        .await
    }

    async fn grab_file(&self, transfer: &Transfer, file: &TransferFile) -> BackendResult<ByteStream> {
        let backend = self.backend;
        instrumented(
            &self.metrics,
            move |metrics, operation, outcome| Self::record_call(metrics, backend, operation, outcome),
            backend,
            "grab_file",
            || self.inner.grab_file(transfer, file),
        )
        .await
    }
}

#[async_trait]
impl<B: MutationBackend> MutationBackend for Instrumented<B> {
    async fn remove_transfer(&self, id: &str) -> BackendResult<()> {
        let backend = self.backend;
        instrumented(
            &self.metrics,
            move |metrics, operation, outcome| Self::record_call(metrics, backend, operation, outcome),
            backend,
            "remove_transfer",
            || self.inner.remove_transfer(id),
        )
        .await
    }

    async fn add_transfer_by_url(&self, url: &str, destination: &str) -> BackendResult<Transfer> {
        let backend = self.backend;
        instrumented(
            &self.metrics,
            move |metrics, operation, outcome| Self::record_call(metrics, backend, operation, outcome),
            backend,
            "add_transfer_by_url",
            || self.inner.add_transfer_by_url(url, destination),
        )
        .await
    }

    async fn add_transfer_by_bytes(
        &self,
        content: &[u8],
        filename: &str,
        destination: &str,
    ) -> BackendResult<Transfer> {
        let backend = self.backend;
        instrumented(
            &self.metrics,
            move |metrics, operation, outcome| Self::record_call(metrics, backend, operation, outcome),
            backend,
            "add_transfer_by_bytes",
            || self.inner.add_transfer_by_bytes(content, filename, destination),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubDiscover;

    #[async_trait]
    impl DiscoverBackend for StubDiscover {
        async fn authenticate(&self) -> BackendResult<()> {
            Ok(())
        }

        async fn get_tagged_transfers(&self, _label: &str) -> BackendResult<Vec<Transfer>> {
            Ok(Vec::new())
        }

        async fn grab_file(&self, _transfer: &Transfer, _file: &TransferFile) -> BackendResult<ByteStream> {
            Ok(Box::pin(futures_util::stream::empty()))
        }
    }

    #[tokio::test]
    async fn wrapped_calls_preserve_results() {
        let metrics = Metrics::new().expect("metrics");
        let wrapped = Instrumented::new(StubDiscover, "deluge", metrics.clone());

        assert!(wrapped.authenticate().await.is_ok());
        assert!(wrapped.get_tagged_transfers("boxwarden").await.unwrap().is_empty());

        let rendered = metrics.render().expect("render");
        assert!(rendered.contains("backend_calls_total"));
    }
}
