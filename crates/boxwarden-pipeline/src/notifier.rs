//! Notification sink (§4.G): consumes pipeline events, starts the downstream
//! watchers the downloader owns, and posts a webhook message.

use std::sync::Arc;

use boxwarden_data::{DownloadStatus, Repository};
use boxwarden_events::{Event, EventBus};
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::catalog::TransferCatalog;
use crate::downloader::Downloader;
use crate::supervise::supervise;

/// Subscribes to the event bus and reacts to the three transfer lifecycle
/// events the downloader publishes.
pub struct NotificationSink {
    repository: Arc<Repository>,
    downloader: Arc<Downloader>,
    catalog: Arc<TransferCatalog>,
    events: EventBus,
    http: Client,
    webhook_url: Option<String>,
}

impl NotificationSink {
    /// Construct the sink. `webhook_url` absent disables the webhook post but
    /// not the repository/watcher side effects.
    #[must_use]
    pub fn new(
        repository: Arc<Repository>,
        downloader: Arc<Downloader>,
        catalog: Arc<TransferCatalog>,
        events: EventBus,
        http: Client,
        webhook_url: Option<String>,
    ) -> Self {
        Self {
            repository,
            downloader,
            catalog,
            events,
            http,
            webhook_url,
        }
    }

    /// Run the sink under the panic-guard supervisor until `cancellation`
    /// fires (§5 "Panic discipline" applies here identically to the
    /// orchestrator).
    pub async fn run(self: Arc<Self>, cancellation: CancellationToken) {
        supervise("notification-sink", cancellation.clone(), move || {
            let sink = Arc::clone(&self);
            let cancellation = cancellation.clone();
            async move { sink.run_loop(cancellation).await }
        })
        .await;
    }

    async fn run_loop(&self, cancellation: CancellationToken) {
        let mut stream = self.events.subscribe(None);
        loop {
            tokio::select! {
                () = cancellation.cancelled() => return,
                next = stream.next() => {
                    match next {
                        Some(envelope) => self.handle_event(envelope.event, cancellation.clone()).await,
                        None => return,
                    }
                }
            }
        }
    }

    async fn handle_event(&self, event: Event, cancellation: CancellationToken) {
        match &event {
            Event::FileDownloadError { .. } => {
                // Advisory only; the transfer-level outcome arrives separately.
            }
            Event::TransferDownloadError { transfer_id } => {
                if let Err(error) = self.repository.update_transfer_status(transfer_id, DownloadStatus::Failed).await {
                    tracing::warn!(%transfer_id, %error, "notification sink failed to persist failed status");
                }
            }
            Event::TransferDownloadFinished { transfer_id } => {
                if let Err(error) = self.repository.update_transfer_status(transfer_id, DownloadStatus::Downloaded).await {
                    tracing::warn!(%transfer_id, %error, "notification sink failed to persist downloaded status");
                }
                if let Some(transfer) = self.catalog.get(transfer_id) {
                    self.downloader.start_import_watcher(transfer, cancellation);
                } else {
                    tracing::warn!(%transfer_id, "no cached transfer for import watcher");
                }
            }
            Event::TransferImported { transfer_id } => {
                if let Some(transfer) = self.catalog.get(transfer_id) {
                    self.downloader.start_seeding_watcher(transfer, cancellation);
                } else {
                    tracing::warn!(%transfer_id, "no cached transfer for seeding watcher");
                }
            }
        }

        self.post_webhook(&event).await;
    }

    async fn post_webhook(&self, event: &Event) {
        let Some(url) = self.webhook_url.as_deref() else {
            return;
        };

        let body = serde_json::json!({ "text": describe(event) });
        match self.http.post(url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(status = %response.status(), "webhook post returned a non-2xx status");
            }
            Err(error) => {
                tracing::warn!(%error, "webhook post failed");
            }
        }
    }
}

fn describe(event: &Event) -> String {
    match event {
        Event::FileDownloadError { transfer_id, path, error } => {
            format!("{transfer_id}: file '{path}' failed to download: {error}")
        }
        Event::TransferDownloadError { transfer_id } => {
            format!("{transfer_id}: transfer failed to download")
        }
        Event::TransferDownloadFinished { transfer_id } => {
            format!("{transfer_id}: transfer finished downloading")
        }
        Event::TransferImported { transfer_id } => {
            format!("{transfer_id}: transfer imported")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use boxwarden_backend::{BackendResult, ByteStream, DiscoverBackend, Transfer, TransferFile, TransferStatus};
    use boxwarden_data::{InstanceId, PoolConfig};
    use boxwarden_media_probe::ProbeSet;
    use boxwarden_telemetry::Metrics;

    use super::*;

    struct NoopBackend;

    #[async_trait]
    impl DiscoverBackend for NoopBackend {
        async fn authenticate(&self) -> BackendResult<()> {
            Ok(())
        }

        async fn get_tagged_transfers(&self, _label: &str) -> BackendResult<Vec<Transfer>> {
            Ok(Vec::new())
        }

        async fn grab_file(&self, _transfer: &Transfer, _file: &TransferFile) -> BackendResult<ByteStream> {
            unimplemented!("not exercised by notifier tests")
        }
    }

    async fn test_repository() -> (Arc<Repository>, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("boxwarden.sqlite3");
        let config = PoolConfig::new(db_path.to_str().expect("utf8 path"));
        let metrics = Metrics::new().expect("metrics");
        let repo = Repository::connect(&config, InstanceId::new("inst-1"), metrics)
            .await
            .expect("connect");
        (Arc::new(repo), dir)
    }

    fn sample_transfer() -> Transfer {
        Transfer {
            id: "t1".into(),
            name: "Demo".into(),
            label: "boxwarden".into(),
            save_parent_id: None,
            files: vec![TransferFile {
                path: "a.mkv".into(),
                size_bytes: 1,
            }],
            progress_percent: 100.0,
            status: TransferStatus::completed(),
            peers: None,
            down_rate: None,
            eta: None,
        }
    }

    #[tokio::test]
    async fn finished_event_persists_status_and_starts_import_watcher() {
        let (repository, _dir) = test_repository().await;
        repository.claim_transfer("t1").await.expect("claim");

        let events = EventBus::with_capacity(16);
        let catalog = Arc::new(TransferCatalog::new());
        catalog.insert(sample_transfer());

        let metrics = Metrics::new().expect("metrics");
        let downloader = Arc::new(Downloader::new(
            Arc::clone(&repository),
            Arc::new(NoopBackend),
            None,
            Arc::new(ProbeSet::default()),
            events.clone(),
            Arc::clone(&catalog),
            std::env::temp_dir(),
            1,
            Duration::from_secs(3600),
            metrics,
        ));

        let sink = NotificationSink::new(
            Arc::clone(&repository),
            downloader,
            catalog,
            events,
            Client::new(),
            None,
        );

        sink.handle_event(
            Event::TransferDownloadFinished {
                transfer_id: "t1".into(),
            },
            CancellationToken::new(),
        )
        .await;

        let downloads = repository.get_downloads().await.expect("downloads");
        assert_eq!(downloads[0].status, DownloadStatus::Downloaded);
    }
}
