//! Parallel downloader: per-file download stage plus the import and seeding
//! watchers it spawns (§4.E).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use boxwarden_backend::{BackendError, DiscoverBackend, MutationBackend, Transfer, TransferFile};
use boxwarden_data::{DownloadStatus, Repository};
use boxwarden_events::{Event, EventBus};
use boxwarden_media_probe::ProbeSet;
use boxwarden_telemetry::Metrics;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Semaphore, mpsc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::catalog::TransferCatalog;

/// Bounded-concurrency downloader. Files within and across transfers share a
/// single `max_parallel`-wide semaphore (§4.E.1 "Concurrency rule").
pub struct Downloader {
    repository: Arc<Repository>,
    discover: Arc<dyn DiscoverBackend>,
    mutation: Option<Arc<dyn MutationBackend>>,
    probes: Arc<ProbeSet>,
    events: EventBus,
    catalog: Arc<TransferCatalog>,
    download_dir: PathBuf,
    semaphore: Arc<Semaphore>,
    polling_interval: Duration,
    metrics: Metrics,
}

impl Downloader {
    /// Construct the downloader. `mutation` is `None` when the configured
    /// backend implements discovery only (Deluge); the seeding watcher then
    /// logs and skips removal instead of erroring (§4.B "Mutation capability").
    #[must_use]
    pub fn new(
        repository: Arc<Repository>,
        discover: Arc<dyn DiscoverBackend>,
        mutation: Option<Arc<dyn MutationBackend>>,
        probes: Arc<ProbeSet>,
        events: EventBus,
        catalog: Arc<TransferCatalog>,
        download_dir: PathBuf,
        max_parallel: usize,
        polling_interval: Duration,
        metrics: Metrics,
    ) -> Self {
        Self {
            repository,
            discover,
            mutation,
            probes,
            events,
            catalog,
            download_dir,
            semaphore: Arc::new(Semaphore::new(max_parallel.max(1))),
            polling_interval,
            metrics,
        }
    }

    /// Consume claimed transfers from `work_rx`, spawning a download task per
    /// transfer. Transfers run concurrently with each other; the semaphore
    /// alone bounds file-level parallelism.
    pub async fn run(self: Arc<Self>, mut work_rx: mpsc::Receiver<Transfer>, cancellation: CancellationToken) {
        loop {
            tokio::select! {
                () = cancellation.cancelled() => return,
                received = work_rx.recv() => {
                    match received {
                        Some(transfer) => {
                            self.metrics.add_queue_depth(-1);
                            let downloader = Arc::clone(&self);
                            tokio::spawn(async move { downloader.download_transfer(transfer).await });
                        }
                        None => return,
                    }
                }
            }
        }
    }

    async fn download_transfer(self: Arc<Self>, transfer: Transfer) {
        self.catalog.insert(transfer.clone());

        let mut tasks = tokio::task::JoinSet::new();
        for file in transfer.files.clone() {
            let downloader = Arc::clone(&self);
            let transfer_for_file = transfer.clone();
            tasks.spawn(async move {
                let result = downloader.download_file(&transfer_for_file, &file).await;
                (file.path, result)
            });
        }

        let mut any_failed = false;
        while let Some(outcome) = tasks.join_next().await {
            match outcome {
                Ok((_path, Ok(()))) => {}
                Ok((path, Err(error))) => {
                    any_failed = true;
                    tracing::warn!(transfer_id = %transfer.id, %path, %error, "file download failed");
                    let _ = self.events.publish(Event::FileDownloadError {
                        transfer_id: transfer.id.clone(),
                        path,
                        error: error.to_string(),
                    });
                }
                Err(join_error) => {
                    any_failed = true;
                    tracing::error!(transfer_id = %transfer.id, error = %join_error, "file download task panicked");
                }
            }
        }

        if any_failed {
            if let Err(error) = self.repository.update_transfer_status(&transfer.id, DownloadStatus::Failed).await {
                tracing::warn!(transfer_id = %transfer.id, %error, "failed to persist failed status");
            }
            let _ = self.events.publish(Event::TransferDownloadError {
                transfer_id: transfer.id.clone(),
            });
        } else {
            if let Err(error) = self.repository.update_transfer_status(&transfer.id, DownloadStatus::Downloaded).await {
                tracing::warn!(transfer_id = %transfer.id, %error, "failed to persist downloaded status");
            }
            let _ = self.events.publish(Event::TransferDownloadFinished {
                transfer_id: transfer.id.clone(),
            });
        }
    }

    async fn download_file(&self, transfer: &Transfer, file: &TransferFile) -> Result<(), BackendError> {
        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| BackendError::Network {
                operation: "download_file",
                source: "download semaphore closed".into(),
            })?;

        let destination = self.download_dir.join(&file.path);
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|source| BackendError::Network {
                operation: "download_file",
                source: Box::new(source),
            })?;
        }

        let mut stream = self.discover.grab_file(transfer, file).await?;
        let mut out = tokio::fs::File::create(&destination).await.map_err(|source| BackendError::Network {
            operation: "download_file",
            source: Box::new(source),
        })?;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            out.write_all(&chunk).await.map_err(|source| BackendError::Network {
                operation: "download_file",
                source: Box::new(source),
            })?;
        }

        out.flush().await.map_err(|source| BackendError::Network {
            operation: "download_file",
            source: Box::new(source),
        })?;
        Ok(())
    }

    /// Start the import watcher for a just-finished transfer (§4.E.2). Called
    /// by the notification sink once it observes `TransferDownloadFinished`.
    pub fn start_import_watcher(self: &Arc<Self>, transfer: Transfer, cancellation: CancellationToken) {
        let downloader = Arc::clone(self);
        tokio::spawn(async move { downloader.run_import_watcher(transfer, cancellation).await });
    }

    async fn run_import_watcher(self: Arc<Self>, transfer: Transfer, cancellation: CancellationToken) {
        let target_path = self.download_dir.join(&transfer.name);
        let target_path = target_path.to_string_lossy().into_owned();

        let mut ticker = tokio::time::interval(self.polling_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancellation.cancelled() => return,
                _ = ticker.tick() => {
                    if self.probes.check_imported(&target_path).await {
                        if let Err(error) = self.repository.update_transfer_status(&transfer.id, DownloadStatus::Imported).await {
                            tracing::warn!(transfer_id = %transfer.id, %error, "failed to persist imported status");
                        }
                        let _ = self.events.publish(Event::TransferImported {
                            transfer_id: transfer.id.clone(),
                        });
                        return;
                    }
                }
            }
        }
    }

    /// Start the seeding watcher for an imported transfer (§4.E.3). Called by
    /// the notification sink once it observes `TransferImported`.
    pub fn start_seeding_watcher(self: &Arc<Self>, transfer: Transfer, cancellation: CancellationToken) {
        let downloader = Arc::clone(self);
        tokio::spawn(async move { downloader.run_seeding_watcher(transfer, cancellation).await });
    }

    async fn run_seeding_watcher(self: Arc<Self>, transfer: Transfer, cancellation: CancellationToken) {
        let mut ticker = tokio::time::interval(self.polling_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancellation.cancelled() => return,
                _ = ticker.tick() => {
                    let refreshed = match self.discover.get_tagged_transfers(&transfer.label).await {
                        Ok(transfers) => transfers.into_iter().find(|candidate| candidate.id == transfer.id),
                        Err(error) => {
                            tracing::warn!(transfer_id = %transfer.id, %error, "seeding watcher tick failed; continuing");
                            continue;
                        }
                    };

                    let Some(current) = refreshed else {
                        self.catalog.remove(&transfer.id);
                        return;
                    };

                    if current.status.seeding {
                        continue;
                    }

                    match &self.mutation {
                        Some(mutation) => {
                            if let Err(error) = mutation.remove_transfer(&transfer.id).await {
                                tracing::warn!(transfer_id = %transfer.id, %error, "failed to remove transfer after seeding");
                            }
                        }
                        None => {
                            tracing::warn!(transfer_id = %transfer.id, "backend does not support transfer removal; leaving transfer in place");
                        }
                    }
                    self.catalog.remove(&transfer.id);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use boxwarden_backend::{BackendResult, ByteStream, TransferStatus};
    use boxwarden_data::{InstanceId, PoolConfig};
    use bytes::Bytes;

    use super::*;

    struct StaticFileBackend;

    #[async_trait::async_trait]
    impl DiscoverBackend for StaticFileBackend {
        async fn authenticate(&self) -> BackendResult<()> {
            Ok(())
        }

        async fn get_tagged_transfers(&self, _label: &str) -> BackendResult<Vec<Transfer>> {
            Ok(Vec::new())
        }

        async fn grab_file(&self, _transfer: &Transfer, _file: &TransferFile) -> BackendResult<ByteStream> {
            let chunks: Vec<BackendResult<Bytes>> = vec![Ok(Bytes::from_static(b"hello ")), Ok(Bytes::from_static(b"world"))];
            Ok(Box::pin(futures_util::stream::iter(chunks)))
        }
    }

    fn sample_transfer() -> Transfer {
        Transfer {
            id: "t1".into(),
            name: "Demo".into(),
            label: "boxwarden".into(),
            save_parent_id: None,
            files: vec![TransferFile {
                path: "a.txt".into(),
                size_bytes: 11,
            }],
            progress_percent: 100.0,
            status: TransferStatus::completed(),
            peers: None,
            down_rate: None,
            eta: None,
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

    #[tokio::test]
    async fn download_transfer_writes_file_and_marks_downloaded() {
        let (repository, _repo_dir) = test_repository().await;
        let download_dir = tempfile::tempdir().expect("download dir");
        let metrics = Metrics::new().expect("metrics");
        let events = EventBus::with_capacity(16);
        let mut stream = events.subscribe(None);

        repository.claim_transfer("t1").await.expect("claim");

        let downloader = Arc::new(Downloader::new(
            Arc::clone(&repository),
            Arc::new(StaticFileBackend),
            None,
            Arc::new(ProbeSet::default()),
            events,
            Arc::new(TransferCatalog::new()),
            download_dir.path().to_path_buf(),
            2,
            Duration::from_millis(50),
            metrics,
        ));

        downloader.clone().download_transfer(sample_transfer()).await;

        let contents = tokio::fs::read_to_string(download_dir.path().join("a.txt"))
            .await
            .expect("written file");
        assert_eq!(contents, "hello world");

        let envelope = stream.next().await.expect("event");
        assert_eq!(envelope.event.kind(), "transfer_download_finished");

        let downloads = repository.get_downloads().await.expect("downloads");
        assert_eq!(downloads[0].status, DownloadStatus::Downloaded);
    }
}
