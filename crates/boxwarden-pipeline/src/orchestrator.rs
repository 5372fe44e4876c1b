//! Transfer orchestrator (§4.D).

use std::sync::Arc;
use std::time::Duration;

use boxwarden_backend::{DiscoverBackend, Transfer};
use boxwarden_data::Repository;
use boxwarden_telemetry::Metrics;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::supervise::supervise;

/// Periodic discovery-and-claim loop handing claimed transfers to the
/// downloader over a point-to-point queue (§4.D, §4.K).
pub struct Orchestrator {
    repository: Arc<Repository>,
    backend: Arc<dyn DiscoverBackend>,
    work_tx: mpsc::Sender<Transfer>,
    target_label: String,
    polling_interval: Duration,
    metrics: Metrics,
}

impl Orchestrator {
    /// Construct the orchestrator. `work_tx` should be sized to at least the
    /// expected enumeration size of a single `get_tagged_transfers` call so a
    /// publish never blocks mid-tick (§4.D "Queue semantics").
    #[must_use]
    pub fn new(
        repository: Arc<Repository>,
        backend: Arc<dyn DiscoverBackend>,
        work_tx: mpsc::Sender<Transfer>,
        target_label: String,
        polling_interval: Duration,
        metrics: Metrics,
    ) -> Self {
        Self {
            repository,
            backend,
            work_tx,
            target_label,
            polling_interval,
            metrics,
        }
    }

    /// Run the orchestrator under the panic-guard supervisor until
    /// `cancellation` fires. Ticks never overlap: each tick is awaited to
    /// completion before the next timer fires.
    pub async fn run(self: Arc<Self>, cancellation: CancellationToken) {
        supervise("orchestrator", cancellation.clone(), move || {
            let orchestrator = Arc::clone(&self);
            let cancellation = cancellation.clone();
            async move { orchestrator.run_loop(cancellation).await }
        })
        .await;
    }

    async fn run_loop(&self, cancellation: CancellationToken) {
        let mut ticker = tokio::time::interval(self.polling_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancellation.cancelled() => return,
                _ = ticker.tick() => self.tick().await,
            }
        }
    }

    async fn tick(&self) {
        let transfers = match self.backend.get_tagged_transfers(&self.target_label).await {
            Ok(transfers) => transfers,
            Err(error) => {
                tracing::warn!(%error, "orchestrator failed to enumerate tagged transfers this tick");
                return;
            }
        };

        for transfer in transfers {
            if !transfer.is_claimable() {
                continue;
            }

            match self.repository.claim_transfer(&transfer.id).await {
                Ok(true) => {
                    let transfer_id = transfer.id.clone();
                    if self.work_tx.send(transfer).await.is_err() {
                        tracing::warn!(transfer_id, "downloader work queue closed; dropping claimed transfer");
                    } else {
                        self.metrics.add_queue_depth(1);
                    }
                }
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!(transfer_id = %transfer.id, %error, "claim_transfer failed; skipping for this tick");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use boxwarden_backend::{BackendResult, ByteStream, TransferFile, TransferStatus};
    use boxwarden_data::{InstanceId, PoolConfig};

    use super::*;

    struct StubBackend {
        transfers: Mutex<Vec<Transfer>>,
    }

    #[async_trait]
    impl DiscoverBackend for StubBackend {
        async fn authenticate(&self) -> BackendResult<()> {
            Ok(())
        }

        async fn get_tagged_transfers(&self, _label: &str) -> BackendResult<Vec<Transfer>> {
            Ok(self.transfers.lock().expect("lock").clone())
        }

        async fn grab_file(&self, _transfer: &Transfer, _file: &TransferFile) -> BackendResult<ByteStream> {
            unimplemented!("orchestrator never calls grab_file")
        }
    }

    fn claimable_transfer(id: &str) -> Transfer {
        Transfer {
            id: id.to_string(),
            name: "Demo".into(),
            label: "boxwarden".into(),
            save_parent_id: None,
            files: vec![TransferFile {
                path: "a.mkv".into(),
                size_bytes: 10,
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
    async fn tick_claims_claimable_transfers_and_skips_others() {
        let (repository, _dir) = test_repository().await;
        let backend = Arc::new(StubBackend {
            transfers: Mutex::new(vec![
                claimable_transfer("ready"),
                Transfer {
                    status: TransferStatus::downloading(),
                    ..claimable_transfer("still-downloading")
                },
            ]),
        });
        let (work_tx, mut work_rx) = mpsc::channel(8);
        let metrics = Metrics::new().expect("metrics");
        let orchestrator = Orchestrator::new(
            Arc::clone(&repository),
            backend,
            work_tx,
            "boxwarden".into(),
            Duration::from_secs(60),
            metrics,
        );

        orchestrator.tick().await;

        let queued = work_rx.try_recv().expect("one transfer queued");
        assert_eq!(queued.id, "ready");
        assert!(work_rx.try_recv().is_err());
        assert!(!repository.claim_transfer("ready").await.expect("claim"));
    }
}
