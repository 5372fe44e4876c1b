//! The durable claim repository (§4.A "State Repository").
//!
//! A single SQLite-backed `downloads` table is the only shared mutable state
//! in the system (§5 "Shared-resource policy"). `claim_transfer` is the sole
//! write path that may create a row or move one out of `pending`; every other
//! write is owner-gated through `update_transfer_status`.

use std::str::FromStr;
use std::time::Duration;

use boxwarden_telemetry::{Metrics, instrumented};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::error::{DataError, Result};
use crate::instance::InstanceId;

const CREATE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS downloads (
    transfer_id TEXT UNIQUE NOT NULL,
    downloaded_at DATETIME,
    status TEXT NOT NULL,
    locked_by TEXT NOT NULL DEFAULT ''
)
";

const CLAIM_TRANSFER: &str = r"
INSERT INTO downloads (transfer_id, status, locked_by, downloaded_at)
VALUES (?1, 'downloading', ?2, NULL)
ON CONFLICT(transfer_id) DO UPDATE SET
    status = 'downloading',
    locked_by = excluded.locked_by
WHERE downloads.status = 'pending'
";

const UPDATE_STATUS: &str = r"
UPDATE downloads SET status = ?2, downloaded_at = CASE
    WHEN ?2 = 'downloaded' AND downloaded_at IS NULL THEN ?3
    ELSE downloaded_at
END
WHERE transfer_id = ?1
";

const SELECT_DOWNLOADS: &str =
    "SELECT transfer_id, status, locked_by, downloaded_at FROM downloads";

const SELECT_PENDING_CLAIMABLE: &str =
    "SELECT transfer_id FROM downloads WHERE locked_by = '' LIMIT ?1";

/// Status of a [`DownloadRecord`], per §3's `DownloadRecord` lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    /// Seen by the orchestrator but not yet claimed.
    Pending,
    /// Claimed by an instance; the download stage is active.
    Downloading,
    /// All files downloaded successfully; awaiting import confirmation.
    Downloaded,
    /// The media manager confirmed ingest.
    Imported,
    /// The download failed; eligible for manual reclaim (I4).
    Failed,
}

impl DownloadStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Downloaded => "downloaded",
            Self::Imported => "imported",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for DownloadStatus {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "downloading" => Ok(Self::Downloading),
            "downloaded" => Ok(Self::Downloaded),
            "imported" => Ok(Self::Imported),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown download status '{other}'")),
        }
    }
}

/// Durable row tracking one transfer's claim and lifecycle (§3 `DownloadRecord`).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DownloadRecord {
    /// Backend identifier for the transfer this row claims.
    pub transfer_id: String,
    /// Current lifecycle status.
    pub status: DownloadStatus,
    /// Instance identifier of the current owner, or empty if unclaimed.
    pub locked_by: String,
    /// Set the first time `status` reaches `downloaded`.
    pub downloaded_at: Option<DateTime<Utc>>,
}

/// Connection pool bounds (§4.A "Startup behaviour", defaults 25/5).
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Path to the SQLite database file (`db_path` in §6).
    pub db_path: String,
    /// Maximum open connections (`db_max_open_conns`, default 25).
    pub max_open_conns: u32,
    /// Maximum idle connections (`db_max_idle_conns`, default 5).
    pub max_idle_conns: u32,
}

impl PoolConfig {
    /// Construct pool bounds for the given database file using the spec's
    /// documented defaults.
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            max_open_conns: 25,
            max_idle_conns: 5,
        }
    }
}

/// The durable claim repository.
pub struct Repository {
    pool: SqlitePool,
    instance_id: InstanceId,
    metrics: Metrics,
}

impl Repository {
    /// Connect to the repository, validating connectivity with up to 3
    /// reachability probes using exponential backoff before giving up
    /// (§4.A "Startup behaviour").
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Unreachable`] if every probe fails, or
    /// [`DataError::SchemaInit`] if the fixed schema cannot be created.
    pub async fn connect(
        config: &PoolConfig,
        instance_id: InstanceId,
        metrics: Metrics,
    ) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.db_path)
            .unwrap_or_else(|_| SqliteConnectOptions::new().filename(&config.db_path))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_open_conns)
            .min_connections(config.max_idle_conns.min(config.max_open_conns))
            .connect_with(options.clone())
            .await
            .map_err(|source| DataError::Unreachable { attempts: 1, source })?;

        Self::probe_reachability(&pool).await?;

        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(|source| DataError::SchemaInit { source })?;

        Ok(Self {
            pool,
            instance_id,
            metrics,
        })
    }

    async fn probe_reachability(pool: &SqlitePool) -> Result<()> {
        const MAX_ATTEMPTS: u32 = 3;
        let mut delay = Duration::from_millis(100);
        let mut last_error = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match sqlx::query("SELECT 1").execute(pool).await {
                Ok(_) => return Ok(()),
                Err(source) => {
                    tracing::warn!(attempt, "repository reachability probe failed");
                    last_error = Some(source);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(DataError::Unreachable {
            attempts: MAX_ATTEMPTS,
            source: last_error.expect("loop ran at least once"),
        })
    }

    /// The process-wide instance identifier used as `locked_by`.
    #[must_use]
    pub const fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    /// Atomically claim a transfer (§4.A `ClaimTransfer`).
    ///
    /// Returns `true` only if this call produced the `pending`/absent →
    /// `downloading` transition; all other observers of contention see
    /// `false` without modifying the row (I2).
    ///
    /// # Errors
    ///
    /// Returns [`DataError::QueryFailed`] if the underlying store is
    /// unavailable; callers should skip the transfer this tick (§4.A
    /// "Failure modes").
    pub async fn claim_transfer(&self, transfer_id: &str) -> Result<bool> {
        instrumented(
            &self.metrics,
            |metrics, operation, outcome| metrics.inc_repository_call(operation, outcome),
            transfer_id,
            "claim_transfer",
            || async {
                let result = sqlx::query(CLAIM_TRANSFER)
                    .bind(transfer_id)
                    .bind(self.instance_id.as_str())
                    .execute(&self.pool)
                    .await
                    .map_err(|source| DataError::QueryFailed {
                        operation: "claim_transfer",
                        source,
                    })?;

                Ok(result.rows_affected() > 0)
            },
        )
        .await
    }

    /// Unconditionally write a transfer's status (§4.A `UpdateTransferStatus`).
    /// The caller guarantees it is the current owner.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::QueryFailed`] on a store failure.
    pub async fn update_transfer_status(
        &self,
        transfer_id: &str,
        status: DownloadStatus,
    ) -> Result<()> {
        instrumented(
            &self.metrics,
            |metrics, operation, outcome| metrics.inc_repository_call(operation, outcome),
            transfer_id,
            "update_transfer_status",
            || async {
                sqlx::query(UPDATE_STATUS)
                    .bind(transfer_id)
                    .bind(status.as_str())
                    .bind(Utc::now())
                    .execute(&self.pool)
                    .await
                    .map_err(|source| DataError::QueryFailed {
                        operation: "update_transfer_status",
                        source,
                    })?;
                Ok(())
            },
        )
        .await
    }

    /// Snapshot every row for retention/inspection (§4.A `GetDownloads`).
    ///
    /// # Errors
    ///
    /// Returns [`DataError::QueryFailed`] on a store failure.
    pub async fn get_downloads(&self) -> Result<Vec<DownloadRecord>> {
        instrumented(
            &self.metrics,
            |metrics, operation, outcome| metrics.inc_repository_call(operation, outcome),
            "all",
            "get_downloads",
            || async {
                let rows = sqlx::query(SELECT_DOWNLOADS)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|source| DataError::QueryFailed {
                        operation: "get_downloads",
                        source,
                    })?;

                Ok(rows
                    .into_iter()
                    .map(|row| {
                        let status_str: String = row.get("status");
                        DownloadRecord {
                            transfer_id: row.get("transfer_id"),
                            status: status_str.parse().unwrap_or(DownloadStatus::Failed),
                            locked_by: row.get("locked_by"),
                            downloaded_at: row.get("downloaded_at"),
                        }
                    })
                    .collect())
            },
        )
        .await
    }

    /// Advisory listing of unclaimed rows (§4.A `GetPendingClaimable`).
    ///
    /// # Errors
    ///
    /// Returns [`DataError::QueryFailed`] on a store failure.
    pub async fn get_pending_claimable(&self, limit: i64) -> Result<Vec<String>> {
        instrumented(
            &self.metrics,
            |metrics, operation, outcome| metrics.inc_repository_call(operation, outcome),
            "all",
            "get_pending_claimable",
            || async {
                let rows = sqlx::query(SELECT_PENDING_CLAIMABLE)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|source| DataError::QueryFailed {
                        operation: "get_pending_claimable",
                        source,
                    })?;

                Ok(rows.into_iter().map(|row| row.get("transfer_id")).collect())
            },
        )
        .await
    }

    /// Release the underlying connection pool (§4.A `Close`).
    pub async fn close(self) {
        self.pool.close().await;
    }
}
