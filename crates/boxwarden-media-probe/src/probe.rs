//! Media-manager history probe (§4.C "Media-Manager Probe").

use reqwest::Client;
use serde::Deserialize;

use crate::error::{ProbeError, ProbeResult};
use crate::model::{HistoryPage, IMPORTED_EVENT};

const PAGE_SIZE: u32 = 50;

/// Configuration for a single media manager instance (§6: "zero or more
/// `{api_key, base_url}` pairs").
#[derive(Debug, Clone, Deserialize)]
pub struct MediaManagerConfig {
    /// Base URL of the media manager instance, e.g. `http://sonarr:8989`.
    pub base_url: String,
    /// API key sent as the `apikey` query parameter.
    pub api_key: String,
}

/// Queries one media manager's history API for an import confirmation.
pub struct MediaManagerProbe {
    client: Client,
    config: MediaManagerConfig,
}

impl MediaManagerProbe {
    /// Build a probe for a single configured media manager.
    #[must_use]
    pub fn new(client: Client, config: MediaManagerConfig) -> Self {
        Self { client, config }
    }

    /// Paginate the history API once, looking for a `downloadFolderImported`
    /// event whose `droppedPath` equals `target_path`. One full pass per
    /// call; the caller controls the polling period.
    pub async fn check_imported(&self, target_path: &str) -> ProbeResult<bool> {
        let mut page_number = 1;
        loop {
            let page = self.fetch_page(page_number).await?;
            if page
                .records
                .iter()
                .any(|record| record.event_type == IMPORTED_EVENT && record.data.dropped_path.as_deref() == Some(target_path))
            {
                return Ok(true);
            }

            let fetched_so_far = page_number * page.page_size.max(1);
            if page.records.is_empty() || fetched_so_far >= page.total_records {
                return Ok(false);
            }
            page_number += 1;
        }
    }

    async fn fetch_page(&self, page_number: u32) -> ProbeResult<HistoryPage> {
        let url = format!("{}/api/v3/history", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("page", page_number.to_string()),
                ("pageSize", PAGE_SIZE.to_string()),
                ("apikey", self.config.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|source| ProbeError::Network {
                page: page_number,
                source: Box::new(source),
            })?
            .error_for_status()
            .map_err(|source| ProbeError::Network {
                page: page_number,
                source: Box::new(source),
            })?;

        response.json::<HistoryPage>().await.map_err(|source| ProbeError::MalformedResponse {
            page: page_number,
            reason: source.to_string(),
        })
    }
}

/// Zero or more configured probes, evaluated in order until the first
/// success (§4.C, §4.E.2).
#[derive(Default)]
pub struct ProbeSet {
    probes: Vec<MediaManagerProbe>,
}

impl ProbeSet {
    /// Build a set from already-constructed probes.
    #[must_use]
    pub fn new(probes: Vec<MediaManagerProbe>) -> Self {
        Self { probes }
    }

    /// Check every configured probe for `target_path`, returning `true` on
    /// the first success. A probe that errors is logged and skipped rather
    /// than failing the whole check, matching the transient-error handling
    /// the import watcher applies to its ticks.
    pub async fn check_imported(&self, target_path: &str) -> bool {
        for probe in &self.probes {
            match probe.check_imported(target_path).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(error = %err, target_path, "media manager probe failed, skipping");
                }
            }
        }
        false
    }
}
