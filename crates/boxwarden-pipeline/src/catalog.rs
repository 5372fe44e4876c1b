//! In-memory transfer cache shared between the downloader and the
//! notification sink.
//!
//! The notification sink only ever observes a bare `transfer_id` on the event
//! bus, but starting the import/seeding watchers requires the full
//! `Transfer` (file list, name). Rather than have the sink reach back into
//! the backend, the downloader populates this cache when it begins work on a
//! transfer; the sink reads it back. This is the mediator resolution for the
//! notifier/downloader coupling: the downloader owns the cache and exposes
//! watcher-starting methods, the sink only calls them.

use std::collections::HashMap;
use std::sync::RwLock;

use boxwarden_backend::Transfer;

/// Shared cache of in-flight transfers, keyed by backend transfer id.
#[derive(Default)]
pub struct TransferCatalog {
    entries: RwLock<HashMap<String, Transfer>>,
}

impl TransferCatalog {
    /// Construct an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or replace a transfer's cached entry.
    ///
    /// # Panics
    ///
    /// Panics if the cache's lock has been poisoned.
    pub fn insert(&self, transfer: Transfer) {
        self.entries
            .write()
            .expect("transfer catalog lock poisoned")
            .insert(transfer.id.clone(), transfer);
    }

    /// Look up a cached transfer by id.
    ///
    /// # Panics
    ///
    /// Panics if the cache's lock has been poisoned.
    #[must_use]
    pub fn get(&self, transfer_id: &str) -> Option<Transfer> {
        self.entries
            .read()
            .expect("transfer catalog lock poisoned")
            .get(transfer_id)
            .cloned()
    }

    /// Drop a transfer's cached entry once its lifecycle is complete.
    ///
    /// # Panics
    ///
    /// Panics if the cache's lock has been poisoned.
    pub fn remove(&self, transfer_id: &str) {
        self.entries
            .write()
            .expect("transfer catalog lock poisoned")
            .remove(transfer_id);
    }
}

#[cfg(test)]
mod tests {
    use boxwarden_backend::{TransferFile, TransferStatus};

    use super::*;

    fn sample(id: &str) -> Transfer {
        Transfer {
            id: id.to_string(),
            name: "Sample".into(),
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

    #[test]
    fn insert_get_and_remove_round_trip() {
        let catalog = TransferCatalog::new();
        catalog.insert(sample("t1"));
        assert!(catalog.get("t1").is_some());
        catalog.remove("t1");
        assert!(catalog.get("t1").is_none());
    }
}
