//! Wire shapes for the media manager's history API (Sonarr/Radarr-style).

use serde::Deserialize;

/// One page of the history listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HistoryPage {
    pub(crate) page: u32,
    pub(crate) page_size: u32,
    pub(crate) total_records: u32,
    pub(crate) records: Vec<HistoryRecord>,
}

/// A single history event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HistoryRecord {
    pub(crate) event_type: String,
    #[serde(default)]
    pub(crate) data: HistoryEventData,
}

/// The subset of a history event's free-form `data` bag this crate cares
/// about. The upstream API carries many more fields; everything else is
/// ignored by `serde`'s default struct deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HistoryEventData {
    pub(crate) dropped_path: Option<String>,
}

/// Event type name the probe watches for.
pub(crate) const IMPORTED_EVENT: &str = "downloadFolderImported";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_typical_history_page() {
        let body = r#"{
            "page": 1,
            "pageSize": 50,
            "totalRecords": 2,
            "records": [
                {"eventType": "grabbed", "data": {}},
                {"eventType": "downloadFolderImported", "data": {"droppedPath": "/downloads/Show S01E01"}}
            ]
        }"#;
        let page: HistoryPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.total_records, 2);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[1].event_type, IMPORTED_EVENT);
        assert_eq!(
            page.records[1].data.dropped_path.as_deref(),
            Some("/downloads/Show S01E01")
        );
    }

    #[test]
    fn tolerates_a_record_with_no_data_bag() {
        let body = r#"{"page":1,"pageSize":50,"totalRecords":1,"records":[{"eventType":"grabbed"}]}"#;
        let page: HistoryPage = serde_json::from_str(body).unwrap();
        assert!(page.records[0].data.dropped_path.is_none());
    }
}
