//! Restricting the report to a single client.

use std::collections::BTreeSet;

use portfolio_core::error::{ReportError, Result};
use portfolio_core::models::{EnrichedRecord, EventTable};

/// Distinct clients of the event table, sorted. These are the only valid
/// selections.
pub fn client_choices(events: &EventTable) -> Vec<String> {
    events
        .records
        .iter()
        .filter_map(|e| e.client.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Check `client` against the event table's clients.
pub fn validate_client(events: &EventTable, client: &str) -> Result<()> {
    if events
        .records
        .iter()
        .any(|e| e.client.as_deref() == Some(client))
    {
        Ok(())
    } else {
        Err(ReportError::UnknownClient(client.to_string()))
    }
}

/// Rows belonging to `client`, in their original order. An empty result is
/// valid.
pub fn filter_by_client(rows: &[EnrichedRecord], client: &str) -> Vec<EnrichedRecord> {
    rows.iter()
        .filter(|r| r.client() == Some(client))
        .cloned()
        .collect()
}
