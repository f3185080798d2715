//! Subcommand handlers. Each returns the JSON document printed on stdout.

use serde_json::{json, Value};
use shapley_ledger::LedgerGateway;
use shapley_store::{IndexState, RecordInput, RecordStore};

type Result = anyhow::Result<Value>;

/// Ledger availability and key index health.
pub async fn status<G: LedgerGateway>(store: &RecordStore<G>) -> Result {
    let available = store.check_availability().await?;
    let index = match store.index().inspect(store.ledger()).await? {
        IndexState::Empty => json!({"state": "empty", "records": 0}),
        IndexState::Populated(ids) => json!({"state": "populated", "records": ids.len()}),
        IndexState::Corrupt(reason) => json!({"state": "corrupt", "reason": reason}),
    };
    Ok(json!({
        "available": available,
        "advertiser": store.advertiser(),
        "index": index,
    }))
}

/// Records newest first, or the top `n` by contribution score.
pub async fn list<G: LedgerGateway>(store: &RecordStore<G>, top: Option<usize>) -> Result {
    if let Some(limit) = top {
        let records = store.top_contributors(limit).await?;
        return Ok(json!({ "records": records }));
    }
    let listing = store.list_detailed().await?;
    Ok(json!({
        "records": listing.records,
        "skipped": listing.skipped,
    }))
}

/// Submit one record from raw form values.
pub async fn submit<G: LedgerGateway>(
    store: &RecordStore<G>,
    campaign: &str,
    impressions: &str,
    clicks: &str,
    conversions: &str,
) -> Result {
    let input = RecordInput::from_form(campaign, impressions, clicks, conversions);
    let submission = store.submit_detailed(input).await?;
    Ok(json!({
        "record": submission.record,
        "indexed": submission.indexed,
    }))
}

/// Dashboard totals.
pub async fn stats<G: LedgerGateway>(store: &RecordStore<G>) -> Result {
    let summary = store.summary().await?;
    Ok(serde_json::to_value(summary)?)
}

#[cfg(test)]
mod tests {
    use shapley_ledger::MemoryLedger;
    use shapley_store::INDEX_KEY;

    use super::*;

    fn store() -> RecordStore<MemoryLedger> {
        RecordStore::new(MemoryLedger::new(), "0xabc")
    }

    #[tokio::test]
    async fn test_status_reports_index_state() {
        let store = store();
        let out = status(&store).await.expect("status");
        assert_eq!(out["available"], true);
        assert_eq!(out["index"]["state"], "empty");

        submit(&store, "c", "10", "1", "1").await.expect("submit");
        let out = status(&store).await.expect("status");
        assert_eq!(out["index"]["state"], "populated");
        assert_eq!(out["index"]["records"], 1);

        store.ledger().insert_raw(INDEX_KEY, b"oops".to_vec());
        let out = status(&store).await.expect("status");
        assert_eq!(out["index"]["state"], "corrupt");
    }

    #[tokio::test]
    async fn test_submit_parses_form_values() {
        let store = store();
        let out = submit(&store, "Spring", "100", "50abc", "").await.expect("submit");
        assert_eq!(out["indexed"], true);
        assert_eq!(out["record"]["campaign"], "Spring");
        assert_eq!(out["record"]["clicks"], 50);
        assert_eq!(out["record"]["conversions"], 0);
        assert_eq!(out["record"]["advertiser"], "0xabc");
    }

    #[tokio::test]
    async fn test_submit_empty_campaign_is_error() {
        let store = store();
        assert!(submit(&store, "", "1", "1", "1").await.is_err());
    }

    #[tokio::test]
    async fn test_list_and_top() {
        let store = store();
        submit(&store, "a", "100", "1", "0").await.expect("submit");
        submit(&store, "b", "10", "5", "20").await.expect("submit");

        let out = list(&store, None).await.expect("list");
        assert_eq!(out["records"].as_array().map(Vec::len), Some(2));
        assert_eq!(out["skipped"].as_array().map(Vec::len), Some(0));

        let out = list(&store, Some(1)).await.expect("top");
        assert_eq!(out["records"][0]["campaign"], "b");
    }

    #[tokio::test]
    async fn test_stats() {
        let store = store();
        submit(&store, "a", "100", "50", "50").await.expect("submit");
        let out = stats(&store).await.expect("stats");
        assert_eq!(out["total_records"], 1);
        assert_eq!(out["total_impressions"], 100);
    }
}
