//! Record store orchestrator.
//!
//! [`RecordStore`] ties the ledger, the key index, the codec and the scorer
//! together. It is an owned value: callers hold one per ledger connection and
//! pass it by reference.
//!
//! Listing is best effort per record: an id whose entry cannot be read or
//! decoded is logged and skipped, never failing the whole listing.
//! Submission writes the record first and the index second; if the second
//! step fails the record is left orphaned and the submission still counts.

use serde::{Deserialize, Serialize};
use shapley_ledger::LedgerGateway;
use tracing::{debug, info, warn};

use crate::key_index::{KeyIndex, LedgerKeyIndex};
use crate::payload::{EnvelopeEncoder, PayloadEncoder};
use crate::record::{self, Record, RecordInput};
use crate::stats::{self, Summary};
use crate::{codec, Result, StoreError};

/// Store behaviour switches.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Ask the ledger whether it is available before listing, and fail the
    /// listing with `BackendUnavailable` when it says no.
    #[serde(default)]
    pub check_availability_on_list: bool,
}

/// Result of a submission.
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    /// The record as written to the ledger.
    pub record: Record,
    /// Whether the id made it into the key index. `false` means the record
    /// is orphaned: stored but invisible to listing.
    pub indexed: bool,
}

/// An index entry that could not be turned into a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub id: String,
    pub reason: String,
}

/// Outcome of a listing, with per-id failures kept apart.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Listing {
    /// Decoded records, newest first.
    pub records: Vec<Record>,
    /// Ids listed in the index whose entries were unusable.
    pub skipped: Vec<SkippedRecord>,
}

/// Attribution record store over a key-value ledger.
pub struct RecordStore<G, I = LedgerKeyIndex, P = EnvelopeEncoder> {
    ledger: G,
    index: I,
    encoder: P,
    advertiser: String,
    config: StoreConfig,
}

impl<G: LedgerGateway> RecordStore<G> {
    /// Store with the standard index and payload envelope, submitting as
    /// `advertiser`.
    pub fn new(ledger: G, advertiser: impl Into<String>) -> Self {
        Self::with_parts(ledger, LedgerKeyIndex::new(), EnvelopeEncoder, advertiser)
    }
}

impl<G, I, P> RecordStore<G, I, P>
where
    G: LedgerGateway,
    I: KeyIndex,
    P: PayloadEncoder,
{
    /// Store with an explicit index policy and payload encoder.
    pub fn with_parts(ledger: G, index: I, encoder: P, advertiser: impl Into<String>) -> Self {
        Self {
            ledger,
            index,
            encoder,
            advertiser: advertiser.into(),
            config: StoreConfig::default(),
        }
    }

    /// Replace the store configuration.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn ledger(&self) -> &G {
        &self.ledger
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn advertiser(&self) -> &str {
        &self.advertiser
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Ask the ledger whether it is serving.
    pub async fn check_availability(&self) -> Result<bool> {
        self.ledger
            .is_available()
            .await
            .map_err(StoreError::from_read)
    }

    /// All readable records, newest first.
    pub async fn list_all(&self) -> Result<Vec<Record>> {
        Ok(self.list_detailed().await?.records)
    }

    /// All readable records, newest first, plus the ids that were skipped.
    ///
    /// Records with equal timestamps keep their index order.
    pub async fn list_detailed(&self) -> Result<Listing> {
        if self.config.check_availability_on_list && !self.check_availability().await? {
            return Err(StoreError::BackendUnavailable(
                "ledger reports unavailable".to_string(),
            ));
        }

        let ids = self.index.read(&self.ledger).await?;
        let mut listing = Listing::default();
        for id in ids {
            match self.load_record(&id).await {
                Ok(record) => listing.records.push(record),
                Err(e) => {
                    warn!(%id, error = %e, "skipping unreadable attribution record");
                    listing.skipped.push(SkippedRecord {
                        id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Stable: ties keep index order.
        listing
            .records
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        debug!(
            records = listing.records.len(),
            skipped = listing.skipped.len(),
            "listing complete"
        );
        Ok(listing)
    }

    async fn load_record(&self, id: &str) -> Result<Record> {
        let key = record::record_key(id);
        let bytes = self
            .ledger
            .get_data(&key)
            .await
            .map_err(StoreError::from_read)?;
        Ok(codec::decode(id, &bytes)?)
    }

    /// Submit a new record and return it.
    ///
    /// A record whose index append failed is still returned; see
    /// [`submit_detailed`](Self::submit_detailed) to tell the two apart.
    pub async fn submit(&self, input: RecordInput) -> Result<Record> {
        Ok(self.submit_detailed(input).await?.record)
    }

    /// Submit a new record stamped with the current time.
    pub async fn submit_detailed(&self, input: RecordInput) -> Result<Submission> {
        self.submit_at(input, record::unix_now()).await
    }

    /// Submit a new record stamped with `timestamp` (Unix seconds).
    pub async fn submit_at(&self, input: RecordInput, timestamp: u64) -> Result<Submission> {
        self.validate(&input)?;

        let contribution_score =
            crate::scorer::score(input.impressions, input.clicks, input.conversions);
        let plaintext =
            serde_json::to_string(&input).map_err(|e| StoreError::Encode(e.to_string()))?;

        let record = Record {
            id: record::generate_record_id(),
            payload: self.encoder.obscure(&plaintext),
            timestamp,
            advertiser: self.advertiser.clone(),
            campaign: input.campaign,
            impressions: input.impressions,
            clicks: input.clicks,
            conversions: input.conversions,
            contribution_score,
        };

        let key = record::record_key(&record.id);
        let bytes = codec::encode(&record)?;
        self.ledger
            .set_data(&key, bytes)
            .await
            .map_err(|e| StoreError::from_write(&key, e))?;

        let indexed = match self.index.append(&self.ledger, &record.id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    id = %record.id,
                    error = %e,
                    "record written but not indexed; it will not be listed"
                );
                false
            }
        };

        info!(
            id = %record.id,
            campaign = %record.campaign,
            score = record.contribution_score,
            indexed,
            "attribution record submitted"
        );
        Ok(Submission { record, indexed })
    }

    fn validate(&self, input: &RecordInput) -> Result<()> {
        if input.campaign.is_empty() {
            return Err(StoreError::Validation("campaign must not be empty".to_string()));
        }
        if self.advertiser.is_empty() {
            return Err(StoreError::Validation(
                "no advertiser account connected".to_string(),
            ));
        }
        Ok(())
    }

    /// Totals and mean score over every listed record.
    pub async fn summary(&self) -> Result<Summary> {
        let records = self.list_all().await?;
        Ok(stats::summarize(&records))
    }

    /// The `limit` listed records with the highest contribution score.
    pub async fn top_contributors(&self, limit: usize) -> Result<Vec<Record>> {
        let records = self.list_all().await?;
        Ok(stats::rank_by_contribution(&records, limit)
            .into_iter()
            .cloned()
            .collect())
    }
}
