//! Attribution record model, id generation and ledger keys.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Ledger key holding the JSON array of record ids.
pub const INDEX_KEY: &str = "attribution_keys";

/// Prefix of every record entry key.
pub const RECORD_KEY_PREFIX: &str = "attribution_";

/// Length of the random suffix of a record id.
pub const ID_SUFFIX_LEN: usize = 7;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// One submitted attribution event batch.
///
/// Created once by the store and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique id; the record lives under `attribution_{id}`.
    pub id: String,
    /// Opaque payload blob. The store never looks inside.
    pub payload: String,
    /// Submission time, Unix seconds.
    pub timestamp: u64,
    /// Account address of the submitter.
    pub advertiser: String,
    /// Free-text campaign label.
    pub campaign: String,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    /// Score computed at submission; never recomputed on read.
    pub contribution_score: f64,
}

/// Caller-supplied fields of a new record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordInput {
    pub campaign: String,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
}

impl RecordInput {
    /// Build an input from typed counters.
    pub fn new(campaign: impl Into<String>, impressions: u64, clicks: u64, conversions: u64) -> Self {
        Self {
            campaign: campaign.into(),
            impressions,
            clicks,
            conversions,
        }
    }

    /// Build an input from raw form text.
    ///
    /// Counters are read like a form field: leading whitespace is skipped,
    /// the leading run of digits is taken, and anything without one becomes
    /// 0. Negative values become 0. Values beyond `u64::MAX` saturate.
    pub fn from_form(campaign: &str, impressions: &str, clicks: &str, conversions: &str) -> Self {
        Self {
            campaign: campaign.to_string(),
            impressions: parse_counter(impressions),
            clicks: parse_counter(clicks),
            conversions: parse_counter(conversions),
        }
    }
}

/// Parse the leading integer of a form field, defaulting to 0.
pub fn parse_counter(text: &str) -> u64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let mut value: u64 = 0;
    let mut seen = false;
    for b in digits.bytes() {
        if !b.is_ascii_digit() {
            break;
        }
        seen = true;
        value = value
            .saturating_mul(10)
            .saturating_add(u64::from(b - b'0'));
    }
    if !seen || negative {
        return 0;
    }
    value
}

/// Ledger key of the record with the given id.
pub fn record_key(id: &str) -> String {
    format!("{RECORD_KEY_PREFIX}{id}")
}

/// Generate a fresh record id: `{unix_millis}-{7 random base-36 chars}`.
pub fn generate_record_id() -> String {
    generate_record_id_at(unix_millis())
}

/// Generate a record id for a given millisecond timestamp.
pub fn generate_record_id_at(millis: u128) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
        .collect();
    format!("{millis}-{suffix}")
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Current Unix time in milliseconds.
pub fn unix_millis() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
