//! JSON encoding of one record entry.
//!
//! The document layout is fixed by the records already on the ledger:
//!
//! ```text
//! { "data": string, "timestamp": number, "advertiser": string, "campaign": string,
//!   "impressions": number, "clicks": number, "conversions": number,
//!   "contributionScore": number }
//! ```
//!
//! The id is not part of the document; it is the suffix of the entry key.
//!
//! Decoding is strict only about the fields a record cannot exist without
//! (`advertiser`, `campaign`, `timestamp`). Counters and the score were
//! written by clients of varying quality, so anything unusable there reads
//! as 0 instead of failing the record.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::record::Record;
use crate::{DecodeError, StoreError};

/// Wire form of a record. Field order is the serialization order.
#[derive(Serialize)]
struct Document<'a> {
    data: &'a str,
    timestamp: u64,
    advertiser: &'a str,
    campaign: &'a str,
    impressions: u64,
    clicks: u64,
    conversions: u64,
    #[serde(rename = "contributionScore")]
    contribution_score: f64,
}

/// Encode a record as UTF-8 JSON.
pub fn encode(record: &Record) -> crate::Result<Vec<u8>> {
    let doc = Document {
        data: &record.payload,
        timestamp: record.timestamp,
        advertiser: &record.advertiser,
        campaign: &record.campaign,
        impressions: record.impressions,
        clicks: record.clicks,
        conversions: record.conversions,
        contribution_score: record.contribution_score,
    };
    serde_json::to_vec(&doc).map_err(|e| StoreError::Encode(e.to_string()))
}

/// Decode the record stored under `attribution_{id}`.
pub fn decode(id: &str, bytes: &[u8]) -> Result<Record, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Malformed("empty document".to_string()));
    }
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| DecodeError::Malformed(format!("not JSON: {e}")))?;
    let Value::Object(doc) = value else {
        return Err(DecodeError::Malformed("document is not an object".to_string()));
    };

    Ok(Record {
        id: id.to_string(),
        payload: doc
            .get("data")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        timestamp: required_timestamp(&doc)?,
        advertiser: required_str(&doc, "advertiser")?,
        campaign: required_str(&doc, "campaign")?,
        impressions: lenient_counter(doc.get("impressions")),
        clicks: lenient_counter(doc.get("clicks")),
        conversions: lenient_counter(doc.get("conversions")),
        contribution_score: lenient_score(doc.get("contributionScore")),
    })
}

fn required_str(doc: &Map<String, Value>, field: &str) -> Result<String, DecodeError> {
    match doc.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(DecodeError::Malformed(format!("'{field}' is not a string"))),
        None => Err(DecodeError::Malformed(format!("missing '{field}'"))),
    }
}

fn required_timestamp(doc: &Map<String, Value>) -> Result<u64, DecodeError> {
    let Some(value) = doc.get("timestamp") else {
        return Err(DecodeError::Malformed("missing 'timestamp'".to_string()));
    };
    let Value::Number(n) = value else {
        return Err(DecodeError::Malformed("'timestamp' is not a number".to_string()));
    };
    if let Some(secs) = n.as_u64() {
        return Ok(secs);
    }
    match n.as_f64() {
        Some(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs as u64),
        _ => Err(DecodeError::Malformed(format!("'timestamp' out of range: {n}"))),
    }
}

/// Non-negative integer, or 0 when absent or unusable.
fn lenient_counter(value: Option<&Value>) -> u64 {
    let as_float = match value {
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                return v;
            }
            n.as_f64()
        }
        Some(Value::String(s)) => {
            let s = s.trim();
            if let Ok(v) = s.parse::<u64>() {
                return v;
            }
            s.parse::<f64>().ok()
        }
        _ => None,
    };
    match as_float {
        // `as` saturates at u64::MAX.
        Some(v) if v.is_finite() && v >= 0.0 => v as u64,
        _ => 0,
    }
}

/// Finite float, or 0 when absent or unusable.
fn lenient_score(value: Option<&Value>) -> f64 {
    let score = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    score.filter(|v| v.is_finite()).unwrap_or(0.0)
}
