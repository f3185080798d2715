//! Opaque payload encoding.
//!
//! Each record carries a `data` blob derived from the submitted input. The
//! store writes whatever the configured [`PayloadEncoder`] produces and never
//! reads it back, so a real encryption scheme can replace the envelope
//! without any change to the record layout or the store.

use base64::Engine;

/// Prefix marking an envelope-encoded payload.
pub const ENVELOPE_PREFIX: &str = "FHE-";

/// Turns a plaintext description of a submission into an opaque blob.
pub trait PayloadEncoder: Send + Sync {
    fn obscure(&self, plaintext: &str) -> String;
}

/// Reversible reference encoding: `FHE-` followed by standard base64.
///
/// Provides no confidentiality.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvelopeEncoder;

impl EnvelopeEncoder {
    /// Recover the plaintext from an envelope, if `blob` is one.
    pub fn reveal(&self, blob: &str) -> Option<String> {
        let encoded = blob.strip_prefix(ENVELOPE_PREFIX)?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .ok()?;
        String::from_utf8(bytes).ok()
    }
}

impl PayloadEncoder for EnvelopeEncoder {
    fn obscure(&self, plaintext: &str) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(plaintext.as_bytes());
        format!("{ENVELOPE_PREFIX}{encoded}")
    }
}

/// Identity encoding.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainEncoder;

impl PayloadEncoder for PlainEncoder {
    fn obscure(&self, plaintext: &str) -> String {
        plaintext.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let blob = EnvelopeEncoder.obscure("{\"campaign\":\"a\"}");
        assert!(blob.starts_with(ENVELOPE_PREFIX));
        assert_eq!(blob, "FHE-eyJjYW1wYWlnbiI6ImEifQ==");
    }

    #[test]
    fn test_envelope_reveal() {
        let plaintext = "{\"campaign\":\"Zürich\",\"impressions\":10}";
        let blob = EnvelopeEncoder.obscure(plaintext);
        assert_eq!(EnvelopeEncoder.reveal(&blob).as_deref(), Some(plaintext));
    }

    #[test]
    fn test_reveal_rejects_foreign_blobs() {
        assert!(EnvelopeEncoder.reveal("plain text").is_none());
        assert!(EnvelopeEncoder.reveal("FHE-***").is_none());
    }

    #[test]
    fn test_plain_is_identity() {
        assert_eq!(PlainEncoder.obscure("abc"), "abc");
    }
}
