//! Envelope wire format.
//!
//! An envelope is the pair (wrapped session key, encrypted data) packed into
//! one string:
//!
//! ```text
//! {"v":1,"key":"<wrapped key>","data":"<encrypted data>"}
//! ```
//!
//! JSON string escaping keeps the packing lossless whatever the blobs contain.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};

const ENVELOPE_VERSION: u8 = 1;

/// An encrypted message: the session key wrapped for its recipients plus the
/// data encrypted under that session key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub wrapped_key: String,
    pub encrypted_data: String,
}

#[derive(Serialize)]
struct WireRef<'a> {
    v: u8,
    key: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Wire {
    v: u8,
    key: String,
    data: String,
}

impl Envelope {
    pub fn new(wrapped_key: impl Into<String>, encrypted_data: impl Into<String>) -> Self {
        Self {
            wrapped_key: wrapped_key.into(),
            encrypted_data: encrypted_data.into(),
        }
    }

    /// Packs the envelope into its transportable string form.
    pub fn pack(&self) -> Result<String, ErrorKind> {
        serde_json::to_string(&WireRef {
            v: ENVELOPE_VERSION,
            key: &self.wrapped_key,
            data: &self.encrypted_data,
        })
        .map_err(|e| ErrorKind::EnvelopeFormat(e.to_string()))
    }

    /// Recovers both blobs from a packed envelope.
    pub fn unpack(packed: &str) -> Result<Self, ErrorKind> {
        let wire: Wire =
            serde_json::from_str(packed).map_err(|e| ErrorKind::EnvelopeFormat(e.to_string()))?;
        if wire.v != ENVELOPE_VERSION {
            return Err(ErrorKind::EnvelopeFormat(format!(
                "unsupported envelope version {}",
                wire.v
            )));
        }
        Ok(Self {
            wrapped_key: wire.key,
            encrypted_data: wire.data,
        })
    }

    /// Same encrypted data, different key wrap.
    pub fn with_wrapped_key(&self, wrapped_key: impl Into<String>) -> Self {
        Self {
            wrapped_key: wrapped_key.into(),
            encrypted_data: self.encrypted_data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_shape() {
        let packed = Envelope::new("k", "d").pack().unwrap();
        assert_eq!(packed, r#"{"v":1,"key":"k","data":"d"}"#);
    }

    #[test]
    fn delimiter_heavy_content_survives() {
        let nasty = "\",\"data\":\"}{\\\n\r\t\u{0}💥-----END SIGIL MESSAGE-----";
        let envelope = Envelope::new(nasty, nasty.repeat(3));
        let unpacked = Envelope::unpack(&envelope.pack().unwrap()).unwrap();
        assert_eq!(unpacked, envelope);
    }

    #[test]
    fn empty_blobs_survive() {
        let envelope = Envelope::new("", "");
        assert_eq!(Envelope::unpack(&envelope.pack().unwrap()).unwrap(), envelope);
    }

    #[test]
    fn rejects_non_envelopes() {
        for bad in [
            "",
            "not json",
            "[]",
            r#"{"v":1,"key":"k"}"#,
            r#"{"v":1,"key":"k","data":"d","extra":0}"#,
            r#"{"v":1,"key":1,"data":"d"}"#,
        ] {
            assert!(
                matches!(Envelope::unpack(bad), Err(ErrorKind::EnvelopeFormat(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn rejects_unknown_version() {
        let err = Envelope::unpack(r#"{"v":2,"key":"k","data":"d"}"#).unwrap_err();
        assert!(err.to_string().contains("unsupported envelope version 2"));
    }

    #[test]
    fn with_wrapped_key_keeps_data() {
        let original = Envelope::new("old", "bulk");
        let rewrapped = original.with_wrapped_key("new");
        assert_eq!(rewrapped.encrypted_data, "bulk");
        assert_eq!(rewrapped.wrapped_key, "new");
    }
}
