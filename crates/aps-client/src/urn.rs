//! Viewer-facing model references.
//!
//! A [`ModelUrn`] is the unpadded URL-safe base64 form of an OSS object id,
//! which is what the model derivative API and the viewer expect as a model
//! handle. The mapping is deterministic and reversible.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidReference {
    #[error("model reference is empty")]
    Empty,
    #[error("model reference is not url-safe base64: {0}")]
    Encoding(String),
    #[error("model reference does not decode to utf-8 text")]
    NotUtf8,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelUrn(String);

impl ModelUrn {
    /// Encodes a storage identifier such as
    /// `urn:adsk.objects:os.object:bucket/file.rvt`.
    pub fn encode(object_id: &str) -> Self {
        Self(URL_SAFE_NO_PAD.encode(object_id.as_bytes()))
    }

    /// Validates a client-supplied reference without decoding it for the caller.
    pub fn parse(token: &str) -> Result<Self, InvalidReference> {
        let urn = Self(token.to_string());
        urn.decode()?;
        Ok(urn)
    }

    /// Recovers the storage identifier this reference was built from.
    pub fn decode(&self) -> Result<String, InvalidReference> {
        if self.0.is_empty() {
            return Err(InvalidReference::Empty);
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(self.0.as_bytes())
            .map_err(|err| InvalidReference::Encoding(err.to_string()))?;
        String::from_utf8(bytes).map_err(|_| InvalidReference::NotUtf8)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelUrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_inverts_encode() {
        for id in [
            "urn:adsk.objects:os.object:my-bucket/house.rvt",
            "urn:adsk.objects:os.object:b/with space & ünïcode.ifc",
            "x",
            "ab",
            "abc",
        ] {
            let urn = ModelUrn::encode(id);
            assert_eq!(urn.decode().unwrap(), id);
        }
    }

    #[test]
    fn encoding_is_stable_and_path_safe() {
        let id = "urn:adsk.objects:os.object:bucket/model?.rvt";
        let first = ModelUrn::encode(id);
        let second = ModelUrn::encode(id);
        assert_eq!(first, second);
        assert!(first
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn known_object_id_matches_viewer_urn() {
        let urn = ModelUrn::encode("urn:adsk.objects:os.object:demo/a.rvt");
        assert_eq!(
            urn.as_str(),
            "dXJuOmFkc2sub2JqZWN0czpvcy5vYmplY3Q6ZGVtby9hLnJ2dA"
        );
    }

    #[test]
    fn parse_rejects_malformed_tokens() {
        assert_eq!(ModelUrn::parse(""), Err(InvalidReference::Empty));
        assert!(matches!(
            ModelUrn::parse("not base64!"),
            Err(InvalidReference::Encoding(_))
        ));
        // 0xff 0xfe is valid base64 but not utf-8
        assert_eq!(ModelUrn::parse("__4"), Err(InvalidReference::NotUtf8));
    }

    #[test]
    fn parse_accepts_encoded_references() {
        let urn = ModelUrn::encode("urn:adsk.objects:os.object:demo/b.rvt");
        assert_eq!(ModelUrn::parse(urn.as_str()).unwrap(), urn);
    }
}
