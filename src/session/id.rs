use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::{DecodeError, DecodeSliceError, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An opaque, random 128-bit session identifier.
///
/// Rendered as 22 characters of URL-safe base64 without padding, which is the
/// form used in cookies and in cart keys.
#[derive(Copy, Clone, Debug, Deserialize, Serialize, Eq, Hash, PartialEq)]
pub struct SessionId([u8; 16]);

impl SessionId {
    /// Generates a new id from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl FromStr for SessionId {
    type Err = DecodeSliceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut decoded = [0; 16];
        let bytes_decoded = URL_SAFE_NO_PAD.decode_slice(s.as_bytes(), &mut decoded)?;
        if bytes_decoded != 16 {
            let err = DecodeError::InvalidLength(bytes_decoded);
            return Err(DecodeSliceError::DecodeError(err));
        }

        Ok(Self(decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trips() {
        let id = SessionId::generate();
        let encoded = id.to_string();

        assert_eq!(encoded.len(), 22);
        assert_eq!(encoded.parse::<SessionId>().unwrap(), id);
    }

    #[test]
    fn test_rejects_malformed_ids() {
        assert!("not a session id".parse::<SessionId>().is_err());
        assert!("c2hvcnQ".parse::<SessionId>().is_err());
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }
}
