//! Find My advertisement keys.
//!
//! The tracker stores one 68-byte key blob and advertises with it once
//! written: the 28-byte public key, the 32-byte private key, then the key
//! rotation epoch as a little-endian u64.

use crate::constants::*;
use crate::error::DecodeError;

/// Key material for Find My advertising.
#[derive(Clone, PartialEq, Eq)]
pub struct FindMyKeys {
    /// Advertised public key.
    pub public_key: [u8; FINDMY_PUBLIC_KEY_LEN],
    /// Private key used to derive rotating keys.
    pub private_key: [u8; FINDMY_PRIVATE_KEY_LEN],
    /// Key rotation epoch.
    pub epoch: u64,
}

impl FindMyKeys {
    /// Wire form of the key blob.
    pub fn to_bytes(&self) -> [u8; FINDMY_KEY_SIZE] {
        let mut out = [0u8; FINDMY_KEY_SIZE];
        out[..FINDMY_PUBLIC_KEY_LEN].copy_from_slice(&self.public_key);
        out[FINDMY_PUBLIC_KEY_LEN..FINDMY_PUBLIC_KEY_LEN + FINDMY_PRIVATE_KEY_LEN]
            .copy_from_slice(&self.private_key);
        out[FINDMY_PUBLIC_KEY_LEN + FINDMY_PRIVATE_KEY_LEN..]
            .copy_from_slice(&self.epoch.to_le_bytes());
        out
    }

    /// Parse a key blob; it must be exactly [`FINDMY_KEY_SIZE`] bytes.
    pub fn from_bytes(blob: &[u8]) -> Result<Self, DecodeError> {
        if blob.len() != FINDMY_KEY_SIZE {
            return Err(DecodeError::InvalidData(format!(
                "Find My key blob is {} bytes, expected {}",
                blob.len(),
                FINDMY_KEY_SIZE
            )));
        }

        let (public, rest) = blob.split_at(FINDMY_PUBLIC_KEY_LEN);
        let (private, epoch) = rest.split_at(FINDMY_PRIVATE_KEY_LEN);

        let mut keys = FindMyKeys {
            public_key: [0u8; FINDMY_PUBLIC_KEY_LEN],
            private_key: [0u8; FINDMY_PRIVATE_KEY_LEN],
            epoch: 0,
        };
        keys.public_key.copy_from_slice(public);
        keys.private_key.copy_from_slice(private);
        let mut raw = [0u8; 8];
        raw.copy_from_slice(epoch);
        keys.epoch = u64::from_le_bytes(raw);
        Ok(keys)
    }
}

// Keep the private key out of logs.
impl std::fmt::Debug for FindMyKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FindMyKeys")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("epoch", &self.epoch)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FindMyKeys {
        FindMyKeys {
            public_key: [0xA1; FINDMY_PUBLIC_KEY_LEN],
            private_key: [0x5C; FINDMY_PRIVATE_KEY_LEN],
            epoch: 1_700_000_000,
        }
    }

    #[test]
    fn test_blob_layout() {
        let blob = sample().to_bytes();
        assert_eq!(blob.len(), 68);
        assert_eq!(blob[0], 0xA1);
        assert_eq!(blob[27], 0xA1);
        assert_eq!(blob[28], 0x5C);
        assert_eq!(blob[59], 0x5C);
        assert_eq!(&blob[60..], &1_700_000_000u64.to_le_bytes());
        assert_eq!(FindMyKeys::from_bytes(&blob).unwrap(), sample());
    }

    #[test]
    fn test_wrong_blob_length() {
        assert!(matches!(
            FindMyKeys::from_bytes(&[0u8; 67]),
            Err(DecodeError::InvalidData(_))
        ));
    }

    #[test]
    fn test_debug_hides_private_key() {
        let shown = format!("{:?}", sample());
        assert!(shown.contains("<redacted>"));
        assert!(!shown.contains("92")); // 0x5C
    }
}
