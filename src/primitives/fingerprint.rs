//! Content fingerprints used to detect change between the buffer and disk.

use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 digest of some content.
///
/// The same function is applied to buffer text and to disk bytes, so two
/// fingerprints compare equal exactly when the content they were taken from
/// is (with overwhelming probability) identical.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short hex prefix for log lines.
    pub fn short(&self) -> String {
        self.to_string()[..12].to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

/// Compute the fingerprint of `bytes`.
pub fn fingerprint(bytes: impl AsRef<[u8]>) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes.as_ref());
    Fingerprint(hasher.finalize().into())
}
