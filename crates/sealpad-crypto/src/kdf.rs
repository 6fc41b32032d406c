//! Key derivation: PBKDF2-HMAC-SHA256 password → content key

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::password::SitePassword;
use crate::{KEY_SIZE, SALT_SIZE};

/// Iteration count used for production envelopes.
pub const DEFAULT_KDF_ITERATIONS: u32 = 150_000;

/// A 256-bit content key derived from a site password.
///
/// Zeroized on drop. The key never leaves this crate: it is only consumed
/// by the envelope cipher, so it cannot be reused for other algorithms.
#[derive(Clone)]
pub struct ContentKey {
    bytes: [u8; KEY_SIZE],
}

impl ContentKey {
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for ContentKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive a content key from a password and salt.
///
/// Deterministic: the same `(password, salt, iterations)` always yields the
/// same key, which is what makes decryption possible. The salt is stored in
/// the clear inside the envelope; it does not need to be secret.
pub fn derive_content_key(
    password: &SitePassword,
    salt: &[u8; SALT_SIZE],
    iterations: u32,
) -> anyhow::Result<ContentKey> {
    if iterations == 0 {
        anyhow::bail!("PBKDF2 iteration count must be nonzero");
    }

    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password.expose().as_bytes(), salt, iterations, &mut key);
    Ok(ContentKey { bytes: key })
}
