//! Password-based envelope cipher: AES-256-GCM over PBKDF2-derived keys
//!
//! Envelope wire format:
//! ```text
//! saltHex:ivHex:cipherHex
//! ```
//! exactly three colon-joined lowercase-hex fields. A fresh 16-byte salt and
//! 12-byte IV are drawn per call, so no two envelopes share key material.
//! The ciphertext carries the GCM tag, so tampering with any field makes
//! decryption fail before a plaintext is ever produced.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use thiserror::Error;

use crate::kdf::{derive_content_key, DEFAULT_KDF_ITERATIONS};
use crate::password::SitePassword;
use crate::{IV_SIZE, SALT_SIZE};

/// GCM authentication tag length; a ciphertext field can never be shorter.
const TAG_SIZE: usize = 16;

/// One encrypted snapshot of site content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub salt: [u8; SALT_SIZE],
    pub iv: [u8; IV_SIZE],
    pub ciphertext: Vec<u8>,
}

/// Why a decryption attempt produced no plaintext.
///
/// Wrong password, tampered data, and garbage that happens to decode are all
/// collapsed into `Authentication`; callers must not be able to tell them
/// apart. `Malformed` covers shape errors and is logged separately, but it
/// is presented to users exactly like `Authentication`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptError {
    #[error("wrong password or corrupted data")]
    Authentication,

    #[error("malformed envelope: {0}")]
    Malformed(String),
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            hex::encode(self.salt),
            hex::encode(self.iv),
            hex::encode(&self.ciphertext)
        )
    }
}

impl std::str::FromStr for Envelope {
    type Err = DecryptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(':').collect();
        let [salt_hex, iv_hex, cipher_hex] = fields.as_slice() else {
            return Err(DecryptError::Malformed(format!(
                "expected 3 colon-separated fields, got {}",
                fields.len()
            )));
        };

        let salt_bytes =
            hex::decode(salt_hex).map_err(|e| DecryptError::Malformed(format!("salt: {e}")))?;
        let iv_bytes =
            hex::decode(iv_hex).map_err(|e| DecryptError::Malformed(format!("iv: {e}")))?;
        let ciphertext =
            hex::decode(cipher_hex).map_err(|e| DecryptError::Malformed(format!("ciphertext: {e}")))?;

        let salt: [u8; SALT_SIZE] = salt_bytes
            .try_into()
            .map_err(|_| DecryptError::Malformed(format!("salt must be {SALT_SIZE} bytes")))?;
        let iv: [u8; IV_SIZE] = iv_bytes
            .try_into()
            .map_err(|_| DecryptError::Malformed(format!("iv must be {IV_SIZE} bytes")))?;
        if ciphertext.len() < TAG_SIZE {
            return Err(DecryptError::Malformed(format!(
                "ciphertext shorter than the {TAG_SIZE}-byte tag"
            )));
        }

        Ok(Envelope {
            salt,
            iv,
            ciphertext,
        })
    }
}

/// Encrypt plaintext under a password with the production iteration count.
pub fn encrypt(plaintext: &str, password: &SitePassword) -> anyhow::Result<Envelope> {
    encrypt_with(plaintext, password, DEFAULT_KDF_ITERATIONS)
}

/// Encrypt plaintext under a password, deriving the key with `iterations`.
pub fn encrypt_with(
    plaintext: &str,
    password: &SitePassword,
    iterations: u32,
) -> anyhow::Result<Envelope> {
    let mut salt = [0u8; SALT_SIZE];
    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut iv);

    let key = derive_content_key(password, &salt, iterations)?;
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|e| anyhow::anyhow!("envelope encryption failed: {e}"))?;

    Ok(Envelope {
        salt,
        iv,
        ciphertext,
    })
}

/// Decrypt an envelope with the production iteration count.
pub fn decrypt(envelope: &Envelope, password: &SitePassword) -> Result<String, DecryptError> {
    decrypt_with(envelope, password, DEFAULT_KDF_ITERATIONS)
}

/// Decrypt an envelope, deriving the key with `iterations`.
///
/// A pure function of `(envelope, password)`: the only observable outcomes
/// are the plaintext or a failure value. Never panics on hostile input.
pub fn decrypt_with(
    envelope: &Envelope,
    password: &SitePassword,
    iterations: u32,
) -> Result<String, DecryptError> {
    let key = derive_content_key(password, &envelope.salt, iterations)
        .map_err(|e| DecryptError::Malformed(e.to_string()))?;
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&envelope.iv), envelope.ciphertext.as_ref())
        .map_err(|_| DecryptError::Authentication)?;

    // GCM authenticated the bytes, so non-UTF-8 output means the envelope
    // was produced from something other than our UTF-8 plaintext encoding.
    String::from_utf8(plaintext).map_err(|_| DecryptError::Authentication)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITERS: u32 = 1_000;

    fn pw(s: &str) -> SitePassword {
        SitePassword::new(s)
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let envelope = encrypt_with("hello, encrypted world!", &pw("hunter2"), ITERS).unwrap();
        let plaintext = decrypt_with(&envelope, &pw("hunter2"), ITERS).unwrap();
        assert_eq!(plaintext, "hello, encrypted world!");
    }

    #[test]
    fn test_default_iteration_roundtrip() {
        let envelope = encrypt("production profile", &pw("hunter2")).unwrap();
        assert_eq!(
            decrypt(&envelope, &pw("hunter2")).unwrap(),
            "production profile"
        );
    }

    #[test]
    fn test_roundtrip_empty_and_unicode() {
        for text in ["", "δ — ünïcode ✓", "line1\nline2\ttabbed"] {
            let envelope = encrypt_with(text, &pw("pw"), ITERS).unwrap();
            assert_eq!(decrypt_with(&envelope, &pw("pw"), ITERS).unwrap(), text);
        }
    }

    #[test]
    fn test_wrong_password_fails() {
        let envelope = encrypt_with("secret data", &pw("correct"), ITERS).unwrap();
        assert_eq!(
            decrypt_with(&envelope, &pw("incorrect"), ITERS),
            Err(DecryptError::Authentication)
        );
    }

    #[test]
    fn test_fresh_salt_and_iv_per_call() {
        let a = encrypt_with("same text", &pw("pw"), ITERS).unwrap();
        let b = encrypt_with("same text", &pw("pw"), ITERS).unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut envelope = encrypt_with("secret data", &pw("pw"), ITERS).unwrap();
        for i in 0..envelope.ciphertext.len() {
            let mut tampered = envelope.clone();
            tampered.ciphertext[i] ^= 0x01;
            assert_eq!(
                decrypt_with(&tampered, &pw("pw"), ITERS),
                Err(DecryptError::Authentication),
                "bit flip at ciphertext byte {i} must fail"
            );
        }
        // and the original still decrypts
        envelope.ciphertext[0] ^= 0x00;
        assert!(decrypt_with(&envelope, &pw("pw"), ITERS).is_ok());
    }

    #[test]
    fn test_tampered_iv_fails() {
        let mut envelope = encrypt_with("secret data", &pw("pw"), ITERS).unwrap();
        envelope.iv[3] ^= 0x80;
        assert_eq!(
            decrypt_with(&envelope, &pw("pw"), ITERS),
            Err(DecryptError::Authentication)
        );
    }

    #[test]
    fn test_never_encrypted_envelope_fails() {
        let envelope = Envelope {
            salt: [7u8; SALT_SIZE],
            iv: [9u8; IV_SIZE],
            ciphertext: vec![0u8; 48],
        };
        assert_eq!(
            decrypt_with(&envelope, &pw("any"), ITERS),
            Err(DecryptError::Authentication)
        );
    }

    #[test]
    fn test_wire_format_roundtrip() {
        let envelope = encrypt_with("over the wire", &pw("pw"), ITERS).unwrap();
        let wire = envelope.to_string();

        let fields: Vec<&str> = wire.split(':').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].len(), SALT_SIZE * 2);
        assert_eq!(fields[1].len(), IV_SIZE * 2);
        assert!(wire.chars().all(|c| c.is_ascii_hexdigit() || c == ':'));

        let parsed: Envelope = wire.parse().unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn test_malformed_wire_shapes_rejected() {
        let cases = [
            "",
            "aabb",
            "aa:bb",
            "aa:bb:cc:dd",
            "zz:bbbbbbbbbbbbbbbbbbbbbbbb:cccccccccccccccccccccccccccccccc",
        ];
        for raw in cases {
            match raw.parse::<Envelope>() {
                Err(DecryptError::Malformed(_)) => {}
                other => panic!("{raw:?} should be malformed, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_wrong_field_lengths_rejected() {
        // valid hex, wrong salt length
        let raw = format!("{}:{}:{}", "aa", "bb".repeat(IV_SIZE), "cc".repeat(TAG_SIZE));
        assert!(matches!(
            raw.parse::<Envelope>(),
            Err(DecryptError::Malformed(_))
        ));

        // ciphertext shorter than the tag
        let raw = format!(
            "{}:{}:{}",
            "aa".repeat(SALT_SIZE),
            "bb".repeat(IV_SIZE),
            "cc"
        );
        assert!(matches!(
            raw.parse::<Envelope>(),
            Err(DecryptError::Malformed(_))
        ));
    }
}
