//! sealpad-crypto: password-based protection for site content
//!
//! Pipeline: password + random salt → PBKDF2-HMAC-SHA256 → AES-256-GCM over
//! the UTF-8 plaintext. One envelope per saved snapshot:
//! ```text
//! saltHex:ivHex:cipherHex      (16-byte salt, 12-byte IV, lowercase hex)
//! ```
//!
//! Alongside the cipher live two non-secret helpers: the site fingerprint
//! (SHA-512 of the site id, appended to plaintext as an integrity tag) and
//! the concurrency token (a cheap content/password/version digest used as an
//! optimistic-lock precondition, not a security boundary).

pub mod envelope;
pub mod fingerprint;
pub mod kdf;
pub mod password;
pub mod token;

pub use envelope::{decrypt, encrypt, DecryptError, Envelope};
pub use fingerprint::site_fingerprint;
pub use kdf::{derive_content_key, ContentKey, DEFAULT_KDF_ITERATIONS};
pub use password::SitePassword;
pub use token::compute_token;

/// Size of a derived content key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of the per-save PBKDF2 salt
pub const SALT_SIZE: usize = 16;

/// Size of an AES-GCM initialization vector (96-bit)
pub const IV_SIZE: usize = 12;
