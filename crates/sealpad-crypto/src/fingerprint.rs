//! Site fingerprint: a one-way tag binding plaintext to its site

use sha2::{Digest, Sha512};

/// Hash a site identifier into its fingerprint (lowercase hex SHA-512).
///
/// The fingerprint is appended to plaintext before encryption and required
/// as an exact suffix after decryption, binding a ciphertext to the site it
/// was written for. It is never transmitted on its own.
pub fn site_fingerprint(site_id: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(site_id.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        assert_eq!(site_fingerprint("my-notes"), site_fingerprint("my-notes"));
    }

    #[test]
    fn test_distinct_sites_distinct_fingerprints() {
        assert_ne!(site_fingerprint("my-notes"), site_fingerprint("my-notes2"));
    }

    #[test]
    fn test_shape() {
        let fp = site_fingerprint("my-notes");
        assert_eq!(fp.len(), 128);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp, fp.to_lowercase());
    }
}
