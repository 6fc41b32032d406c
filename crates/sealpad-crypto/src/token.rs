//! Concurrency tokens: cheap fingerprints for stale-write detection
//!
//! A token digests `(content, password, schema version)` through two
//! independent rolling hashes (FNV-1a and a ×31 polynomial accumulator)
//! whose magnitudes are summed and rendered in hex, with the schema version
//! appended as a literal suffix. Identical content stored under different
//! schema versions therefore never shares a token.
//!
//! Tokens are advisory metadata for conflict *detection*: the server
//! compares them for equality before accepting a write. They are not a
//! security boundary (any client could forge one) and must never stand in
//! for the envelope's authentication.

use crate::password::SitePassword;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Keeps the content and password byte runs from sliding into each other.
const SEPARATOR: &str = "\u{1f}";

/// Compute the concurrency token for a content/password/schema triple.
///
/// Pure and deterministic; cheap enough to run on every save. The returned
/// string is opaque to the server beyond equality comparison.
pub fn compute_token(content: &str, password: &SitePassword, schema_version: u32) -> String {
    let mut fnv: u64 = FNV_OFFSET;
    let mut poly: i64 = 0;

    for b in content
        .bytes()
        .chain(SEPARATOR.bytes())
        .chain(password.expose().bytes())
    {
        fnv ^= u64::from(b);
        fnv = fnv.wrapping_mul(FNV_PRIME);
        poly = poly.wrapping_mul(31).wrapping_add(i64::from(b));
    }

    let sum = u128::from(fnv) + u128::from(poly.unsigned_abs());
    format!("{sum:x}{schema_version}")
}
