//! Generation and hashing of the opaque secrets used across the system.
//!
//! Share ids and guest access tokens travel in URLs and are stored in clear;
//! customer auth tokens are stored only as a SHA-256 hex digest so a database
//! leak does not compromise outstanding invite/reset links. Guest PINs are
//! stored only as Argon2 hashes (see [`crate::password`]).

use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Length of the short external proof identifier used in share links.
const SHARE_ID_LENGTH: usize = 8;

/// Generate the short unique external id for a proof share link.
pub fn generate_share_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(SHARE_ID_LENGTH);
    id
}

/// Generate an unguessable URL-safe guest access token.
///
/// 122 bits of entropy rendered as 32 lowercase hex characters.
pub fn generate_guest_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Generate a uniformly random 6-digit guest PIN, zero-padded.
pub fn generate_guest_pin() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:06}")
}

/// Generate a high-entropy raw customer auth token (invite/reset).
///
/// The raw value goes into the emailed link exactly once; only
/// [`hash_auth_token`] of it is ever persisted.
pub fn generate_auth_token() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// Compute the SHA-256 hex digest of a raw auth token.
///
/// Use this to compare a presented token against the stored hash.
pub fn hash_auth_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_id_is_short_and_unique() {
        let a = generate_share_id();
        let b = generate_share_id();
        assert_eq!(a.len(), SHARE_ID_LENGTH);
        assert_ne!(a, b);
    }

    #[test]
    fn guest_pin_is_six_zero_padded_digits() {
        for _ in 0..32 {
            let pin = generate_guest_pin();
            assert_eq!(pin.len(), 6);
            assert!(pin.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn auth_token_hash_is_stable_sha256() {
        let raw = generate_auth_token();
        assert_eq!(raw.len(), 64);
        let h1 = hash_auth_token(&raw);
        let h2 = hash_auth_token(&raw);
        assert_eq!(h1, h2, "hash of the same token must be stable");
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, hash_auth_token("something-else"));
    }

    #[test]
    fn guest_token_is_url_safe() {
        let token = generate_guest_token();
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
