use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Output from issuing an API key: the raw key is handed to the caller
/// once; only the digest is ever persisted or cached.
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    pub raw_key: String,
    pub digest: String,
}

/// Issue a new opaque API key: 32 random bytes, URL-safe base64.
pub fn issue_api_key() -> IssuedApiKey {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random_bytes);

    let raw_key = URL_SAFE_NO_PAD.encode(random_bytes);
    let digest = digest_api_key(&raw_key);

    IssuedApiKey { raw_key, digest }
}

/// One-way, deterministic, collision-resistant digest of a raw API key.
///
/// The digest is the only form under which a credential is cached or
/// compared, so logs and the cache store never see the plaintext.
pub fn digest_api_key(raw_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_key.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_api_key_shape() {
        let issued = issue_api_key();
        // 32 bytes base64-encoded without padding is 43 chars
        assert_eq!(issued.raw_key.len(), 43);
        // SHA-256 hex is 64 chars
        assert_eq!(issued.digest.len(), 64);
        assert_eq!(issued.digest, digest_api_key(&issued.raw_key));
    }

    #[test]
    fn test_digest_is_deterministic() {
        assert_eq!(digest_api_key("abc"), digest_api_key("abc"));
        assert_ne!(digest_api_key("abc"), digest_api_key("abd"));
    }

    #[test]
    fn test_digest_never_contains_plaintext() {
        let raw = "super-secret-api-key";
        assert!(!digest_api_key(raw).contains(raw));
    }
}
