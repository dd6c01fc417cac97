use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Display length of a derived request id, in hex characters.
pub const REQUEST_ID_LEN: usize = 16;

/// Derives the identifier of a payment request from its correlation triple.
///
/// Pure and deterministic: equal triples always map to the same id, so a
/// replayed request collides with the original instead of creating a second
/// payment. One changed character in any input yields an unrelated id.
pub fn derive_request_id(sender: &str, recipient: &str, nonce: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sender.as_bytes());
    hasher.update(b"|");
    hasher.update(recipient.as_bytes());
    hasher.update(b"|");
    hasher.update(nonce.to_be_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..REQUEST_ID_LEN / 2])
}

static LAST_NONCE: AtomicU64 = AtomicU64::new(0);

/// Next nonce for a caller that did not supply one: the current nanosecond
/// timestamp, bumped past the previous value so two calls in the same instant
/// still differ.
pub fn next_nonce() -> u64 {
    let clock = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let mut last = LAST_NONCE.load(Ordering::Relaxed);
    loop {
        let next = clock.max(last + 1);
        match LAST_NONCE.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => last = observed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_triple_same_id() {
        let a = derive_request_id("0.0.1001", "0.0.2002", 7);
        let b = derive_request_id("0.0.1001", "0.0.2002", 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), REQUEST_ID_LEN);
    }

    #[test]
    fn test_any_changed_input_changes_id() {
        let base = derive_request_id("0.0.1001", "0.0.2002", 7);
        assert_ne!(base, derive_request_id("0.0.1002", "0.0.2002", 7));
        assert_ne!(base, derive_request_id("0.0.1001", "0.0.2003", 7));
        assert_ne!(base, derive_request_id("0.0.1001", "0.0.2002", 8));
    }

    #[test]
    fn test_id_is_lowercase_hex() {
        let id = derive_request_id("0.0.1001", "0.0.2002", 42);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, id.to_lowercase());
    }

    #[test]
    fn test_next_nonce_strictly_increases() {
        let mut prev = next_nonce();
        for _ in 0..1000 {
            let n = next_nonce();
            assert!(n > prev);
            prev = n;
        }
    }
}
