//! StreamingHasher (component E)
//!
//! A 64-bit non-cryptographic hash with good distribution, used two ways:
//! a one-shot digest of `origin+path` for the Bloom key, and an incremental
//! digest over response body chunks as they arrive.

use xxhash_rust::xxh3::Xxh3;

/// Incremental xxh3-64 hasher. `reset` clears accumulated state; `update`
/// may be called any number of times in arrival order; `digest` is
/// idempotent and may be called without consuming the hasher.
#[derive(Default)]
pub struct StreamingHasher {
    inner: Xxh3,
}

impl StreamingHasher {
    pub fn new() -> Self {
        Self { inner: Xxh3::new() }
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    pub fn digest(&self) -> u64 {
        self.inner.digest()
    }
}

/// One-shot digest of `origin+path`, seeded at 0. Used as the Bloom key —
/// the identity hash never includes the query string or fragment
/// (SPEC_FULL.md §9.1).
pub fn identity_hash(origin_and_path: &str) -> u64 {
    xxhash_rust::xxh3::xxh3_64(origin_and_path.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunked_equals_whole() {
        let chunks: &[&[u8]] = &[b"hello, ", b"traffic ", b"inspector"];
        let mut chunked = StreamingHasher::new();
        for c in chunks {
            chunked.update(c);
        }

        let mut whole = StreamingHasher::new();
        let concatenated: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        whole.update(&concatenated);

        assert_eq!(chunked.digest(), whole.digest());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut hasher = StreamingHasher::new();
        hasher.update(b"first body");
        let first = hasher.digest();
        hasher.reset();
        hasher.update(b"second body");
        let second = hasher.digest();
        assert_ne!(first, second);
    }

    #[test]
    fn test_identity_hash_ignores_query_by_construction() {
        // The identity hash is computed over origin+path only; callers are
        // responsible for stripping the query string before calling this.
        let with_query_stripped = identity_hash("http://app/api/test");
        let same_again = identity_hash("http://app/api/test");
        assert_eq!(with_query_stripped, same_again);
    }

    #[test]
    fn test_empty_update_is_noop() {
        let mut a = StreamingHasher::new();
        a.update(b"");
        let mut b = StreamingHasher::new();
        assert_eq!(a.digest(), b.digest());
    }
}
