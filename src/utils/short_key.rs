//! Content-derived short keys
//!
//! A key is the first 32 bits of the MD5 digest of the URL bytes, rendered as
//! 8 lowercase hex characters. Identical input always yields the identical key.
//!
//! The key space is small: by the birthday bound a store of a few tens of
//! thousands of links is likely to hold two URLs with the same key. The service
//! detects such collisions on write and reports `Conflict` instead of aliasing.

use md5::{Digest, Md5};

/// Length of every short key in characters.
pub const SHORT_KEY_LEN: usize = 8;

/// Derive the short key for `url` bytes.
pub fn derive_short_key(url: &[u8]) -> String {
    let digest = Md5::digest(url);
    hex::encode(&digest[..SHORT_KEY_LEN / 2])
}

/// Whether `key` has the shape of a derived short key.
pub fn is_valid_short_key(key: &str) -> bool {
    key.len() == SHORT_KEY_LEN
        && key
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(derive_short_key(b"https://example.com/a"), "cd69b81e");
        assert_eq!(derive_short_key(b"https://example.com/b"), "43cc12e8");
        assert_eq!(derive_short_key(b"https://practicum.yandex.ru/"), "0dd19817");
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(derive_short_key(b""), "d41d8cd9");
    }

    #[test]
    fn test_known_collision() {
        // md5 7f17b0c94bbe... and 7f17b0c95105...
        assert_eq!(derive_short_key(b"https://example.com/1548"), "7f17b0c9");
        assert_eq!(derive_short_key(b"https://example.com/2133"), "7f17b0c9");
    }

    #[test]
    fn test_deterministic() {
        let url = b"https://example.com/some/long/path?with=query&and=more";
        let first = derive_short_key(url);
        for _ in 0..10 {
            assert_eq!(derive_short_key(url), first);
        }
    }

    #[test]
    fn test_distinct_inputs_differ() {
        assert_ne!(
            derive_short_key(b"https://example.com/a"),
            derive_short_key(b"https://example.com/A")
        );
    }

    #[test]
    fn test_shape() {
        let key = derive_short_key(b"https://rust-lang.org");
        assert_eq!(key.len(), SHORT_KEY_LEN);
        assert!(is_valid_short_key(&key));
    }

    #[test]
    fn test_is_valid_short_key_rejects() {
        assert!(!is_valid_short_key(""));
        assert!(!is_valid_short_key("CD69B81E"));
        assert!(!is_valid_short_key("cd69b81"));
        assert!(!is_valid_short_key("cd69b81ez"));
        assert!(!is_valid_short_key("zz69b81e"));
    }
}
