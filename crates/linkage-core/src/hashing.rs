//! Content hashing for exact-duplicate detection.

/// Trait for hash functions.
pub trait HashFunction: Send + Sync {
    /// Hash data and return raw bytes.
    fn hash(&self, data: &[u8]) -> Vec<u8>;

    /// Hash data and return hex string.
    fn hash_hex(&self, data: &[u8]) -> String {
        hex::encode(self.hash(data))
    }

    /// Hash `parts`, each prefixed with its byte length, so no choice of
    /// field contents can shift a boundary between fields.
    ///
    /// Missing parts contribute an empty segment, so `[Some("a"), None]`
    /// and `[Some("a"), Some("")]` collide.
    fn hash_fields(&self, parts: &[Option<&str>]) -> Vec<u8> {
        let mut buf = Vec::new();
        for part in parts {
            let bytes = part.unwrap_or("").as_bytes();
            buf.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
            buf.extend_from_slice(bytes);
        }
        self.hash(&buf)
    }
}

/// XXHash3 hasher - extremely fast, 128-bit output.
#[derive(Debug, Clone, Copy, Default)]
pub struct XxHash3;

impl XxHash3 {
    /// Create a new XXHash3 hasher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HashFunction for XxHash3 {
    fn hash(&self, data: &[u8]) -> Vec<u8> {
        xxhash_rust::xxh3::xxh3_128(data).to_le_bytes().to_vec()
    }
}

/// Blake3 hasher - cryptographically secure, still fast.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl Blake3Hasher {
    /// Create a new Blake3 hasher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HashFunction for Blake3Hasher {
    fn hash(&self, data: &[u8]) -> Vec<u8> {
        blake3::hash(data).as_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xxhash3_deterministic() {
        let hasher = XxHash3::new();
        assert_eq!(hasher.hash(b"sandisk 64gb"), hasher.hash(b"sandisk 64gb"));
        assert_eq!(hasher.hash(b"x").len(), 16);
    }

    #[test]
    fn test_blake3_deterministic() {
        let hasher = Blake3Hasher::new();
        assert_eq!(hasher.hash(b"sandisk 64gb"), hasher.hash(b"sandisk 64gb"));
        assert_eq!(hasher.hash_hex(b"x").len(), 64);
    }

    #[test]
    fn test_hash_fields_separator() {
        let hasher = Blake3Hasher::new();
        let ab_c = hasher.hash_fields(&[Some("ab"), Some("c")]);
        let a_bc = hasher.hash_fields(&[Some("a"), Some("bc")]);
        assert_ne!(ab_c, a_bc);
    }

    #[test]
    fn test_hash_fields_separator_in_values() {
        let hasher = XxHash3::new();
        let left = hasher.hash_fields(&[Some("a|b"), Some("c")]);
        let right = hasher.hash_fields(&[Some("a"), Some("b|c")]);
        assert_ne!(left, right);
        assert_ne!(
            hasher.hash_fields(&[Some("ab"), Some("")]),
            hasher.hash_fields(&[Some("a"), Some("b")])
        );
        assert_ne!(
            hasher.hash_fields(&[Some("x")]),
            hasher.hash_fields(&[Some("x"), None])
        );
    }

    #[test]
    fn test_hash_fields_missing_is_empty() {
        let hasher = XxHash3::new();
        assert_eq!(
            hasher.hash_fields(&[Some("lexar"), None]),
            hasher.hash_fields(&[Some("lexar"), Some("")])
        );
    }
}
