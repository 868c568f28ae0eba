//! Content hashing used for deduplication.

use sha2::{Digest, Sha256};

/// MD5 and SHA-256 of an upload, both as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDigest {
    pub md5: String,
    pub sha256: String,
}

impl ContentDigest {
    /// Hash `data` with both algorithms.
    pub fn compute(data: &[u8]) -> Self {
        Self {
            md5: format!("{:x}", md5::compute(data)),
            sha256: hex::encode(Sha256::digest(data)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        let digest = ContentDigest::compute(b"abc");
        assert_eq!(digest.md5, "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(
            digest.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_empty_input() {
        let digest = ContentDigest::compute(b"");
        assert_eq!(digest.md5, "d41d8cd98f00b204e9800998ecf8427e");
    }
}
