//! Archive checksum computation and verification.
//!
//! Package definitions record a hex digest per version. The algorithm is not
//! stored alongside it; it is inferred from the digest length, so a 32-digit
//! digest is MD5, a 64-digit digest is SHA-256, and so on.

use std::fmt;
use std::io::Read;
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::errors::{SprigError, SprigResult};

/// Hash algorithms accepted for archive digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl ChecksumAlgorithm {
    /// Infer the algorithm from the length of a hex digest.
    pub fn from_digest(digest: &str) -> Option<Self> {
        if !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match digest.len() {
            32 => Some(Self::Md5),
            40 => Some(Self::Sha1),
            56 => Some(Self::Sha224),
            64 => Some(Self::Sha256),
            96 => Some(Self::Sha384),
            128 => Some(Self::Sha512),
            _ => None,
        }
    }

    /// Compute the lowercase hex digest of everything `reader` yields.
    pub fn hash_reader<R: Read>(self, reader: R) -> std::io::Result<String> {
        match self {
            Self::Md5 => hex_digest::<Md5, _>(reader),
            Self::Sha1 => hex_digest::<Sha1, _>(reader),
            Self::Sha224 => hex_digest::<Sha224, _>(reader),
            Self::Sha256 => hex_digest::<Sha256, _>(reader),
            Self::Sha384 => hex_digest::<Sha384, _>(reader),
            Self::Sha512 => hex_digest::<Sha512, _>(reader),
        }
    }

    /// Compute the lowercase hex digest of a file.
    pub fn hash_file(self, path: &Path) -> std::io::Result<String> {
        let file = std::fs::File::open(path)?;
        self.hash_reader(file)
    }

    /// Compute the lowercase hex digest of a byte slice.
    pub fn hash_bytes(self, data: &[u8]) -> String {
        // Reading from a slice cannot fail.
        self.hash_reader(data).unwrap_or_default()
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        };
        f.write_str(s)
    }
}

fn hex_digest<D: Digest, R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect())
}

/// Check the file at `path` against a hex `digest`.
///
/// Returns `Ok(false)` on a mismatch. Fails if the file cannot be read or the
/// digest length does not correspond to a supported algorithm.
pub fn verify_checksum(path: &Path, digest: &str) -> SprigResult<bool> {
    let digest = digest.trim();
    let algo = ChecksumAlgorithm::from_digest(digest).ok_or_else(|| SprigError::Checksum {
        message: format!("Unrecognised digest '{digest}' (no algorithm produces this length)"),
    })?;

    let actual = algo.hash_file(path)?;
    if actual.eq_ignore_ascii_case(digest) {
        tracing::debug!("{algo} ok for {}", path.display());
        Ok(true)
    } else {
        tracing::warn!(
            "{algo} mismatch for {}: expected {digest}, got {actual}",
            path.display()
        );
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_from_digest_length() {
        assert_eq!(
            ChecksumAlgorithm::from_digest("c7494210b0ba26b577171b92838e1a9b"),
            Some(ChecksumAlgorithm::Md5)
        );
        assert_eq!(
            ChecksumAlgorithm::from_digest(&"a".repeat(64)),
            Some(ChecksumAlgorithm::Sha256)
        );
        assert_eq!(ChecksumAlgorithm::from_digest("abc"), None);
    }

    #[test]
    fn non_hex_digest_rejected() {
        assert_eq!(ChecksumAlgorithm::from_digest(&"z".repeat(32)), None);
    }

    #[test]
    fn sha256_computation() {
        let hash = ChecksumAlgorithm::Sha256.hash_bytes(b"hello world");
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn md5_computation() {
        let hash = ChecksumAlgorithm::Md5.hash_bytes(b"hello world");
        assert_eq!(hash, "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn sha1_computation() {
        let hash = ChecksumAlgorithm::Sha1.hash_bytes(b"hello world");
        assert_eq!(hash, "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
    }
}
