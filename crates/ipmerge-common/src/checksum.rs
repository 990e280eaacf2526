//! Checksum utilities for sequences and files
//!
//! Sequence content hashes are MD5 digests of the residue bytes exactly as given
//! (no case folding), rendered as uppercase hexadecimal. This is the key format
//! used by the precalculated-match lookup service.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::io::Read;

/// Compute the content hash of a residue string
pub fn sequence_digest(residues: &str) -> String {
    format!("{:X}", md5::compute(residues.as_bytes()))
}

/// Compute a SHA-256 checksum for any readable source
///
/// Used to record which chunk documents contributed to an aggregation run.
pub fn compute_checksum<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    #[test]
    fn test_sequence_digest_is_uppercase_md5() {
        // md5("hello world") = 5eb63bbbe01eeed093cb22bb8f5acdc3
        assert_eq!(sequence_digest("hello world"), "5EB63BBBE01EEED093CB22BB8F5ACDC3");
    }

    #[test]
    fn test_sequence_digest_is_case_sensitive() {
        assert_ne!(sequence_digest("MKV"), sequence_digest("mkv"));
    }

    #[test]
    fn test_compute_checksum_sha256() {
        let mut cursor = Cursor::new(b"hello world");
        let checksum = compute_checksum(&mut cursor).unwrap();
        assert_eq!(checksum, "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9");
    }

    proptest! {
        #[test]
        fn prop_sequence_digest_shape(residues in "[A-Za-z]{0,64}") {
            let digest = sequence_digest(&residues);
            prop_assert_eq!(digest.len(), 32);
            prop_assert!(digest.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
            prop_assert_eq!(digest, sequence_digest(&residues));
        }
    }
}
