//! Stable content digests for source documents and compiled schemas.
//!
//! We use a **simple, deterministic, non-cryptographic** digest:
//!
//! - algorithm: **FNV-1a 64-bit**
//! - input: raw bytes (document text as read, or canonical schema JSON)
//! - output: `"fnv1a64:<16 lowercase hex digits>"`
//!
//! Digests identify inputs and outputs across compiles (watch-mode change
//! detection, schema fingerprints). They are not a security primitive.

/// Prefix used in serialized digests.
pub const DIGEST_V1_PREFIX: &str = "fnv1a64:";

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001b3;

/// Compute a v1 digest (FNV-1a 64-bit) over arbitrary bytes.
pub fn fnv1a64_digest_bytes(bytes: &[u8]) -> String {
    let mut hash = FNV_OFFSET_BASIS;
    for b in bytes {
        hash ^= (*b) as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }

    format!("{DIGEST_V1_PREFIX}{hash:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_has_expected_prefix_and_width() {
        let d = fnv1a64_digest_bytes(b"ex:a a owl:DatatypeProperty .\n");
        assert!(d.starts_with(DIGEST_V1_PREFIX));
        assert_eq!(d.len(), DIGEST_V1_PREFIX.len() + 16);
    }

    #[test]
    fn empty_input_is_offset_basis() {
        assert_eq!(fnv1a64_digest_bytes(b""), "fnv1a64:cbf29ce484222325");
    }
}
