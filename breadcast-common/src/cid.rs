//! Content identifier helpers
//!
//! Only the textual shape of a CID is checked here; whether the content exists
//! is the object store's business.

use sha2::{Digest, Sha256};

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const BASE32_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Length of a base58btc CIDv0 (`Qm…`)
const CID_V0_LEN: usize = 46;

/// Shortest multibase CIDv1 we accept (sha2-256 in base58btc is 49 chars)
const CID_V1_MIN_LEN: usize = 49;

/// Check whether `value` looks like an IPFS content identifier.
///
/// Accepts base58btc CIDv0 (`Qm…`, 46 chars) and multibase CIDv1 in base32
/// (`b…`) or base58btc (`z…`).
///
/// # Examples
///
/// ```
/// use breadcast_common::cid::is_valid_cid;
///
/// assert!(is_valid_cid("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"));
/// assert!(!is_valid_cid("not-a-cid"));
/// assert!(!is_valid_cid(""));
/// ```
pub fn is_valid_cid(value: &str) -> bool {
    let bytes = value.as_bytes();
    if value.starts_with("Qm") {
        return bytes.len() == CID_V0_LEN && bytes.iter().all(|b| BASE58_ALPHABET.contains(b));
    }
    if bytes.len() < CID_V1_MIN_LEN {
        return false;
    }
    match bytes[0] {
        b'b' => bytes[1..].iter().all(|b| BASE32_ALPHABET.contains(b)),
        b'z' => bytes[1..].iter().all(|b| BASE58_ALPHABET.contains(b)),
        _ => false,
    }
}

/// Compute a CIDv0-shaped identifier (sha2-256 multihash, base58btc) for raw bytes.
///
/// Used by the in-memory store. The digest covers the raw bytes rather than a
/// UnixFS node, so it will not match what an IPFS node reports for the same file.
pub fn v0_for_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut multihash = Vec::with_capacity(2 + digest.len());
    multihash.push(0x12);
    multihash.push(0x20);
    multihash.extend_from_slice(&digest);
    bs58::encode(multihash).into_string()
}
