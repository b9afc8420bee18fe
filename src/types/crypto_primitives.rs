/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Cryptographic primitives.
//!
//! The content hashes of [`VisibleBlocks`](super::visible_blocks::VisibleBlocks) are SHA-256 digests
//! provided by the [`sha2`] crate, encoded with the standard [`base64`] alphabet.

use base64::{engine::general_purpose::STANDARD, Engine as _};

// re-exports below.
pub use sha2::Digest;
pub use sha2::Sha256 as CryptoHasher;

/// Compute the SHA-256 digest of `bytes`.
pub(crate) fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = CryptoHasher::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Encode `bytes` in the standard base64 alphabet, with padding and without line wrapping.
pub(crate) fn base64_standard(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
