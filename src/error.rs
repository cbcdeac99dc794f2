//! Error types for registry parsing operations.
//!
//! Only genuinely fatal failures reach this type. Structural anomalies
//! encountered while scanning cells or decoding NK/VK payloads are absorbed
//! silently (the offending element is dropped, the rest of the hive stays
//! usable) and are reported only through `tracing::warn!`, never here.

use std::io;
use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur while opening a hive or navigating it.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// I/O error occurred while reading the hive file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The first four bytes of the image are not `"regf"`.
    #[error("invalid signature: expected \"regf\", found {found:?}")]
    InvalidSignature {
        /// Bytes actually found at offset 0.
        found: [u8; 4],
    },

    /// The image is smaller than the minimum 4096-byte base block.
    #[error("hive too small: {size} bytes (minimum: {minimum} bytes)")]
    InvalidHive {
        /// Size of the supplied buffer.
        size: usize,
        /// Minimum required size.
        minimum: usize,
    },

    /// A key or value could not be located by path or name.
    #[error("not found: {0}")]
    NotFound(String),

    /// The hive opened successfully but has no resolvable root key.
    #[error("no root key")]
    NoRootKey,

    /// No allocated cell exists at the requested absolute offset.
    #[error("no cell at offset {0:#x}")]
    CellNotFound(u64),
}

impl RegistryError {
    /// Builds an [`RegistryError::InvalidSignature`] from the bytes actually found.
    pub fn invalid_signature(found: &[u8]) -> Self {
        let mut buf = [0u8; 4];
        let n = found.len().min(4);
        buf[..n].copy_from_slice(&found[..n]);
        Self::InvalidSignature { found: buf }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_mention_offsets() {
        let err = RegistryError::CellNotFound(0x2000);
        assert!(err.to_string().contains("2000"));
    }

    #[test]
    fn invalid_signature_captures_found_bytes() {
        let err = RegistryError::invalid_signature(b"XXXX");
        match err {
            RegistryError::InvalidSignature { found } => assert_eq!(&found, b"XXXX"),
            _ => panic!("wrong variant"),
        }
    }
}
