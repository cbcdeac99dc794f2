//! Registry hive base block (header) parsing.
//!
//! The base block is the first 4096 bytes of a registry hive file. It
//! carries the signature, root-cell offset, and bookkeeping fields used to
//! detect (but not repair) an inconsistent hive.

use std::fmt;

use crate::error::{RegistryError, Result};
use crate::utils;

/// Size of the base block in bytes.
pub const BASE_BLOCK_SIZE: usize = 4096;

/// Expected signature for a valid registry hive ("regf").
pub const REGF_SIGNATURE: &[u8; 4] = b"regf";

/// Offset of the embedded file name field.
const FILE_NAME_OFFSET: usize = 0x30;

/// Length of the file name field (64 UTF-16LE characters = 128 bytes).
const FILE_NAME_LENGTH: usize = 128;

/// Offset of the checksum field.
const CHECKSUM_OFFSET: usize = 0x1FC;

/// Registry hive base block.
///
/// Only the signature and minimum size are enforced at parse time (§4.9);
/// a checksum mismatch or an out-of-range version number is logged via
/// `tracing::warn!` but does not prevent the hive from opening — carved or
/// partially-overwritten images routinely fail these checks while still
/// carrying a perfectly walkable key tree.
#[derive(Debug, Clone)]
pub struct BaseBlock {
    /// Primary sequence number.
    pub primary_sequence: u32,

    /// Secondary sequence number.
    pub secondary_sequence: u32,

    /// Last written timestamp (Windows FILETIME).
    pub last_written: u64,

    /// Major version of the hive format.
    pub major_version: u32,

    /// Minor version of the hive format.
    pub minor_version: u32,

    /// Offset to the root key cell, relative to the first hbin.
    pub root_cell_offset: u32,

    /// Length of hive-bin data in bytes, not counting the base block.
    pub hive_length: u32,

    /// Embedded file name, best-effort decoded.
    pub file_name: String,

    /// Checksum recorded in the header (XOR of the first 0x1FC bytes).
    pub checksum: u32,

    /// Checksum actually computed over the buffer, for comparison.
    pub computed_checksum: u32,
}

impl BaseBlock {
    /// Parses a base block from the first `BASE_BLOCK_SIZE` bytes of `data`.
    ///
    /// Fails only if the buffer is smaller than one base block or the
    /// signature isn't `"regf"` — both conditions mean this isn't a hive at
    /// all, as opposed to a hive with stale bookkeeping fields.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < BASE_BLOCK_SIZE {
            return Err(RegistryError::InvalidHive {
                size: data.len(),
                minimum: BASE_BLOCK_SIZE,
            });
        }

        if &data[0..4] != REGF_SIGNATURE {
            return Err(RegistryError::invalid_signature(&data[0..4]));
        }

        let primary_sequence = utils::read_u32(data, 0x04);
        let secondary_sequence = utils::read_u32(data, 0x08);
        let last_written = utils::read_u64(data, 0x0C);
        let major_version = utils::read_u32(data, 0x14);
        let minor_version = utils::read_u32(data, 0x18);
        let root_cell_offset = utils::read_u32(data, 0x24);
        let hive_length = utils::read_u32(data, 0x28);

        let file_name_bytes = utils::slice(data, FILE_NAME_OFFSET, FILE_NAME_LENGTH);
        let file_name = utils::decode_value_string(file_name_bytes);

        let checksum = utils::read_u32(data, CHECKSUM_OFFSET);
        let computed_checksum = calculate_checksum(data);

        if checksum != computed_checksum {
            tracing::warn!(
                recorded = checksum,
                computed = computed_checksum,
                "base block checksum mismatch, continuing anyway"
            );
        }

        if major_version != 1 || !(3..=6).contains(&minor_version) {
            tracing::warn!(
                major_version,
                minor_version,
                "hive format version outside the known 1.3-1.6 range, continuing anyway"
            );
        }

        Ok(BaseBlock {
            primary_sequence,
            secondary_sequence,
            last_written,
            major_version,
            minor_version,
            root_cell_offset,
            hive_length,
            file_name,
            checksum,
            computed_checksum,
        })
    }

    /// Returns true if the primary and secondary sequence numbers match,
    /// i.e. the hive was closed cleanly rather than left with a pending
    /// transaction-log replay.
    pub fn is_consistent(&self) -> bool {
        self.primary_sequence == self.secondary_sequence
    }

    /// Returns true if the recorded checksum matches the computed one.
    pub fn checksum_valid(&self) -> bool {
        self.checksum == self.computed_checksum
    }

    /// Converts the last-written FILETIME into a UTC instant.
    pub fn last_written_datetime(&self) -> chrono::DateTime<chrono::Utc> {
        utils::filetime_to_instant(self.last_written)
    }
}

impl fmt::Display for BaseBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Registry Hive Header:\n\
             - Version: {}.{}\n\
             - Root Cell Offset: {:#x}\n\
             - Hive Length: {} bytes\n\
             - Consistent: {}\n\
             - File Name: {}",
            self.major_version,
            self.minor_version,
            self.root_cell_offset,
            self.hive_length,
            self.is_consistent(),
            self.file_name
        )
    }
}

/// XOR checksum of the first 0x1FC bytes of the base block, as the `CHECKSUM_OFFSET`
/// field records it.
fn calculate_checksum(data: &[u8]) -> u32 {
    let mut checksum: u32 = 0;
    for chunk in data[..CHECKSUM_OFFSET].chunks_exact(4) {
        checksum ^= u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    checksum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_base_block() -> Vec<u8> {
        let mut data = vec![0u8; BASE_BLOCK_SIZE];
        data[0..4].copy_from_slice(REGF_SIGNATURE);
        data[0x14..0x18].copy_from_slice(&1u32.to_le_bytes());
        data[0x18..0x1C].copy_from_slice(&5u32.to_le_bytes());
        let checksum = calculate_checksum(&data);
        data[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4].copy_from_slice(&checksum.to_le_bytes());
        data
    }

    #[test]
    fn parses_well_formed_header() {
        let data = minimal_base_block();
        let block = BaseBlock::parse(&data).unwrap();
        assert_eq!(block.major_version, 1);
        assert_eq!(block.minor_version, 5);
        assert!(block.checksum_valid());
    }

    #[test]
    fn rejects_bad_signature() {
        let mut data = minimal_base_block();
        data[0..4].copy_from_slice(b"XXXX");
        assert!(matches!(
            BaseBlock::parse(&data),
            Err(RegistryError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn rejects_too_small_buffer() {
        let data = vec![0u8; 100];
        assert!(matches!(
            BaseBlock::parse(&data),
            Err(RegistryError::InvalidHive { .. })
        ));
    }

    #[test]
    fn tolerates_checksum_mismatch() {
        let mut data = minimal_base_block();
        data[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        let block = BaseBlock::parse(&data).unwrap();
        assert!(!block.checksum_valid());
    }

    #[test]
    fn tolerates_unsupported_version() {
        let mut data = minimal_base_block();
        data[0x18..0x1C].copy_from_slice(&9u32.to_le_bytes());
        let checksum = calculate_checksum(&data);
        data[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4].copy_from_slice(&checksum.to_le_bytes());
        let block = BaseBlock::parse(&data).unwrap();
        assert_eq!(block.minor_version, 9);
    }
}
