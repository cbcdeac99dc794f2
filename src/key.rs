//! Registry key node (nk) parsing and representation.

use crate::cell::KeyNodeFlags;
use crate::utils;

/// Minimum size of a key node structure in bytes, up to and including the
/// fixed fields that precede the variable-length name.
const KEY_NODE_MIN_SIZE: usize = 0x50;

/// Offset of the key name within the key node structure.
const KEY_NAME_OFFSET: usize = 0x4C;

/// Key node (nk), decoded from a cell's payload.
///
/// Represents a registry key: its own metadata (flags, timestamp, name)
/// plus the offsets needed to reach its subkeys, values, and parent. Those
/// offsets are resolved lazily by [`crate::hive::Hive`] — a `KeyNode` on its
/// own doesn't know about any other cell.
#[derive(Debug, Clone)]
pub struct KeyNode {
    /// Flags for this key.
    pub flags: KeyNodeFlags,

    /// Last written timestamp (Windows FILETIME).
    pub last_written: u64,

    /// Offset to the parent key node's cell.
    pub parent_offset: u32,

    /// Number of (non-volatile) subkeys.
    pub subkey_count: u32,

    /// Offset to the (non-volatile) subkey list cell, or `0xFFFFFFFF` if none.
    pub subkey_list_offset: u32,

    /// Number of values.
    pub value_count: u32,

    /// Offset to the value list cell, or `0xFFFFFFFF` if none.
    pub value_list_offset: u32,

    /// Offset to the security descriptor cell. Not followed by this crate.
    pub security_offset: u32,

    /// Offset to the class name cell. Not followed by this crate
    /// (class-name parsing is out of scope).
    pub class_name_offset: u32,

    /// Length in bytes of the class name, if any.
    pub class_name_length: u16,

    /// Decoded key name.
    pub name: String,
}

/// Sentinel used for "no offset" fields (subkey list, value list, security,
/// class name, parent-of-root).
pub const NO_OFFSET: u32 = 0xFFFF_FFFF;

impl KeyNode {
    /// Decodes a key node from a cell's payload (the bytes after the 4-byte
    /// size field, starting with the `nk` signature).
    ///
    /// Returns `None` if the payload is too short or doesn't start with the
    /// `nk` signature — per §7, a malformed key node is dropped silently by
    /// the caller rather than surfaced as an error; one bad cell should
    /// never prevent the rest of the hive from being walked.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < KEY_NODE_MIN_SIZE || &data[0..2] != b"nk" {
            return None;
        }

        let flags = KeyNodeFlags::new(utils::read_u16(data, 0x02));
        let last_written = utils::read_u64(data, 0x04);
        let parent_offset = utils::read_u32(data, 0x10);
        let subkey_count = utils::read_u32(data, 0x14);
        let subkey_list_offset = utils::read_u32(data, 0x1C);
        let value_count = utils::read_u32(data, 0x24);
        let value_list_offset = utils::read_u32(data, 0x28);
        let security_offset = utils::read_u32(data, 0x2C);
        let class_name_offset = utils::read_u32(data, 0x30);
        let class_name_length = utils::read_u16(data, 0x4A);
        let name_length = utils::read_u16(data, 0x48) as usize;

        let name_bytes = utils::slice(data, KEY_NAME_OFFSET, name_length);
        let name = utils::decode_name(name_bytes, flags.is_compressed());

        Some(KeyNode {
            flags,
            last_written,
            parent_offset,
            subkey_count,
            subkey_list_offset,
            value_count,
            value_list_offset,
            security_offset,
            class_name_offset,
            class_name_length,
            name,
        })
    }

    /// Returns true if this key has (non-volatile) subkeys.
    pub fn has_subkeys(&self) -> bool {
        self.subkey_count > 0 && self.subkey_list_offset != NO_OFFSET
    }

    /// Returns true if this key has values.
    pub fn has_values(&self) -> bool {
        self.value_count > 0 && self.value_list_offset != NO_OFFSET
    }

    /// Returns true if the root-key flag is set.
    pub fn is_root(&self) -> bool {
        self.flags.is_root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_nk(name: &str) -> Vec<u8> {
        let mut data = vec![0u8; KEY_NODE_MIN_SIZE + name.len()];
        data[0..2].copy_from_slice(b"nk");
        data[0x02..0x04].copy_from_slice(&KeyNodeFlags::COMP_NAME.to_le_bytes());
        data[0x1C..0x20].copy_from_slice(&NO_OFFSET.to_le_bytes());
        data[0x28..0x2C].copy_from_slice(&NO_OFFSET.to_le_bytes());
        data[0x48..0x4A].copy_from_slice(&(name.len() as u16).to_le_bytes());
        data[KEY_NAME_OFFSET..KEY_NAME_OFFSET + name.len()].copy_from_slice(name.as_bytes());
        data
    }

    #[test]
    fn too_short_returns_none() {
        let data = vec![0u8; KEY_NODE_MIN_SIZE - 1];
        assert!(KeyNode::parse(&data).is_none());
    }

    #[test]
    fn wrong_signature_returns_none() {
        let mut data = minimal_nk("Test");
        data[0..2].copy_from_slice(b"XX");
        assert!(KeyNode::parse(&data).is_none());
    }

    #[test]
    fn decodes_compressed_name() {
        let data = minimal_nk("Software");
        let key = KeyNode::parse(&data).unwrap();
        assert_eq!(key.name, "Software");
        assert!(!key.has_subkeys());
        assert!(!key.has_values());
    }

    #[test]
    fn truncated_name_falls_back_to_empty_slice() {
        let mut data = minimal_nk("Software");
        // Claim a name longer than what's actually present.
        data[0x48..0x4A].copy_from_slice(&100u16.to_le_bytes());
        let key = KeyNode::parse(&data).unwrap();
        assert_eq!(key.name, "");
    }
}
