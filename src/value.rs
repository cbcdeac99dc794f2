//! Registry value (vk) parsing and typed data decoding.

use crate::cell::ValueType;
use crate::utils;

/// Value key (vk), decoded from a cell's payload.
///
/// Holds only the VK's own fields — name, type, and where its data lives.
/// Resolving that data (inline vs. indirect, reading the referenced cell)
/// is [`crate::hive::Hive`]'s job, since it requires looking up another
/// cell.
#[derive(Debug, Clone)]
pub struct ValueKey {
    /// Length of the value data in bytes, with the inline flag already
    /// masked out. See [`ValueKey::is_inline_data`].
    pub data_length: u32,

    /// Raw `data_size` field, including its high-bit inline flag — needed
    /// to distinguish a genuinely empty value from one whose length field
    /// happens to be zero after masking.
    pub data_size_raw: i32,

    /// Offset to the value's data cell, or (if inline) the data itself
    /// packed into this field's 4 bytes.
    pub data_offset: u32,

    /// Value data type.
    pub data_type: ValueType,

    /// Flags (bit 0 = name is stored as ASCII/Latin-1 rather than UTF-16LE).
    pub flags: u16,

    /// Decoded value name. Empty for the key's unnamed ("default") value —
    /// that's a label callers apply when presenting results, not a string
    /// actually stored on disk.
    pub name: String,
}

impl ValueKey {
    /// Decodes a value key from a cell's payload (the bytes after the
    /// 4-byte size field, starting with the `vk` signature).
    ///
    /// Returns `None` if the payload is too short or doesn't start with
    /// the `vk` signature — absorbed silently by the caller, same as
    /// [`crate::key::KeyNode::parse`].
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 0x14 || &data[0..2] != b"vk" {
            return None;
        }

        let name_length = utils::read_u16(data, 0x02) as usize;
        let data_size_raw = utils::read_i32(data, 0x04);
        let data_length = (data_size_raw & 0x7FFF_FFFF) as u32;
        let data_offset = utils::read_u32(data, 0x08);
        let data_type = ValueType::from_u32(utils::read_u32(data, 0x0C));
        let flags = utils::read_u16(data, 0x10);

        let name_bytes = utils::slice(data, 0x14, name_length);
        let ascii_flag = (flags & 0x0001) != 0;
        let name = utils::decode_name(name_bytes, ascii_flag);

        Some(ValueKey {
            data_length,
            data_size_raw,
            data_offset,
            data_type,
            flags,
            name,
        })
    }

    /// Returns true if this value's data is stored inline in `data_offset`
    /// rather than in a separate cell.
    ///
    /// Per the format, this is the high bit of the raw `data_size` field —
    /// not simply "length <= 4", since a 0-byte or 3-byte indirect value is
    /// also technically possible on disk.
    pub fn is_inline_data(&self) -> bool {
        self.data_size_raw < 0
    }

    /// Returns the inline data bytes (valid only when [`is_inline_data`]
    /// is true). Clamped to 4 bytes regardless of the recorded length,
    /// since that's all `data_offset` can physically hold.
    ///
    /// [`is_inline_data`]: ValueKey::is_inline_data
    pub fn inline_data(&self) -> Vec<u8> {
        let bytes = self.data_offset.to_le_bytes();
        let len = (self.data_length as usize).min(4);
        bytes[..len].to_vec()
    }
}

/// Typed, decoded registry value data (§4.6b).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ValueData {
    /// No data.
    None,
    /// String value.
    String(String),
    /// Expandable string value.
    ExpandString(String),
    /// Binary data.
    Binary(Vec<u8>),
    /// 32-bit little-endian integer.
    Dword(u32),
    /// 32-bit big-endian integer.
    DwordBigEndian(u32),
    /// Multiple strings.
    MultiString(Vec<String>),
    /// 64-bit little-endian integer.
    Qword(u64),
    /// A type this crate doesn't decode further; data is kept raw.
    Unknown(Vec<u8>),
}

impl ValueData {
    /// Decodes `data` according to `value_type`.
    ///
    /// Never fails: data too short for the declared type (e.g. 2 bytes
    /// claiming to be a DWORD) falls back to [`ValueData::Unknown`] rather
    /// than erroring, consistent with the rest of the tree layer's
    /// silent-degradation philosophy.
    pub fn parse(data: &[u8], value_type: ValueType) -> Self {
        if data.is_empty() {
            return ValueData::None;
        }

        match value_type {
            ValueType::None => ValueData::None,

            ValueType::String => ValueData::String(utils::decode_value_string(data)),
            ValueType::ExpandString => ValueData::ExpandString(utils::decode_value_string(data)),
            ValueType::Link => ValueData::String(utils::decode_value_string(data)),

            ValueType::Binary => ValueData::Binary(data.to_vec()),

            ValueType::Dword if data.len() >= 4 => {
                ValueData::Dword(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
            }

            ValueType::DwordBigEndian if data.len() >= 4 => {
                ValueData::DwordBigEndian(u32::from_be_bytes([data[0], data[1], data[2], data[3]]))
            }

            ValueType::Qword if data.len() >= 8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&data[..8]);
                ValueData::Qword(u64::from_le_bytes(buf))
            }

            ValueType::MultiString => ValueData::MultiString(split_multi_string(data)),

            _ => ValueData::Unknown(data.to_vec()),
        }
    }
}

impl std::fmt::Display for ValueData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueData::None => write!(f, "(none)"),
            ValueData::String(s) | ValueData::ExpandString(s) => write!(f, "{s}"),
            ValueData::Binary(b) | ValueData::Unknown(b) => write!(f, "{:02X?}", b),
            ValueData::Dword(d) => write!(f, "{} (0x{:08X})", d, d),
            ValueData::DwordBigEndian(d) => write!(f, "{} (0x{:08X})", d, d),
            ValueData::Qword(q) => write!(f, "{} (0x{:016X})", q, q),
            ValueData::MultiString(strings) => write!(f, "{}", strings.join(", ")),
        }
    }
}

/// Splits a REG_MULTI_SZ blob into its embedded strings, each terminated by
/// a UTF-16LE null, with the whole list ending at the first empty string
/// (a double null).
fn split_multi_string(data: &[u8]) -> Vec<String> {
    let mut strings = Vec::new();
    let mut start = 0;

    while start + 1 < data.len() {
        let mut end = start;
        while end + 1 < data.len() && !(data[end] == 0 && data[end + 1] == 0) {
            end += 2;
        }

        if end == start {
            break;
        }

        strings.push(utils::decode_value_string(&data[start..end]));
        start = end + 2;
    }

    strings
}
