//! Registry cell type definitions.
//!
//! Cells are the fundamental data structures within registry hives. Each
//! allocated cell has a 2-byte signature identifying its type; this module
//! only defines that vocabulary. The scan that discovers cell boundaries
//! lives in [`crate::hbin`]; the map that stores them lives in
//! [`crate::hive`].

/// Cell type signatures recognized while dispatching on a cell's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    /// Key node (nk) - represents a registry key.
    KeyNode,

    /// Value key (vk) - represents a registry value.
    ValueKey,

    /// Security descriptor (sk). Not parsed — security-descriptor parsing
    /// is out of scope for this crate.
    Security,

    /// Index leaf (li) - list of subkey offsets, no name hint.
    IndexLeaf,

    /// Fast leaf (lf) - list of subkeys with 4-byte name hints.
    FastLeaf,

    /// Hash leaf (lh) - list of subkeys with name hashes.
    HashLeaf,

    /// Index root (ri) - list of subkey list offsets.
    IndexRoot,

    /// Data block (db) - big-data segment. Not parsed — big-data
    /// reassembly is out of scope for this crate.
    DataBlock,
}

impl CellType {
    /// Parses a cell type from a 2-byte signature, or `None` if unrecognized.
    ///
    /// Unlike a format violation, an unrecognized signature is not an error:
    /// the cell scan still records the cell's offset and size, callers that
    /// care about its type just get nothing back from this lookup.
    pub fn from_signature(sig: &[u8; 2]) -> Option<Self> {
        match sig {
            b"nk" => Some(CellType::KeyNode),
            b"vk" => Some(CellType::ValueKey),
            b"sk" => Some(CellType::Security),
            b"li" => Some(CellType::IndexLeaf),
            b"lf" => Some(CellType::FastLeaf),
            b"lh" => Some(CellType::HashLeaf),
            b"ri" => Some(CellType::IndexRoot),
            b"db" => Some(CellType::DataBlock),
            _ => None,
        }
    }

    /// Returns the 2-byte signature for this cell type.
    pub fn signature(&self) -> &'static [u8; 2] {
        match self {
            CellType::KeyNode => b"nk",
            CellType::ValueKey => b"vk",
            CellType::Security => b"sk",
            CellType::IndexLeaf => b"li",
            CellType::FastLeaf => b"lf",
            CellType::HashLeaf => b"lh",
            CellType::IndexRoot => b"ri",
            CellType::DataBlock => b"db",
        }
    }

    /// Returns true if this cell type is one of the four subkey-list
    /// encodings (`lf`/`lh`/`li`/`ri`).
    pub fn is_subkey_list(&self) -> bool {
        matches!(
            self,
            CellType::IndexLeaf | CellType::FastLeaf | CellType::HashLeaf | CellType::IndexRoot
        )
    }
}

/// Flags for key nodes (the NK flag word).
#[derive(Debug, Clone, Copy)]
pub struct KeyNodeFlags(pub u16);

impl KeyNodeFlags {
    /// Key is volatile (not stored on disk).
    pub const VOLATILE: u16 = 0x0001;

    /// Key is a mount point for another hive.
    pub const HIVE_EXIT: u16 = 0x0002;

    /// Key is the root key of the hive.
    pub const ROOT_KEY: u16 = 0x0004;

    /// Key cannot be deleted.
    pub const NO_DELETE: u16 = 0x0008;

    /// Key is a symbolic link.
    pub const SYM_LINK: u16 = 0x0010;

    /// Key name is stored in compressed (ASCII/Latin-1) form rather than UTF-16LE.
    pub const COMP_NAME: u16 = 0x0020;

    /// Key is a predefined handle.
    pub const PREDEF_HANDLE: u16 = 0x0040;

    /// Creates a new `KeyNodeFlags` from the raw flag word.
    pub fn new(flags: u16) -> Self {
        Self(flags)
    }

    /// Returns true if the specified flag bit is set.
    pub fn has_flag(&self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    /// Returns true if the key name is compressed (ASCII/Latin-1).
    pub fn is_compressed(&self) -> bool {
        self.has_flag(Self::COMP_NAME)
    }

    /// Returns true if this is a volatile key.
    pub fn is_volatile(&self) -> bool {
        self.has_flag(Self::VOLATILE)
    }

    /// Returns true if the root-key bit is set.
    ///
    /// This crate does not rely on this flag to find the root (see
    /// [`crate::hive::Hive::root`], which uses the base block's root-cell
    /// offset instead); it's exposed here for callers inspecting key
    /// metadata directly.
    pub fn is_root(&self) -> bool {
        self.has_flag(Self::ROOT_KEY)
    }
}

/// Registry value data types (the VK `data_type` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ValueType {
    /// No value type.
    None,
    /// String (null-terminated).
    String,
    /// String with environment variables.
    ExpandString,
    /// Binary data.
    Binary,
    /// 32-bit little-endian integer.
    Dword,
    /// 32-bit big-endian integer.
    DwordBigEndian,
    /// Symbolic link (Unicode).
    Link,
    /// Multiple strings.
    MultiString,
    /// Resource list.
    ResourceList,
    /// Full resource descriptor.
    FullResourceDescriptor,
    /// Resource requirements list.
    ResourceRequirementsList,
    /// 64-bit little-endian integer.
    Qword,
    /// Unknown or non-standard type; carries the raw type value.
    Unknown(u32),
}

impl ValueType {
    /// Parses a value type from its raw u32 encoding.
    ///
    /// Types 0-11 are the predefined `REG_*` constants; anything else is
    /// returned as `ValueType::Unknown` rather than rejected, since carved
    /// or corrupted hives routinely contain nonstandard type values.
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => ValueType::None,
            1 => ValueType::String,
            2 => ValueType::ExpandString,
            3 => ValueType::Binary,
            4 => ValueType::Dword,
            5 => ValueType::DwordBigEndian,
            6 => ValueType::Link,
            7 => ValueType::MultiString,
            8 => ValueType::ResourceList,
            9 => ValueType::FullResourceDescriptor,
            10 => ValueType::ResourceRequirementsList,
            11 => ValueType::Qword,
            other => ValueType::Unknown(other),
        }
    }

    /// Returns the canonical `REG_*` name of this value type.
    pub fn name(&self) -> String {
        match self {
            ValueType::None => "REG_NONE".to_string(),
            ValueType::String => "REG_SZ".to_string(),
            ValueType::ExpandString => "REG_EXPAND_SZ".to_string(),
            ValueType::Binary => "REG_BINARY".to_string(),
            ValueType::Dword => "REG_DWORD".to_string(),
            ValueType::DwordBigEndian => "REG_DWORD_BIG_ENDIAN".to_string(),
            ValueType::Link => "REG_LINK".to_string(),
            ValueType::MultiString => "REG_MULTI_SZ".to_string(),
            ValueType::ResourceList => "REG_RESOURCE_LIST".to_string(),
            ValueType::FullResourceDescriptor => "REG_FULL_RESOURCE_DESCRIPTOR".to_string(),
            ValueType::ResourceRequirementsList => "REG_RESOURCE_REQUIREMENTS_LIST".to_string(),
            ValueType::Qword => "REG_QWORD".to_string(),
            ValueType::Unknown(value) => format!("REG_UNKNOWN_{:#010x}", value),
        }
    }
}

/// An allocated cell's location within the hive, as recorded by the cell
/// scan (§4.2). Carries no payload of its own — use
/// [`crate::hive::Hive::raw_cell_at`] to read the bytes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRecord {
    /// Absolute offset of the cell's 4-byte size field, from the start of
    /// the hive buffer.
    pub offset: u64,
    /// Size of the cell in bytes, including the 4-byte size field itself.
    pub size: u32,
}
