//! # Windows Registry Hive (REGF) Parser
//!
//! A defensive, read-only parser for Windows registry hive files, built for
//! digital forensics: carved, truncated, or otherwise damaged hives should
//! still yield whatever structure can be recovered, rather than bailing out
//! on the first anomaly.
//!
//! ## Architecture
//!
//! The parser is built in three layers:
//!
//! 1. **Byte layer** ([`utils`]): bounds-checked little-endian reads that
//!    return zero rather than erroring out of range, plus name/string
//!    decoding and FILETIME conversion.
//! 2. **Cell layer** ([`cell`], [`hbin`]): a scan of the hive's hbin pages
//!    that locates every allocated cell, resyncing past corrupted framing
//!    instead of aborting.
//! 3. **Tree layer** ([`key`], [`value`], [`subkey_list`], [`hive`]):
//!    decodes NK/VK cells into [`Key`](hive::Key)/[`Value`](hive::Value)
//!    handles and walks subkey lists across all four `lf`/`lh`/`li`/`ri`
//!    encodings.
//!
//! ## Binary layout
//!
//! ```text
//! [Base Block - 4096 bytes]
//!   - Signature: "regf"
//!   - Sequence numbers, last-written timestamp, version
//!   - Root key cell offset
//!   - Checksum (XOR of the preceding bytes)
//!
//! [Hive Bins - variable size]
//!   [Hbin Header - 32 bytes]
//!     - Signature: "hbin", offset, size
//!   [Cells - variable size]
//!     [Cell Size - 4 bytes, negative if allocated]
//!     [Cell Data] - nk / vk / lf / lh / li / ri / sk / db
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use regf_parser::Hive;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let hive = Hive::open("SYSTEM")?;
//! let root = hive.root().ok_or("no root key")?;
//!
//! for subkey in root.subkeys() {
//!     println!("subkey: {}", subkey.name());
//! }
//!
//! if let Ok(key) = hive.get_key(r"ControlSet001\Services") {
//!     for value in key.values() {
//!         println!("{} = {}", value.name(), value.data());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Non-goals
//!
//! This crate does not write hives, replay `.LOG1`/`.LOG2` transaction
//! logs, parse security descriptors or class names, or reassemble
//! big-data (`db`) values above roughly 16KiB. It also carries no CLI,
//! TUI, or artifact-specific ("plugin") interpretation logic — those
//! belong in tools built on top of this library, not in it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cell;
pub mod error;
pub mod hbin;
pub mod header;
pub mod hive;
pub mod key;
pub mod subkey_list;
pub mod utils;
pub mod value;

pub use cell::{CellType, KeyNodeFlags, ValueType};
pub use error::{RegistryError, Result};
pub use hbin::HbinHeader;
pub use header::BaseBlock;
pub use hive::{decode_string, Hive, HbinIterator, Key, Value};
pub use key::KeyNode;
pub use subkey_list::{SubkeyList, SubkeyListEntry, SubkeyListType};
pub use value::{ValueData, ValueKey};

/// Library version, taken from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!VERSION.is_empty());
    }
}
