//! Hive-level API: open a file, find the root key, walk the tree.
//!
//! Unlike the teacher this grew from, a [`Hive`] owns its bytes outright —
//! the whole file is read once at `open()` and the cell/key/value maps are
//! built eagerly from that buffer (§4.2/§4.9). There is no lazy per-access
//! cache to invalidate and no `mmap` lifetime to manage; the tradeoff is a
//! larger up-front read, which is fine for registry hives (bounded in size,
//! typically well under a gigabyte).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::cell::{CellRecord, ValueType};
use crate::error::{RegistryError, Result};
use crate::hbin::{self, HbinHeader, HBIN_HEADER_SIZE};
use crate::header::{BaseBlock, BASE_BLOCK_SIZE};
use crate::key::{KeyNode, NO_OFFSET};
use crate::subkey_list::SubkeyList;
use crate::utils::{self, HBIN_START_OFFSET};
use crate::value::{ValueData, ValueKey};

/// A parsed registry hive.
///
/// Construction does all the work: the cell scan (§4.2) and NK/VK decode
/// (§4.3) both happen inside `open`/`open_bytes`, so every [`Key`] and
/// [`Value`] handle obtained afterwards is a cheap map lookup, not a fresh
/// parse. Handles borrow `&Hive` and so cannot outlive it, and [`close`]
/// takes `&mut self` — the borrow checker refuses to compile a program that
/// closes a hive while a `Key`/`Value` obtained from it is still alive,
/// enforcing at compile time what other implementations check at runtime.
///
/// [`close`]: Hive::close
pub struct Hive {
    data: Vec<u8>,
    closed: bool,
    base_block: BaseBlock,
    /// Allocated cells keyed by absolute offset into `data`, as recorded by
    /// the cell scan.
    cell_map: HashMap<u64, CellRecord>,
    /// Decoded key nodes keyed by offset relative to the first hbin — the
    /// same relative offsets NK/VK fields use to reference each other.
    key_map: HashMap<u32, KeyNode>,
    value_map: HashMap<u32, ValueKey>,
}

impl Hive {
    /// Opens a hive file, reading it into memory in full.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("opening registry hive");
        let mut file = File::open(&path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        debug!(size = data.len(), "read hive file");
        Self::open_bytes(data)
    }

    /// Builds a hive by reading `reader` to the end, for callers that have
    /// an open stream (a carved image, a network fetch) rather than a path.
    #[instrument(skip(reader))]
    pub fn open_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        debug!(size = data.len(), "read hive from reader");
        Self::open_bytes(data)
    }

    /// Builds a hive from an in-memory image (e.g. already read, or carved
    /// from a larger disk image).
    #[instrument(skip(data), fields(size = data.len()))]
    pub fn open_bytes(data: Vec<u8>) -> Result<Self> {
        let base_block = BaseBlock::parse(&data)?;
        if !base_block.is_consistent() {
            warn!("hive sequence numbers disagree; primary/secondary out of sync");
        }

        let cell_map = hbin::scan_cells(&data);
        info!(cell_count = cell_map.len(), "cell scan complete");

        let (key_map, value_map) = Self::decode_tree_cells(&data, &cell_map);
        info!(
            keys = key_map.len(),
            values = value_map.len(),
            "decoded key/value nodes"
        );

        Ok(Self {
            data,
            closed: false,
            base_block,
            cell_map,
            key_map,
            value_map,
        })
    }

    /// Decodes every `nk`/`vk` cell up front; other cell types (subkey
    /// lists, security descriptors) are decoded on demand since they're
    /// only ever needed transiently while resolving a single key's
    /// children.
    fn decode_tree_cells(
        data: &[u8],
        cell_map: &HashMap<u64, CellRecord>,
    ) -> (HashMap<u32, KeyNode>, HashMap<u32, ValueKey>) {
        let mut key_map = HashMap::new();
        let mut value_map = HashMap::new();

        for (&absolute_offset, record) in cell_map {
            let start = record.offset as usize + 4;
            let end = record.offset as usize + record.size as usize;
            let Some(payload) = data.get(start..end) else {
                continue;
            };
            if payload.len() < 2 {
                continue;
            }

            let relative_offset = (absolute_offset - HBIN_START_OFFSET) as u32;
            match &payload[0..2] {
                b"nk" => match KeyNode::parse(payload) {
                    Some(node) => {
                        key_map.insert(relative_offset, node);
                    }
                    None => warn!(offset = relative_offset, "malformed nk cell, dropped"),
                },
                b"vk" => match ValueKey::parse(payload) {
                    Some(vk) => {
                        value_map.insert(relative_offset, vk);
                    }
                    None => warn!(offset = relative_offset, "malformed vk cell, dropped"),
                },
                _ => {}
            }
        }

        (key_map, value_map)
    }

    /// Returns the parsed base block.
    pub fn base_block(&self) -> &BaseBlock {
        &self.base_block
    }

    /// Returns the total size of the hive image in bytes.
    pub fn file_size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Marks the hive closed. Idempotent — calling this more than once, or
    /// on a hive that was never meaningfully "open" as an OS resource (the
    /// whole file was already read into memory at `open()`), is a no-op.
    ///
    /// Takes `&mut self` specifically so that any outstanding [`Key`]/
    /// [`Value`] borrow (which holds `&Hive`) must already have ended —
    /// the compiler, not a runtime flag, is what actually prevents
    /// use-after-close.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Returns true if [`close`](Hive::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns the root key, or `None` if the base block's root offset
    /// doesn't resolve to a decoded key node (a malformed hive).
    pub fn root(&self) -> Option<Key<'_>> {
        self.key_at(self.base_block.root_cell_offset)
    }

    /// Looks up a key by its cell offset (relative to the first hbin).
    pub fn key_at(&self, offset: u32) -> Option<Key<'_>> {
        self.key_map.get(&offset).map(|node| Key {
            hive: self,
            offset,
            node,
        })
    }

    /// Resolves a `\`- or `/`-separated path from the root, case-insensitively.
    ///
    /// An empty path, `"\"`, or `"/"` all resolve to the root key. Fails
    /// with [`RegistryError::NoRootKey`] if the hive has no resolvable
    /// root, or [`RegistryError::NotFound`] as soon as any path component
    /// fails to match a subkey — there is no partial result.
    pub fn get_key(&self, path: &str) -> Result<Key<'_>> {
        let mut current = self.root().ok_or(RegistryError::NoRootKey)?;
        let trimmed = path.trim_matches(|c| c == '\\' || c == '/');
        if trimmed.is_empty() {
            return Ok(current);
        }

        for component in trimmed.split(|c| c == '\\' || c == '/') {
            if component.is_empty() {
                continue;
            }
            current = current
                .subkeys()
                .into_iter()
                .find(|k| k.name().eq_ignore_ascii_case(component))
                .ok_or_else(|| RegistryError::NotFound(path.to_string()))?;
        }

        Ok(current)
    }

    /// Returns the raw payload bytes of the cell at absolute `offset`
    /// (excluding its 4-byte size field), or [`RegistryError::CellNotFound`]
    /// if no allocated cell exists there.
    pub fn raw_cell_at(&self, offset: u64) -> Result<&[u8]> {
        let record = self
            .cell_map
            .get(&offset)
            .ok_or(RegistryError::CellNotFound(offset))?;
        let start = record.offset as usize + 4;
        let end = record.offset as usize + record.size as usize;
        self.data
            .get(start..end)
            .ok_or(RegistryError::CellNotFound(offset))
    }

    /// Looks up the payload bytes of the cell at `relative` offset (the
    /// convention NK/VK fields use), or `None` if it doesn't resolve.
    fn cell_payload_at_relative(&self, relative: u32) -> Option<&[u8]> {
        if relative == NO_OFFSET {
            return None;
        }
        self.raw_cell_at(utils::cell_offset_to_absolute(relative)).ok()
    }

    /// Calls `f` for every allocated cell found during the scan, keyed by
    /// absolute offset, in unspecified order. Iteration stops early if `f`
    /// returns `false`.
    pub fn iterate_cells<F>(&self, mut f: F)
    where
        F: FnMut(u64, &CellRecord) -> bool,
    {
        for (&offset, record) in &self.cell_map {
            if !f(offset, record) {
                break;
            }
        }
    }

    /// Returns an iterator over hbin headers, for diagnostics.
    pub fn hbins(&self) -> HbinIterator<'_> {
        HbinIterator {
            data: &self.data,
            offset: HBIN_START_OFFSET as usize,
        }
    }

    /// Flattens a subkey list (following `ri` indirection one level) into
    /// the relative offsets of its subkeys' own NK cells.
    fn collect_subkey_offsets(&self, list_offset: u32, out: &mut Vec<u32>) {
        if list_offset == NO_OFFSET {
            return;
        }

        let Some(bytes) = self.cell_payload_at_relative(list_offset) else {
            warn!(list_offset, "subkey list offset does not resolve to a cell");
            return;
        };

        let Some(list) = SubkeyList::parse(bytes) else {
            warn!(list_offset, "malformed subkey list cell, dropped");
            return;
        };

        if list.is_index_root() {
            for sublist_offset in list.key_offsets_iter() {
                self.collect_direct_subkey_offsets(sublist_offset, out);
            }
        } else {
            out.extend(list.key_offsets_iter());
        }
    }

    /// Resolves one of `ri`'s sublists and appends its key offsets to
    /// `out`, provided it's an `lf`/`lh`/`li` list. Per §4.4, `ri` is not
    /// recursively nested beyond one level in practice — a sublist that is
    /// itself an `ri` is not followed, which also bounds recursion depth
    /// to exactly one against a carved/corrupt hive whose `ri` entries
    /// point at each other.
    fn collect_direct_subkey_offsets(&self, list_offset: u32, out: &mut Vec<u32>) {
        if list_offset == NO_OFFSET {
            return;
        }

        let Some(bytes) = self.cell_payload_at_relative(list_offset) else {
            warn!(list_offset, "ri sublist offset does not resolve to a cell");
            return;
        };

        let Some(list) = SubkeyList::parse(bytes) else {
            warn!(list_offset, "malformed ri sublist cell, dropped");
            return;
        };

        if list.is_index_root() {
            warn!(list_offset, "nested ri within ri is not followed");
            return;
        }

        out.extend(list.key_offsets_iter());
    }
}

/// Iterator over hbin headers across the whole hive, used for diagnostics
/// (`Hive::hbins`). Stops at the first page that isn't a valid hbin header,
/// matching where the cell scan would also give up on a contiguous run.
pub struct HbinIterator<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for HbinIterator<'a> {
    type Item = HbinHeader;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset + HBIN_HEADER_SIZE > self.data.len() {
            return None;
        }

        let header = HbinHeader::parse(&self.data[self.offset..], self.offset as u64)?;
        if (header.size as usize) < HBIN_HEADER_SIZE {
            return None;
        }

        self.offset += header.size as usize;
        Some(header)
    }
}

/// A registry key, borrowed from its [`Hive`].
#[derive(Clone, Copy)]
pub struct Key<'a> {
    hive: &'a Hive,
    offset: u32,
    node: &'a KeyNode,
}

impl<'a> Key<'a> {
    /// Returns this key's cell offset (relative to the first hbin).
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Returns the key's decoded name.
    pub fn name(&self) -> &'a str {
        &self.node.name
    }

    /// Returns the key's last-written timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        utils::filetime_to_instant(self.node.last_written)
    }

    /// Returns the number of subkeys this key's node claims to have (may
    /// not match `subkeys().len()` exactly if the subkey list is partly
    /// corrupt).
    pub fn subkey_count(&self) -> u32 {
        self.node.subkey_count
    }

    /// Returns the number of values this key's node claims to have.
    pub fn value_count(&self) -> u32 {
        self.node.value_count
    }

    /// Returns this key's immediate subkeys.
    ///
    /// Computed fresh on every call by walking the subkey list cell(s) —
    /// nothing here is cached, so repeated calls during a deep traversal
    /// do repeat the list walk. For whole-subtree walks prefer recursing
    /// through the returned `Key`s directly.
    pub fn subkeys(&self) -> Vec<Key<'a>> {
        if !self.node.has_subkeys() {
            return Vec::new();
        }

        let mut offsets = Vec::new();
        self.hive.collect_subkey_offsets(self.node.subkey_list_offset, &mut offsets);
        offsets.truncate(self.node.subkey_count as usize);

        offsets
            .into_iter()
            .filter_map(|offset| self.hive.key_at(offset))
            .collect()
    }

    /// Returns this key's values.
    pub fn values(&self) -> Vec<Value<'a>> {
        if !self.node.has_values() {
            return Vec::new();
        }

        let Some(list_bytes) = self.hive.cell_payload_at_relative(self.node.value_list_offset) else {
            warn!(offset = self.offset, "value list offset does not resolve to a cell");
            return Vec::new();
        };

        let count = self.node.value_count as usize;
        let mut values = Vec::with_capacity(count);

        for i in 0..count {
            let pos = i * 4;
            if pos + 4 > list_bytes.len() {
                warn!(offset = self.offset, "value list truncated before declared count");
                break;
            }

            let value_offset = utils::read_u32(list_bytes, pos);
            if let Some(vk) = self.hive.value_map.get(&value_offset) {
                values.push(Value {
                    hive: self.hive,
                    vk,
                });
            }
        }

        values
    }

    /// Looks up a single value by name, case-insensitively. Pass `""` for
    /// the key's unnamed (default) value.
    pub fn value(&self, name: &str) -> Option<Value<'a>> {
        self.values().into_iter().find(|v| v.name().eq_ignore_ascii_case(name))
    }
}

/// A registry value, borrowed from its [`Hive`].
#[derive(Clone, Copy)]
pub struct Value<'a> {
    hive: &'a Hive,
    vk: &'a ValueKey,
}

impl<'a> Value<'a> {
    /// Returns the value's decoded name (empty for the default value).
    pub fn name(&self) -> &'a str {
        &self.vk.name
    }

    /// Returns the value's declared type.
    pub fn value_type(&self) -> ValueType {
        self.vk.data_type
    }

    /// Returns the value's raw data bytes, resolving inline vs. indirect
    /// storage transparently. Values larger than what fits directly in a
    /// cell (big-data / `db` chaining) are not reassembled — see §1's
    /// Non-goals — and resolve to an empty byte string instead.
    pub fn bytes(&self) -> Vec<u8> {
        if self.vk.is_inline_data() {
            return self.vk.inline_data();
        }

        if self.vk.data_offset == NO_OFFSET || self.vk.data_length == 0 {
            return Vec::new();
        }

        match self.hive.cell_payload_at_relative(self.vk.data_offset) {
            Some(bytes) => {
                let len = (self.vk.data_length as usize).min(bytes.len());
                bytes[..len].to_vec()
            }
            None => {
                warn!(
                    offset = self.vk.data_offset,
                    "value data offset does not resolve to a cell"
                );
                Vec::new()
            }
        }
    }

    /// Returns the value's data, typed per its declared `value_type`.
    pub fn data(&self) -> ValueData {
        ValueData::parse(&self.bytes(), self.vk.data_type)
    }
}

/// Best-effort string decoding for a value's raw bytes (§4.6), independent
/// of its declared `value_type` — useful for REG_BINARY or unrecognized
/// types a caller still wants to eyeball as text, and for the "Current" /
/// default-value cases callers commonly probe ad hoc.
pub fn decode_string(value: &Value<'_>) -> String {
    utils::decode_value_string(&value.bytes())
}
