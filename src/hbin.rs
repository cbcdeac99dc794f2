//! Hive bin (hbin) scanning.
//!
//! Hive bins are blocks (nominally 4KiB-aligned, though only the declared
//! `size` field is trusted) that hold a packed sequence of cells. This
//! module walks the whole buffer page by page and records every allocated
//! cell's offset and size — it does not interpret cell payloads.

use std::collections::HashMap;

use crate::cell::CellRecord;
use crate::utils::{self, HBIN_START_OFFSET};

/// Expected signature for hive bins ("hbin").
pub const HBIN_SIGNATURE: &[u8; 4] = b"hbin";

/// Size of an hbin header.
pub const HBIN_HEADER_SIZE: usize = 0x20;

/// Minimum plausible cell size: just the 4-byte size field itself. Anything
/// smaller is framing corruption (§4.2: "If `size < 4`").
const MIN_CELL_SIZE: usize = 4;

/// Hive bin header, parsed for diagnostic purposes
/// ([`crate::hive::Hive::hbins`]). The cell scan itself does not require a
/// well-formed header beyond a plausible `size` — see [`scan_cells`].
#[derive(Debug, Clone)]
pub struct HbinHeader {
    /// Offset of this hbin relative to the first hbin (`HBIN_START_OFFSET`).
    pub relative_offset: u32,

    /// Size of this hbin in bytes, including this header.
    pub size: u32,

    /// Hbin-level timestamp (Windows FILETIME). Rarely meaningful in
    /// practice; exposed for completeness.
    pub timestamp: u64,
}

impl HbinHeader {
    /// Parses an hbin header from the bytes at its start, or `None` if the
    /// signature doesn't match.
    ///
    /// A recorded-offset mismatch against where the header actually sits in
    /// the buffer is logged but does not prevent parsing — carved or
    /// hand-edited hives sometimes carry stale offset fields.
    pub fn parse(data: &[u8], absolute_offset: u64) -> Option<Self> {
        if data.len() < HBIN_HEADER_SIZE || &data[0..4] != HBIN_SIGNATURE {
            return None;
        }

        let relative_offset = utils::read_u32(data, 0x04);
        let size = utils::read_u32(data, 0x08);
        let timestamp = utils::read_u64(data, 0x14);

        let expected_relative = absolute_offset.saturating_sub(HBIN_START_OFFSET) as u32;
        if relative_offset != expected_relative {
            tracing::warn!(
                absolute_offset,
                recorded = relative_offset,
                expected = expected_relative,
                "hbin offset field disagrees with its actual position"
            );
        }

        Some(HbinHeader {
            relative_offset,
            size,
            timestamp,
        })
    }
}

/// Scans `data` from [`HBIN_START_OFFSET`] to the end of the buffer,
/// returning every allocated cell found, keyed by absolute offset.
///
/// Implements §4.2: walk hbin by hbin; within each hbin, walk cells by
/// their signed size field (negative = allocated, positive = free, zero =
/// end-of-hbin marker). A cell whose size is too small or runs past the end
/// of its hbin is framing corruption — rather than abort the whole scan,
/// resync by stepping forward 4 bytes and trying again. A page that isn't a
/// valid hbin header at all is skipped wholesale (treated as a 4KiB page),
/// so one damaged page doesn't take down the rest of the hive.
pub fn scan_cells(data: &[u8]) -> HashMap<u64, CellRecord> {
    let mut cells = HashMap::new();
    let mut page_offset = HBIN_START_OFFSET as usize;

    while page_offset + HBIN_HEADER_SIZE <= data.len() {
        let header = HbinHeader::parse(&data[page_offset..], page_offset as u64);
        let hbin_size = match &header {
            Some(h) if h.size as usize >= HBIN_HEADER_SIZE => h.size as usize,
            _ => {
                tracing::warn!(offset = page_offset, "bad or missing hbin header, skipping page");
                0x1000
            }
        };

        let hbin_end = (page_offset + hbin_size).min(data.len());
        let mut cursor = page_offset + HBIN_HEADER_SIZE;

        while cursor + 4 <= hbin_end {
            let size_field = utils::read_i32(data, cursor);
            if size_field == 0 {
                break;
            }

            let abs_size = size_field.unsigned_abs() as usize;
            if abs_size < MIN_CELL_SIZE || cursor + abs_size > hbin_end {
                tracing::warn!(offset = cursor, "corrupt cell framing, resyncing");
                cursor += 4;
                continue;
            }

            if size_field < 0 {
                cells.insert(
                    cursor as u64,
                    CellRecord {
                        offset: cursor as u64,
                        size: abs_size as u32,
                    },
                );
            }

            cursor += abs_size;
        }

        page_offset += hbin_size.max(0x1000);
    }

    cells
}
