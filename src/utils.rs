//! Byte layer and string/time conversion helpers.
//!
//! The functions in this module never error: out-of-range reads return zero
//! (or an empty slice), per §4.1 of the design — upstream call sites already
//! perform their own length checks before they matter, and returning zero is
//! the least surprising behavior when a parser is fed carved or truncated
//! hive data.

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};
use encoding_rs::UTF_16LE;

/// Absolute offset where hive bins begin; NK/VK offsets are relative to this.
pub const HBIN_START_OFFSET: u64 = 0x1000;

/// Windows FILETIME value of the Unix epoch (1970-01-01T00:00:00Z), in
/// 100-ns ticks since 1601-01-01.
pub const FILETIME_UNIX_EPOCH: u64 = 116_444_736_000_000_000;

/// Reads a little-endian `u16` at `offset`, or `0` if out of range.
pub fn read_u16(data: &[u8], offset: usize) -> u16 {
    match data.get(offset..offset + 2) {
        Some(bytes) => LittleEndian::read_u16(bytes),
        None => 0,
    }
}

/// Reads a little-endian `u32` at `offset`, or `0` if out of range.
pub fn read_u32(data: &[u8], offset: usize) -> u32 {
    match data.get(offset..offset + 4) {
        Some(bytes) => LittleEndian::read_u32(bytes),
        None => 0,
    }
}

/// Reads a little-endian `u64` at `offset`, or `0` if out of range.
pub fn read_u64(data: &[u8], offset: usize) -> u64 {
    match data.get(offset..offset + 8) {
        Some(bytes) => LittleEndian::read_u64(bytes),
        None => 0,
    }
}

/// Reads a signed, little-endian `i32` at `offset`, or `0` if out of range.
///
/// Used for cell-size fields, whose sign is the allocated/free sentinel.
pub fn read_i32(data: &[u8], offset: usize) -> i32 {
    read_u32(data, offset) as i32
}

/// Returns `data[offset..offset+len]`, or an empty slice if that range
/// doesn't fit.
pub fn slice(data: &[u8], offset: usize, len: usize) -> &[u8] {
    data.get(offset..offset + len).unwrap_or(&[])
}

/// Converts a cell offset relative to the first hbin into an absolute
/// offset into the hive buffer.
#[inline]
pub fn cell_offset_to_absolute(relative: u32) -> u64 {
    HBIN_START_OFFSET + relative as u64
}

/// Converts a Windows FILETIME (100-ns ticks since 1601-01-01) into a UTC
/// instant. Values before the Unix epoch — including `0`, which marks an
/// unset timestamp on disk — collapse to the Unix epoch itself, used as the
/// "missing/unset" sentinel.
pub fn filetime_to_instant(filetime: u64) -> DateTime<Utc> {
    if filetime < FILETIME_UNIX_EPOCH {
        return DateTime::<Utc>::from_timestamp(0, 0).expect("zero timestamp is always valid");
    }

    let ticks_since_epoch = filetime - FILETIME_UNIX_EPOCH;
    let seconds = (ticks_since_epoch / 10_000_000) as i64;
    let nanos = ((ticks_since_epoch % 10_000_000) * 100) as u32;

    DateTime::<Utc>::from_timestamp(seconds, nanos)
        .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).expect("zero timestamp is always valid"))
}

/// Decodes `data` as Latin-1 / 8-bit ASCII, one byte per `char`.
fn decode_latin1(data: &[u8]) -> String {
    data.iter().map(|&b| b as char).collect()
}

/// Decodes `data` as UTF-16LE, lossily substituting invalid sequences.
fn decode_utf16le_lossy(data: &[u8]) -> String {
    let (decoded, _encoding, _had_errors) = UTF_16LE.decode(data);
    decoded.into_owned()
}

/// Heuristically detects whether a byte array is UTF-16LE when the
/// encoding flag doesn't say so outright.
///
/// Ported from the reference implementation: inspect the first (up to) 20
/// bytes, count how many odd-indexed bytes among those are zero, and treat
/// the array as UTF-16LE if that count exceeds 25% of the *whole array's*
/// length (not just the bytes inspected).
fn looks_like_utf16le(data: &[u8]) -> bool {
    if data.len() < 2 || data.len() % 2 != 0 {
        return false;
    }

    let inspect_len = data.len().min(20);
    let zero_count = (1..inspect_len).step_by(2).filter(|&i| data[i] == 0).count();

    zero_count > data.len() / 4
}

/// Decodes an NK/VK name byte array per §4.6.
///
/// If `ascii_flag` is set the array is Latin-1. Otherwise the heuristic in
/// [`looks_like_utf16le`] decides between UTF-16LE and a Latin-1 fallback.
pub fn decode_name(data: &[u8], ascii_flag: bool) -> String {
    if data.is_empty() {
        return String::new();
    }

    if !ascii_flag && looks_like_utf16le(data) {
        decode_utf16le_lossy(data)
    } else {
        decode_latin1(data)
    }
}

/// Decodes value data (REG_SZ / REG_EXPAND_SZ / REG_MULTI_SZ) into a single
/// best-effort string per §4.6: the heuristic picks the encoding, then the
/// string is cut at the first null terminator (a `u16` zero for UTF-16LE, a
/// single `0x00` byte for Latin-1). For REG_MULTI_SZ this returns only the
/// first embedded string — full multi-string splitting is `value::ValueData`'s
/// job, not this helper's.
pub fn decode_value_string(data: &[u8]) -> String {
    if data.is_empty() {
        return String::new();
    }

    if looks_like_utf16le(data) {
        let mut end = data.len();
        let mut i = 0;
        while i + 1 < data.len() {
            if data[i] == 0 && data[i + 1] == 0 {
                end = i;
                break;
            }
            i += 2;
        }
        decode_utf16le_lossy(&data[..end])
    } else {
        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        decode_latin1(&data[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_return_zero_out_of_range() {
        let data = [0x01, 0x02];
        assert_eq!(read_u32(&data, 0), 0);
        assert_eq!(read_u16(&data, 5), 0);
        assert_eq!(read_u64(&data, 0), 0);
    }

    #[test]
    fn reads_little_endian_in_range() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        assert_eq!(read_u16(&data, 0), 0x0201);
        assert_eq!(read_u32(&data, 0), 0x04030201);
        assert_eq!(read_u64(&data, 0), 0x0807060504030201);
    }

    #[test]
    fn slice_out_of_range_is_empty() {
        let data = [0u8; 4];
        assert_eq!(slice(&data, 2, 10), &[] as &[u8]);
        assert_eq!(slice(&data, 0, 4), &[0u8; 4]);
    }

    #[test]
    fn offset_conversion() {
        assert_eq!(cell_offset_to_absolute(0), 0x1000);
        assert_eq!(cell_offset_to_absolute(0x20), 0x1020);
    }

    #[test]
    fn filetime_zero_is_sentinel() {
        let instant = filetime_to_instant(0);
        assert_eq!(instant, DateTime::<Utc>::from_timestamp(0, 0).unwrap());
    }

    #[test]
    fn filetime_at_epoch_constant_is_unix_epoch() {
        let instant = filetime_to_instant(FILETIME_UNIX_EPOCH);
        assert_eq!(instant, DateTime::<Utc>::from_timestamp(0, 0).unwrap());
    }

    #[test]
    fn filetime_below_epoch_is_sentinel() {
        let instant = filetime_to_instant(FILETIME_UNIX_EPOCH - 1);
        assert_eq!(instant, DateTime::<Utc>::from_timestamp(0, 0).unwrap());
    }

    #[test]
    fn decode_name_ascii_flag_forces_latin1() {
        // Even though this looks like it could be UTF-16LE, the ASCII flag wins.
        let data = b"A\0B\0";
        assert_eq!(decode_name(data, true), "A\u{0}B\u{0}");
    }

    #[test]
    fn decode_name_detects_utf16le() {
        let data: Vec<u8> = "Explorer".encode_utf16().flat_map(u16::to_le_bytes).collect();
        assert_eq!(decode_name(&data, false), "Explorer");
    }

    #[test]
    fn decode_name_odd_length_falls_back_to_latin1() {
        let data = b"abc";
        assert_eq!(decode_name(data, false), "abc");
    }

    #[test]
    fn decode_value_string_cuts_at_null_terminator() {
        let mut data: Vec<u8> = "hello".encode_utf16().flat_map(u16::to_le_bytes).collect();
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(&"garbage".encode_utf16().flat_map(u16::to_le_bytes).collect::<Vec<u8>>());
        assert_eq!(decode_value_string(&data), "hello");
    }

    #[test]
    fn decode_value_string_ascii_truncates_at_first_null() {
        let data = b"hi\0garbage";
        assert_eq!(decode_value_string(data), "hi");
    }
}
