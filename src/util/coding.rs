//! Fixed-width integer coding used by the header and metadata records.
//! Every multi-byte number on disk is stored most-significant byte first.

use std::io::Write;

pub(crate) fn put_fixed16(dst: &mut Vec<u8>, value: u16) {
    let _ = dst.write_all(&encode_fixed16(value));
}

pub(crate) fn put_fixed64(dst: &mut Vec<u8>, value: u64) {
    let _ = dst.write_all(&encode_fixed64(value));
}

#[inline]
pub(crate) fn encode_fixed16(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

#[inline]
pub(crate) fn encode_fixed64(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Decode a u16 from the first two bytes of `bytes`.
/// REQUIRES: bytes.len() >= 2
#[inline]
pub(crate) fn decode_fixed16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

/// Decode a u64 from the first eight bytes of `bytes`.
/// REQUIRES: bytes.len() >= 8
#[inline]
pub(crate) fn decode_fixed64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(buf)
}

/// Like `decode_fixed16` but returns None when fewer than two bytes
/// remain at `idx`.
#[inline]
pub(crate) fn get_fixed16(bytes: &[u8], idx: usize) -> Option<u16> {
    let end = idx.checked_add(2)?;
    bytes.get(idx..end).map(decode_fixed16)
}
