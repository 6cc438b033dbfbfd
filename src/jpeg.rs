//! Reads the width and height of a JPEG frame by walking its marker
//! segments, without decoding any pixel data.
//!
//! The walk never fails: anything it cannot make sense of yields the
//! sentinel pair `(UNDECODABLE, UNDECODABLE)` so a single bad frame never
//! blocks ingestion.

use crate::util::coding::get_fixed16;

/// Dimension value meaning "could not be determined".
pub const UNDECODABLE: u16 = 0xFFFF;

const MARKER_PREFIX: u8 = 0xFF;

// Baseline, extended sequential, progressive and lossless.
const START_OF_FRAME_MARKERS: [u16; 4] = [0xFFC0, 0xFFC1, 0xFFC2, 0xFFC3];

const END_OF_IMAGE: u16 = 0xFFD9;

// Start-of-frame segment after the marker: length (2), precision (1),
// height (2), width (2).
const SOF_HEIGHT_OFFSET: usize = 2 + 2 + 1;
const SOF_WIDTH_OFFSET: usize = SOF_HEIGHT_OFFSET + 2;

/// Return `(width, height)` of the JPEG encoded in `bytes`, or
/// `(UNDECODABLE, UNDECODABLE)` if no start-of-frame segment can be found.
///
/// Bytes between segments that are not a marker are skipped up to the next
/// `0xFF`.
pub fn sniff(bytes: &[u8]) -> (u16, u16) {
    // Skip the start-of-image marker.
    let mut pos = 2;
    while pos < bytes.len() {
        if bytes[pos] != MARKER_PREFIX {
            match bytes[pos..].iter().position(|b| *b == MARKER_PREFIX) {
                Some(skip) => pos += skip,
                None => break,
            }
        }
        let marker = match get_fixed16(bytes, pos) {
            Some(m) => m,
            None => break,
        };
        match marker {
            // Fill byte before a marker.
            0xFFFF => {
                pos += 1;
                continue;
            }
            END_OF_IMAGE => break,
            // Stuffed zero, TEM, restart markers and SOI carry no length.
            0xFF00 | 0xFF01 | 0xFFD0..=0xFFD8 => {
                pos += 2;
                continue;
            }
            _ => {}
        }

        if START_OF_FRAME_MARKERS.contains(&marker) {
            let height = get_fixed16(bytes, pos + SOF_HEIGHT_OFFSET);
            let width = get_fixed16(bytes, pos + SOF_WIDTH_OFFSET);
            return match (width, height) {
                (Some(w), Some(h)) => (w, h),
                _ => undecodable(),
            };
        }

        // The length counts itself but not the marker.
        let length = match get_fixed16(bytes, pos + 2) {
            Some(l) if l >= 2 => l as usize,
            _ => break,
        };
        pos += 2 + length;
    }
    undecodable()
}

/// Returns true iff `dimensions` is the sentinel pair.
pub fn is_undecodable(dimensions: (u16, u16)) -> bool {
    dimensions == undecodable()
}

#[inline]
fn undecodable() -> (u16, u16) {
    (UNDECODABLE, UNDECODABLE)
}
