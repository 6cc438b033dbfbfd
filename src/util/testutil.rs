use std::{cell::Cell, io};

use crate::{env::WritableFile, status::Result};

/// Build one marker segment: 0xFF, `marker`, big-endian length, payload.
pub(crate) fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut seg = vec![0xFF, marker];
    seg.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    seg.extend_from_slice(payload);
    seg
}

/// A small but structurally complete JPEG whose start-of-frame segment
/// uses `sof_marker` and carries `width` x `height`.
pub(crate) fn jpeg_with_sof(sof_marker: u8, width: u16, height: u16) -> Vec<u8> {
    let mut jpeg = vec![0xFF, 0xD8];
    jpeg.extend(segment(0xE0, b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0"));
    jpeg.extend(segment(0xDB, &[0u8; 65]));

    let mut sof = vec![8];
    sof.extend_from_slice(&height.to_be_bytes());
    sof.extend_from_slice(&width.to_be_bytes());
    sof.extend_from_slice(&[3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);
    jpeg.extend(segment(sof_marker, &sof));

    jpeg.extend(segment(0xC4, &[0u8; 29]));
    jpeg.extend(segment(0xDA, &[3, 1, 0, 2, 0x11, 3, 0x11, 0, 0x3F, 0]));
    jpeg.extend_from_slice(&[0x12, 0x34, 0xFF, 0x00, 0x56]);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

/// A sink whose appends start failing once `ok_appends` calls succeeded.
pub(crate) struct ErrorFile {
    ok_appends: Cell<usize>,
    pub(crate) appends: Cell<usize>,
}

impl ErrorFile {
    pub(crate) fn new(ok_appends: usize) -> Self {
        Self { ok_appends: Cell::new(ok_appends), appends: Cell::new(0) }
    }
}

impl WritableFile for ErrorFile {
    fn append(&self, _data: &[u8]) -> Result<()> {
        if self.ok_appends.get() == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "injected append failure").into());
        }
        self.ok_appends.set(self.ok_appends.get() - 1);
        self.appends.set(self.appends.get() + 1);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }
}
