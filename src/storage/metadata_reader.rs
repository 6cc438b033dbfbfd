//! Reading a metadata file back: locating frames in the data file and
//! checking them against their recorded digests.
//!
//! The data file is the ground truth.  A record whose frame is not
//! entirely inside the data file, or whose digest fails on the last frame,
//! is the trace of a write interrupted between the metadata record and the
//! frame bytes; it is reported as truncated and must not be trusted.

use std::{ops::Range, path::Path};

use log::warn;

use crate::{
    digest::{self, DigestAlgorithm},
    env::Env,
    status::{Result, Status},
    util::coding::decode_fixed64,
};

use super::metadata_format::{record_size, MetadataHeader, HEADER_SIZE, OFFSET_SIZE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    /// Position of the frame's first byte in the data file.
    pub offset: u64,
    pub digest: Vec<u8>,
}

/// A decoded metadata file.
#[derive(Debug)]
pub struct MetadataFile {
    header: MetadataHeader,
    algorithm: &'static DigestAlgorithm,
    records: Vec<FrameRecord>,
}

impl MetadataFile {
    /// Decode the full contents of a metadata file.
    ///
    /// A partial record at the end (a torn append) is dropped.  Offsets
    /// that go backwards are reported as corruption.
    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() < HEADER_SIZE {
            return Err(Status::corruption(format!(
                "metadata file too short for its header: {} bytes",
                src.len()
            )));
        }
        let header = MetadataHeader::decode(&src[..HEADER_SIZE])?;
        let algorithm = digest::lookup(header.hash())?;

        let body = &src[HEADER_SIZE..];
        let chunks = body.chunks_exact(record_size(algorithm.length()));
        if !chunks.remainder().is_empty() {
            warn!("dropping torn trailing metadata record ({} bytes)", chunks.remainder().len());
        }

        let mut records: Vec<FrameRecord> = Vec::with_capacity(body.len() / record_size(algorithm.length()));
        for chunk in chunks {
            let offset = decode_fixed64(chunk);
            if let Some(prev) = records.last() {
                if offset < prev.offset {
                    return Err(Status::corruption(format!(
                        "frame {} offset {} precedes previous offset {}",
                        records.len(),
                        offset,
                        prev.offset
                    )));
                }
            }
            records.push(FrameRecord { offset, digest: chunk[OFFSET_SIZE..].to_vec() });
        }

        Ok(Self { header, algorithm, records })
    }

    /// Read and decode the metadata file at `fname`.
    pub fn open(env: &dyn Env, fname: &Path) -> Result<Self> {
        Self::decode(&env.read_file(fname)?)
    }

    /// Open the metadata file at `meta_fname` and verify it against the
    /// data file at `data_fname`.  A missing data file holds no frames.
    pub fn verify_files(env: &dyn Env, meta_fname: &Path, data_fname: &Path) -> Result<(Self, VerifyReport)> {
        let file = Self::open(env, meta_fname)?;
        let data = if env.file_exists(data_fname) {
            env.read_file(data_fname)?
        } else {
            warn!("data file {} is missing", data_fname.display());
            Vec::new()
        };
        let report = file.verify(&data);
        Ok((file, report))
    }

    /// Number of leading frames whose bytes all lie inside the data file at
    /// `data_fname`, judged from its size alone.  Digests are not checked,
    /// so a short last frame is only caught by [`MetadataFile::verify`].
    pub fn present_frames(&self, env: &dyn Env, data_fname: &Path) -> Result<usize> {
        let data_len = if env.file_exists(data_fname) { env.file_size(data_fname)? } else { 0 };
        Ok((0..self.records.len()).take_while(|i| self.frame_range(*i, data_len).is_some()).count())
    }

    pub fn header(&self) -> &MetadataHeader {
        &self.header
    }

    pub fn algorithm(&self) -> &'static DigestAlgorithm {
        self.algorithm
    }

    pub fn records(&self) -> &[FrameRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Byte range of frame `index` within a data file of `data_len` bytes.
    ///
    /// A frame ends where the next one starts; the last frame ends at the
    /// end of the data file.  Returns None if the frame does not lie
    /// entirely inside the data file.
    pub fn frame_range(&self, index: usize, data_len: u64) -> Option<Range<u64>> {
        let start = self.records.get(index)?.offset;
        let end = self.records.get(index + 1).map_or(data_len, |r| r.offset);
        if start > end || end > data_len {
            return None;
        }
        Some(start..end)
    }

    /// The bytes of frame `index` in `data`, if the frame is present.
    pub fn frame<'a>(&self, index: usize, data: &'a [u8]) -> Option<&'a [u8]> {
        let range = self.frame_range(index, data.len() as u64)?;
        data.get(range.start as usize..range.end as usize)
    }

    /// Check every frame in `data` against its recorded digest.
    pub fn verify(&self, data: &[u8]) -> VerifyReport {
        let last = self.records.len().saturating_sub(1);
        let statuses = self
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let status = match self.frame(i, data) {
                    None => FrameStatus::Truncated,
                    Some(frame) if self.algorithm.digest(frame) == record.digest => FrameStatus::Ok,
                    Some(_) if i == last => FrameStatus::Truncated,
                    Some(_) => FrameStatus::DigestMismatch,
                };
                if status == FrameStatus::Truncated {
                    warn!("frame {} at offset {} is truncated", i, record.offset);
                }
                status
            })
            .collect();
        VerifyReport { statuses }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Ok,
    DigestMismatch,
    /// The frame's bytes are missing or incomplete in the data file.
    Truncated,
}

/// Outcome of [`MetadataFile::verify`], one status per record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    statuses: Vec<FrameStatus>,
}

impl VerifyReport {
    pub fn statuses(&self) -> &[FrameStatus] {
        &self.statuses
    }

    /// Number of leading frames that verified; a recovering reader should
    /// trust exactly these.
    pub fn valid_frames(&self) -> usize {
        self.statuses.iter().take_while(|s| **s == FrameStatus::Ok).count()
    }

    /// Returns true iff every frame verified.
    pub fn is_clean(&self) -> bool {
        self.valid_frames() == self.statuses.len()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::{
        env::{MemFile, PosixEnv, WritableFile},
        storage::{metadata_format::MjpegTypeHeader, metadata_writer::MetadataWriter},
    };

    fn header(hash: u8) -> MetadataHeader {
        MetadataHeader::builder()
            .hash(hash)
            .start_time(1_000_000u64)
            .source_name("camera-1")
            .mjpeg(MjpegTypeHeader::new(1024, 768, 25))
            .build()
            .unwrap()
    }

    fn write_frames(hash: u8, frames: &[&[u8]]) -> (Vec<u8>, Vec<u8>) {
        let data = Rc::new(MemFile::new());
        let metadata = Rc::new(MemFile::new());
        let mut writer = MetadataWriter::new(data.clone(), metadata.clone(), header(hash)).unwrap();
        for frame in frames {
            writer.write_frame(frame).unwrap();
        }
        (data.contents(), metadata.contents())
    }

    #[test]
    fn decode_test() {
        let frames: [&[u8]; 3] = [b"first", b"", b"third frame"];
        let (data, metadata) = write_frames(3, &frames);
        let file = MetadataFile::decode(&metadata).unwrap();
        assert_eq!(&header(3), file.header());
        assert_eq!("SHA-384", file.algorithm().name());
        assert_eq!(3, file.len());
        let offsets: Vec<u64> = file.records().iter().map(|r| r.offset).collect();
        assert_eq!(vec![0, 5, 5], offsets);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(Some(*frame), file.frame(i, &data));
        }
        assert_eq!(None, file.frame(3, &data));
        assert!(file.verify(&data).is_clean());
    }

    #[test]
    fn header_only_test() {
        let (_, metadata) = write_frames(0, &[]);
        assert!(metadata.is_empty());

        let encoded = header(0).encode().unwrap();
        let file = MetadataFile::decode(&encoded).unwrap();
        assert!(file.is_empty());
        assert!(file.verify(b"").is_clean());
        assert!(MetadataFile::decode(&encoded[..100]).unwrap_err().is_corruption());
    }

    #[test]
    fn torn_record_dropped_test() {
        let (_, metadata) = write_frames(0, &[b"one", b"two"]);
        let file = MetadataFile::decode(&metadata[..metadata.len() - 3]).unwrap();
        assert_eq!(1, file.len());
    }

    #[test]
    fn unknown_algorithm_test() {
        let mut encoded = header(0).encode().unwrap();
        encoded[2] = 0x64;
        assert!(MetadataFile::decode(&encoded).unwrap_err().is_not_supported());
    }

    #[test]
    fn decreasing_offsets_test() {
        let (_, mut metadata) = write_frames(0, &[b"one", b"two", b"three"]);
        let third = HEADER_SIZE + 2 * record_size(20);
        // Offsets 0, 3, 6 become 0, 3, 1.
        metadata[third + 7] = 1;
        assert!(MetadataFile::decode(&metadata).unwrap_err().is_corruption());

        // Offsets past the end of the data file still decode; verify()
        // is what rejects them.
        let (data, mut metadata) = write_frames(0, &[b"one", b"two", b"three"]);
        metadata[third..third + 8].copy_from_slice(&[0xff; 8]);
        let file = MetadataFile::decode(&metadata).unwrap();
        assert_eq!(FrameStatus::Truncated, file.verify(&data).statuses()[2]);
    }

    #[test]
    fn missing_tail_is_truncated_test() {
        let (data, metadata) = write_frames(0, &[b"one", b"two", b"three"]);
        let file = MetadataFile::decode(&metadata).unwrap();

        // Crash before the last frame's bytes reached the data file.
        let report = file.verify(&data[..6]);
        assert_eq!(&[FrameStatus::Ok, FrameStatus::Ok, FrameStatus::Truncated], report.statuses());
        assert_eq!(2, report.valid_frames());
        assert!(!report.is_clean());

        // Crash half way through the last frame.
        let report = file.verify(&data[..8]);
        assert_eq!(FrameStatus::Truncated, report.statuses()[2]);
        assert_eq!(2, report.valid_frames());

        // Data file shorter than an earlier frame.
        let report = file.verify(&data[..2]);
        assert_eq!(&[FrameStatus::Truncated; 3], report.statuses());
        assert_eq!(0, report.valid_frames());
        assert_eq!(None, file.frame_range(0, 2));
        assert_eq!(Some(3..6), file.frame_range(1, 11));
        assert_eq!(Some(6..11), file.frame_range(2, 11));
    }

    #[test]
    fn digest_mismatch_test() {
        let (mut data, metadata) = write_frames(2, &[b"one", b"two", b"three"]);
        let file = MetadataFile::decode(&metadata).unwrap();
        data[4] ^= 0x01;
        let report = file.verify(&data);
        assert_eq!(&[FrameStatus::Ok, FrameStatus::DigestMismatch, FrameStatus::Ok], report.statuses());
        assert_eq!(1, report.valid_frames());
    }

    #[test]
    fn posix_round_trip_test() {
        let dir = tempfile::tempdir().unwrap();
        let data_name = dir.path().join("12-00-00_video.mjpeg");
        let meta_name = dir.path().join("12-00-00_video.meta");
        let env = PosixEnv;
        {
            let data = env.new_appendable_file(&data_name).unwrap();
            let metadata = env.new_appendable_file(&meta_name).unwrap();
            let mut writer = MetadataWriter::new(data, metadata, header(4)).unwrap();
            writer.write_frame(b"Hello").unwrap();
            writer.write_frame(b"World").unwrap();
        }
        let file = MetadataFile::open(&env, &meta_name).unwrap();
        let data = env.read_file(&data_name).unwrap();
        assert_eq!(2, file.len());
        assert_eq!(Some(&b"World"[..]), file.frame(1, &data));
        assert!(file.verify(&data).is_clean());
        assert_eq!(
            (HEADER_SIZE + 2 * record_size(64)) as u64,
            env.file_size(&meta_name).unwrap()
        );
    }

    #[test]
    fn verify_files_test() {
        let dir = tempfile::tempdir().unwrap();
        let data_name = dir.path().join("video.mjpeg");
        let meta_name = dir.path().join("video.meta");
        let env = PosixEnv;
        let (data, metadata) = write_frames(0, &[b"one", b"two", b"three"]);
        env.new_appendable_file(&meta_name).unwrap().append(&metadata).unwrap();

        // No data file at all.
        let (file, report) = MetadataFile::verify_files(&env, &meta_name, &data_name).unwrap();
        assert_eq!(3, file.len());
        assert_eq!(&[FrameStatus::Truncated; 3], report.statuses());
        assert_eq!(0, file.present_frames(&env, &data_name).unwrap());

        // Crash half way through the second frame.
        env.new_appendable_file(&data_name).unwrap().append(&data[..5]).unwrap();
        let (file, report) = MetadataFile::verify_files(&env, &meta_name, &data_name).unwrap();
        assert_eq!(&[FrameStatus::Ok, FrameStatus::Truncated, FrameStatus::Truncated], report.statuses());
        assert_eq!(1, file.present_frames(&env, &data_name).unwrap());

        // Short last frame: the size looks complete, the digest does not.
        env.new_appendable_file(&data_name).unwrap().append(&data[5..8]).unwrap();
        let (file, report) = MetadataFile::verify_files(&env, &meta_name, &data_name).unwrap();
        assert_eq!(&[FrameStatus::Ok, FrameStatus::Ok, FrameStatus::Truncated], report.statuses());
        assert_eq!(3, file.present_frames(&env, &data_name).unwrap());

        env.new_appendable_file(&data_name).unwrap().append(&data[8..]).unwrap();
        let (file, report) = MetadataFile::verify_files(&env, &meta_name, &data_name).unwrap();
        assert!(report.is_clean());
        assert_eq!(3, file.present_frames(&env, &data_name).unwrap());

        // Missing metadata file is an error.
        let err = MetadataFile::verify_files(&env, &dir.path().join("none.meta"), &data_name).unwrap_err();
        assert!(err.is_io_error());
    }
}
