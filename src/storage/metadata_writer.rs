use std::rc::Rc;

use log::{debug, trace};

use crate::{
    digest::{self, DigestAlgorithm},
    env::WritableFile,
    options::Options,
    status::Result,
};

use super::metadata_format::{encode_record, record_size, MetadataHeader, HEADER_SIZE};

/// Appends frames to a data file while recording, for every frame, its
/// offset and digest in a companion metadata file.
///
/// The header goes out with the first frame, exactly once.  Record `i` in
/// the metadata file always describes frame `i` in the data file.
///
/// A writer is driven by one thread only.  The metadata record is flushed
/// before the frame bytes are written, so a crash between the two leaves a
/// trailing record whose frame is missing or short in the data file; the
/// reader classifies such a record as truncated.
pub struct MetadataWriter {
    data: Rc<dyn WritableFile>,
    metadata: Rc<dyn WritableFile>,
    header: MetadataHeader,
    encoded_header: [u8; HEADER_SIZE],
    algorithm: &'static DigestAlgorithm,
    sync: bool,
    header_written: bool,
    file_bytes: u64, // Cumulative bytes written to the data file
    frames_written: u64,
}

impl MetadataWriter {
    /// Create a writer that will append frames to `data` and their records
    /// to `metadata`.  Both files are expected to be empty.
    ///
    /// Fails without writing anything if the header names an unknown hash
    /// algorithm or an unsupported version.
    pub fn new(data: Rc<dyn WritableFile>, metadata: Rc<dyn WritableFile>, header: MetadataHeader) -> Result<Self> {
        Self::with_options(data, metadata, header, &Options::default())
    }

    /// Like `new`; `options.sync` decides whether frames are synced to
    /// stable storage.  The hash algorithm always comes from the header.
    pub fn with_options(
        data: Rc<dyn WritableFile>,
        metadata: Rc<dyn WritableFile>,
        header: MetadataHeader,
        options: &Options,
    ) -> Result<Self> {
        let algorithm = digest::lookup(header.hash())?;
        let encoded_header = header.encode()?;
        debug!(
            "opened metadata writer: stream type {}, {} digests, start time {}",
            header.stream_type(),
            algorithm.name(),
            header.start_time()
        );
        Ok(Self {
            data,
            metadata,
            header,
            encoded_header,
            algorithm,
            sync: options.sync,
            header_written: false,
            file_bytes: 0,
            frames_written: 0,
        })
    }

    /// Append one frame.  I/O errors from either file are returned as is
    /// and nothing is retried.
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        if !self.header_written {
            self.metadata.append(&self.encoded_header)?;
            self.header_written = true;
            debug!("wrote metadata header ({} bytes)", HEADER_SIZE);
        }

        let record = encode_record(self.file_bytes, &self.algorithm.digest(frame));
        self.metadata.append(&record)?;
        self.finish(&self.metadata)?;

        self.data.append(frame)?;
        self.finish(&self.data)?;

        trace!("frame {} at offset {}, {} bytes", self.frames_written, self.file_bytes, frame.len());
        self.file_bytes += frame.len() as u64;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&self, file: &Rc<dyn WritableFile>) -> Result<()> {
        file.flush()?;
        if self.sync {
            file.sync()?;
        }
        Ok(())
    }

    pub fn header(&self) -> &MetadataHeader {
        &self.header
    }

    /// Bytes written to the data file so far; also the offset the next
    /// frame will be recorded at.
    pub fn file_bytes(&self) -> u64 {
        self.file_bytes
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    /// Size of each frame record in the metadata file.
    pub fn record_size(&self) -> usize {
        record_size(self.algorithm.length())
    }
}
