//! Recording a stream of MJPEG images into a data/metadata file pair.
//!
//! Where the files live and when a new pair is started is decided by a
//! [`FilePairProvider`]; the recorder only asks it for a pair when it
//! opens its session.

use std::{
    rc::Rc,
    time::{SystemTime, UNIX_EPOCH},
};

use log::{debug, warn};

use crate::{
    digest,
    env::WritableFile,
    jpeg,
    options::Options,
    status::Result,
};

use super::{
    metadata_format::{MetadataHeader, MjpegTypeHeader},
    metadata_writer::MetadataWriter,
};

/// Freshly opened, empty sinks for one session.
pub struct FilePair {
    pub data: Rc<dyn WritableFile>,
    pub metadata: Rc<dyn WritableFile>,
}

/// Supplies the file pair for a new recording session.
pub trait FilePairProvider {
    fn open_pair(&mut self, source_name: &str, start_time: u64) -> Result<FilePair>;
}

impl<F> FilePairProvider for F
where
    F: FnMut(&str, u64) -> Result<FilePair>,
{
    fn open_pair(&mut self, source_name: &str, start_time: u64) -> Result<FilePair> {
        self(source_name, start_time)
    }
}

pub struct VideoRecorder<P> {
    source_name: String,
    options: Options,
    provider: P,
    writer: Option<MetadataWriter>,
}

impl<P: FilePairProvider> VideoRecorder<P> {
    pub fn new(source_name: impl Into<String>, options: Options, provider: P) -> Self {
        Self { source_name: source_name.into(), options, provider, writer: None }
    }

    /// Record one JPEG image.  A negative width or height is read from the
    /// image itself; a non-negative one is recorded as given.
    pub fn write_image(&mut self, jpeg: &[u8], width: i32, height: i32) -> Result<()> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
        self.write_image_at(jpeg, width, height, now)
    }

    /// Like `write_image` with an explicit timestamp, used as the session
    /// start time if this image opens the session.
    pub fn write_image_at(&mut self, jpeg: &[u8], width: i32, height: i32, now: u64) -> Result<()> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => self.open_session(jpeg, width, height, now)?,
        };
        self.writer.insert(writer).write_frame(jpeg)
    }

    // The header is final once built, so the first image decides the
    // dimensions recorded for the whole session.
    fn open_session(&mut self, jpeg: &[u8], width: i32, height: i32, now: u64) -> Result<MetadataWriter> {
        digest::lookup(self.options.hash_algorithm)?;

        let (width, height) = if width < 0 || height < 0 {
            let (w, h) = jpeg::sniff(jpeg);
            if jpeg::is_undecodable((w, h)) {
                warn!("{}: could not read image dimensions, recording them as unknown", self.source_name);
            }
            let pick = |given: i32, sniffed: u16| if given < 0 { i32::from(sniffed) } else { given };
            (pick(width, w), pick(height, h))
        } else {
            (width, height)
        };
        let type_header = MjpegTypeHeader::try_new(width, height, self.options.frame_rate)?;

        let header = MetadataHeader::builder()
            .hash(self.options.hash_algorithm)
            .start_time(now)
            .source_name(&self.source_name)
            .mjpeg(type_header)
            .build()?;

        let pair = self.provider.open_pair(&self.source_name, now)?;
        debug!(
            "{}: recording {}x{} MJPEG starting at {}",
            self.source_name, type_header.horizontal_size, type_header.vertical_size, now
        );
        MetadataWriter::with_options(pair.data, pair.metadata, header, &self.options)
    }

    /// The open session, if any image has been recorded.
    pub fn writer(&self) -> Option<&MetadataWriter> {
        self.writer.as_ref()
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }
}
