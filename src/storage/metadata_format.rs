//! Metadata file format shared by the writer and the reader.
//!
//! A metadata file is a 128 byte header followed by one record per frame:
//!
//! ```text
//! header:  version (1) | type (1) | hash (1) | reserved (5) | start time (8)
//!          | reserved (16) | source name (32) | type header (64)
//! record:  data file offset (8) | digest (digest length of `hash`)
//! ```
//!
//! All integers are big-endian.

use crate::{
    status::{Result, Status},
    util::coding::{decode_fixed16, decode_fixed64, encode_fixed64, put_fixed16, put_fixed64},
};

/// The only header version this crate reads or writes.
pub const VERSION: u8 = 0;

pub const HEADER_SIZE: usize = 128;
pub const TYPE_HEADER_SIZE: usize = 64;
pub const SOURCE_NAME_SIZE: usize = 32;

// Size of the data file offset leading every record.
pub(crate) const OFFSET_SIZE: usize = 8;

const START_TIME_OFFSET: usize = 8;
const SOURCE_NAME_OFFSET: usize = 32;
const TYPE_HEADER_OFFSET: usize = 64;

/// Stream type id of MJPEG video.
pub const STREAM_TYPE_MJPEG: u8 = 0;

/// Size in bytes of one frame record for a digest of `digest_length`.
#[inline]
pub fn record_size(digest_length: usize) -> usize {
    OFFSET_SIZE + digest_length
}

pub(crate) fn encode_record(offset: u64, digest: &[u8]) -> Vec<u8> {
    let mut record = Vec::with_capacity(record_size(digest.len()));
    put_fixed64(&mut record, offset);
    record.extend_from_slice(digest);
    record
}

fn check_width(field: &'static str, value: i128, max: u64) -> Result<u64> {
    match u64::try_from(value) {
        Ok(v) if v <= max => Ok(v),
        _ => Err(Status::FieldOverflow { field, value }),
    }
}

fn all_zero(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| *b == 0)
}

/// Type-specific header of an MJPEG stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MjpegTypeHeader {
    pub version: u8,
    pub horizontal_size: u16,
    pub vertical_size: u16,
    pub frame_rate: u16,
}

impl MjpegTypeHeader {
    pub const VERSION: u8 = 0;

    pub fn new(horizontal_size: u16, vertical_size: u16, frame_rate: u16) -> Self {
        Self { version: Self::VERSION, horizontal_size, vertical_size, frame_rate }
    }

    /// Like `new`, but each value is range-checked against its u16 slot.
    pub fn try_new(
        horizontal_size: impl Into<i128>,
        vertical_size: impl Into<i128>,
        frame_rate: impl Into<i128>,
    ) -> Result<Self> {
        let max = u16::MAX as u64;
        Ok(Self::new(
            check_width("horizontal_size", horizontal_size.into(), max)? as u16,
            check_width("vertical_size", vertical_size.into(), max)? as u16,
            check_width("frame_rate", frame_rate.into(), max)? as u16,
        ))
    }

    fn encode(&self) -> [u8; TYPE_HEADER_SIZE] {
        let mut dst = Vec::with_capacity(8);
        dst.push(self.version);
        dst.push(0);
        put_fixed16(&mut dst, self.horizontal_size);
        put_fixed16(&mut dst, self.vertical_size);
        put_fixed16(&mut dst, self.frame_rate);

        let mut out = [0u8; TYPE_HEADER_SIZE];
        out[..dst.len()].copy_from_slice(&dst);
        out
    }

    fn decode(src: &[u8; TYPE_HEADER_SIZE]) -> Result<Self> {
        if src[1] != 0 || !all_zero(&src[8..]) {
            return Err(Status::corruption("non-zero reserved bytes in MJPEG type header"));
        }
        Ok(Self {
            version: src[0],
            horizontal_size: decode_fixed16(&src[2..]),
            vertical_size: decode_fixed16(&src[4..]),
            frame_rate: decode_fixed16(&src[6..]),
        })
    }
}

/// The type-specific tail of a header, one variant per known stream type.
/// The variant decides the stream type written to the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeHeader {
    Mjpeg(MjpegTypeHeader),
    /// Raw bytes for a stream type this crate does not interpret.
    /// `stream_type` is never [`STREAM_TYPE_MJPEG`].
    Opaque { stream_type: u8, bytes: [u8; TYPE_HEADER_SIZE] },
}

impl TypeHeader {
    pub fn stream_type(&self) -> u8 {
        match self {
            Self::Mjpeg(_) => STREAM_TYPE_MJPEG,
            Self::Opaque { stream_type, .. } => *stream_type,
        }
    }

    pub fn encode(&self) -> [u8; TYPE_HEADER_SIZE] {
        match self {
            Self::Mjpeg(h) => h.encode(),
            Self::Opaque { bytes, .. } => *bytes,
        }
    }

    // Zero bytes under an uninterpreted stream type mean "no type header".
    fn decode(stream_type: u8, src: &[u8; TYPE_HEADER_SIZE]) -> Result<Option<Self>> {
        if stream_type == STREAM_TYPE_MJPEG {
            Ok(Some(Self::Mjpeg(MjpegTypeHeader::decode(src)?)))
        } else if all_zero(src) {
            Ok(None)
        } else {
            Ok(Some(Self::Opaque { stream_type, bytes: *src }))
        }
    }
}

/// The fixed-size header written once at the start of a metadata file.
///
/// A header is an immutable value: build it with [`MetadataHeader::builder`]
/// once every field is known, then hand it to a writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataHeader {
    version: u8,
    stream_type: u8,
    hash: u8,
    start_time: u64,
    source_name: Vec<u8>,
    type_header: Option<TypeHeader>,
}

impl MetadataHeader {
    pub fn builder() -> MetadataHeaderBuilder {
        MetadataHeaderBuilder::new()
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn stream_type(&self) -> u8 {
        self.stream_type
    }

    /// Digest registry id used for every frame record.
    pub fn hash(&self) -> u8 {
        self.hash
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    /// The source name as given.  Only the first 32 bytes are stored.
    pub fn source_name(&self) -> &[u8] {
        &self.source_name
    }

    pub fn type_header(&self) -> Option<&TypeHeader> {
        self.type_header.as_ref()
    }

    pub fn mjpeg(&self) -> Option<&MjpegTypeHeader> {
        match &self.type_header {
            Some(TypeHeader::Mjpeg(h)) => Some(h),
            _ => None,
        }
    }

    /// Encode the header into its on-disk form.
    ///
    /// Source names longer than 32 bytes are truncated; shorter ones are
    /// padded with zeros.  A missing type header is written as zeros.
    pub fn encode(&self) -> Result<[u8; HEADER_SIZE]> {
        if self.version != VERSION {
            return Err(Status::UnsupportedVersion(self.version));
        }
        let mut out = [0u8; HEADER_SIZE];
        out[0] = self.version;
        out[1] = self.stream_type;
        out[2] = self.hash;
        out[START_TIME_OFFSET..START_TIME_OFFSET + 8].copy_from_slice(&encode_fixed64(self.start_time));

        let name_len = self.source_name.len().min(SOURCE_NAME_SIZE);
        out[SOURCE_NAME_OFFSET..SOURCE_NAME_OFFSET + name_len]
            .copy_from_slice(&self.source_name[..name_len]);

        if let Some(type_header) = &self.type_header {
            out[TYPE_HEADER_OFFSET..].copy_from_slice(&type_header.encode());
        }
        Ok(out)
    }

    /// Decode a header from exactly 128 bytes.
    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() != HEADER_SIZE {
            return Err(Status::invalid_argument(format!(
                "metadata header must be {} bytes, got {}",
                HEADER_SIZE,
                src.len()
            )));
        }
        if src[0] != VERSION {
            return Err(Status::UnsupportedVersion(src[0]));
        }
        if !all_zero(&src[3..START_TIME_OFFSET]) || !all_zero(&src[16..SOURCE_NAME_OFFSET]) {
            return Err(Status::corruption("non-zero reserved bytes in metadata header"));
        }

        let name = &src[SOURCE_NAME_OFFSET..TYPE_HEADER_OFFSET];
        let name_len = name.iter().rposition(|b| *b != 0).map_or(0, |p| p + 1);

        let mut raw_type_header = [0u8; TYPE_HEADER_SIZE];
        raw_type_header.copy_from_slice(&src[TYPE_HEADER_OFFSET..]);
        let type_header = TypeHeader::decode(src[1], &raw_type_header)?;

        Ok(Self {
            version: src[0],
            stream_type: src[1],
            hash: src[2],
            start_time: decode_fixed64(&src[START_TIME_OFFSET..]),
            source_name: name[..name_len].to_vec(),
            type_header,
        })
    }
}

const UNSET: i128 = -1;

/// Collects header fields and checks that each fits its slot.
///
/// Fields left unset count as -1 and are rejected by `build`, except the
/// version, which defaults to [`VERSION`], and the stream type, which a
/// type header supplies.
///
/// `build` returns the header in the form `MetadataHeader::decode` reads
/// back: an MJPEG stream always carries an MJPEG type header (zeros if
/// none was given), an all-zero opaque type header is dropped, and
/// trailing NULs are trimmed from the source name.
#[derive(Debug, Clone)]
pub struct MetadataHeaderBuilder {
    version: i128,
    stream_type: i128,
    hash: i128,
    start_time: i128,
    source_name: Vec<u8>,
    type_header: Option<TypeHeader>,
}

impl MetadataHeaderBuilder {
    fn new() -> Self {
        Self {
            version: VERSION as i128,
            stream_type: UNSET,
            hash: UNSET,
            start_time: UNSET,
            source_name: Vec::new(),
            type_header: None,
        }
    }

    pub fn version(mut self, version: impl Into<i128>) -> Self {
        self.version = version.into();
        self
    }

    pub fn stream_type(mut self, stream_type: impl Into<i128>) -> Self {
        self.stream_type = stream_type.into();
        self
    }

    pub fn hash(mut self, hash: impl Into<i128>) -> Self {
        self.hash = hash.into();
        self
    }

    pub fn start_time(mut self, start_time: impl Into<i128>) -> Self {
        self.start_time = start_time.into();
        self
    }

    pub fn source_name(mut self, source_name: impl AsRef<[u8]>) -> Self {
        self.source_name = source_name.as_ref().to_vec();
        self
    }

    pub fn type_header(mut self, type_header: TypeHeader) -> Self {
        self.type_header = Some(type_header);
        self
    }

    /// Mark the stream as MJPEG video with the given type header.
    pub fn mjpeg(self, type_header: MjpegTypeHeader) -> Self {
        self.type_header(TypeHeader::Mjpeg(type_header))
    }

    pub fn build(mut self) -> Result<MetadataHeader> {
        let byte = u8::MAX as u64;
        let version = check_width("version", self.version, byte)? as u8;
        let stream_type = match &self.type_header {
            Some(type_header) if self.stream_type == UNSET => type_header.stream_type(),
            Some(type_header) => {
                let stream_type = check_width("type", self.stream_type, byte)? as u8;
                if stream_type != type_header.stream_type() {
                    return Err(Status::invalid_argument(format!(
                        "stream type {} contradicts a type header for stream type {}",
                        stream_type,
                        type_header.stream_type()
                    )));
                }
                stream_type
            }
            None => check_width("type", self.stream_type, byte)? as u8,
        };
        let hash = check_width("hash", self.hash, byte)? as u8;
        let start_time = check_width("start_time", self.start_time, u64::MAX)?;

        let type_header = match self.type_header {
            Some(TypeHeader::Opaque { stream_type: STREAM_TYPE_MJPEG, .. }) => {
                return Err(Status::invalid_argument("opaque type header cannot use the MJPEG stream type"));
            }
            Some(TypeHeader::Opaque { bytes, .. }) if all_zero(&bytes) => None,
            None if stream_type == STREAM_TYPE_MJPEG => Some(TypeHeader::Mjpeg(MjpegTypeHeader::new(0, 0, 0))),
            type_header => type_header,
        };

        let name_len = self.source_name.iter().rposition(|b| *b != 0).map_or(0, |p| p + 1);
        self.source_name.truncate(name_len);

        Ok(MetadataHeader {
            version,
            stream_type,
            hash,
            start_time,
            source_name: self.source_name,
            type_header,
        })
    }
}
