//! The paired data/metadata file format: header codec, append writer,
//! reader and the MJPEG recorder built on top of them.

pub mod metadata_format;
pub mod metadata_reader;
pub mod metadata_writer;
pub mod video;

pub use metadata_format::{MetadataHeader, MetadataHeaderBuilder, MjpegTypeHeader, TypeHeader};
pub use metadata_reader::{FrameRecord, FrameStatus, MetadataFile, VerifyReport};
pub use metadata_writer::MetadataWriter;
pub use video::{FilePair, FilePairProvider, VideoRecorder};
