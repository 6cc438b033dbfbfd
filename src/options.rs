use crate::digest;

/// Options to control the behavior of a writer session and of the video
/// recorder (passed to `MetadataWriter::with_options` and
/// `VideoRecorder::new`).
#[derive(Debug, Clone)]
pub struct Options {
    /// Id of the digest algorithm used for per-frame records.  Must be
    /// registered in the digest registry or opening a session fails.
    /// Default: SHA-1
    pub hash_algorithm: u8,

    /// If true, both files are synced to stable storage after every frame,
    /// not just flushed.
    /// Default: false
    pub sync: bool,

    /// Frame rate recorded in the MJPEG sub-header.
    /// Default: 0 (unknown)
    pub frame_rate: u16,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            hash_algorithm: digest::SHA1,
            sync: false,
            frame_rate: 0,
        }
    }
}
