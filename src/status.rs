//! A Status encapsulates the failure of an operation.  Success is the
//! `Ok` side of [`Result`]; every failure carries one of the variants
//! below.
//!
//! Configuration errors (unknown algorithm, unsupported version) and
//! field overflows are never worth retrying.  I/O errors from a sink are
//! passed through untouched so the caller can decide what to do.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Status {
    /// The hash algorithm id has no entry in the digest registry.
    #[error("unknown hash algorithm 0x{0:02X}")]
    UnknownAlgorithm(u8),

    #[error("unrecognised version 0x{0:X}")]
    UnsupportedVersion(u8),

    /// A value does not fit in its fixed-width header slot.
    #[error("{field} value {value} does not fit in its header slot")]
    FieldOverflow { field: &'static str, value: i128 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("corruption: {0}")]
    Corruption(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Status {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }

    /// Returns true iff the status indicates an IOError.
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Returns true iff the status indicates a Corruption error.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corruption(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::FieldOverflow { .. })
    }

    /// Returns true iff the status names something this format does not
    /// support (an algorithm id or a header version).
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::UnknownAlgorithm(_) | Self::UnsupportedVersion(_))
    }
}

pub type Result<T> = std::result::Result<T, Status>;
