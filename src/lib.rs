//! Append-only storage for sequential media frames.
//!
//! Frames go verbatim into a data file while a companion metadata file
//! records, per frame, its offset in the data file and a digest of its
//! bytes.  See [`storage`] for the file layout.

pub mod digest;
pub mod env;
pub mod jpeg;
pub mod options;
pub mod status;
pub mod storage;
mod util;

pub use options::Options;
pub use status::{Result, Status};
