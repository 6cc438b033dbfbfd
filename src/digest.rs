//! The digest registry maps the one-byte hash algorithm id stored in a
//! metadata header to a hash function and its output length.
//!
//! The table is built once on first use and is read-only afterwards, so
//! it may be consulted from any number of threads.  Ids form a closed,
//! versioned set: adding an algorithm means adding an entry here and
//! bumping the format version, never reusing an id.

use std::fmt;

use once_cell::sync::Lazy;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::status::{Result, Status};

pub const SHA1: u8 = 0x00;
pub const SHA224: u8 = 0x01;
pub const SHA256: u8 = 0x02;
pub const SHA384: u8 = 0x03;
pub const SHA512: u8 = 0x04;

/// Describes one registered hash algorithm.
pub struct DigestAlgorithm {
    id: u8,
    name: &'static str,
    compute: fn(&[u8]) -> Vec<u8>,
    length: usize,
}

impl DigestAlgorithm {
    fn new<D: Digest>(id: u8, name: &'static str) -> Self {
        Self {
            id,
            name,
            compute: digest_with::<D>,
            length: <D as Digest>::output_size(),
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    /// Display name, e.g. "SHA-256".
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of bytes every digest of this algorithm occupies.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Hash `data`.  The result is always exactly `length()` bytes.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        (self.compute)(data)
    }
}

impl fmt::Debug for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestAlgorithm")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("length", &self.length)
            .finish()
    }
}

fn digest_with<D: Digest>(data: &[u8]) -> Vec<u8> {
    D::digest(data).to_vec()
}

static DIGEST_ALGORITHMS: Lazy<[DigestAlgorithm; 5]> = Lazy::new(|| {
    [
        DigestAlgorithm::new::<Sha1>(SHA1, "SHA-1"),
        DigestAlgorithm::new::<Sha224>(SHA224, "SHA-224"),
        DigestAlgorithm::new::<Sha256>(SHA256, "SHA-256"),
        DigestAlgorithm::new::<Sha384>(SHA384, "SHA-384"),
        DigestAlgorithm::new::<Sha512>(SHA512, "SHA-512"),
    ]
});

/// Return the algorithm registered under `id`.
pub fn lookup(id: u8) -> Result<&'static DigestAlgorithm> {
    DIGEST_ALGORITHMS
        .iter()
        .find(|a| a.id == id)
        .ok_or(Status::UnknownAlgorithm(id))
}

/// All registered algorithms, ordered by id.
pub fn algorithms() -> &'static [DigestAlgorithm] {
    &DIGEST_ALGORITHMS[..]
}
