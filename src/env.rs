//! An Env is the interface this crate uses to reach the filesystem.
//! Writers never open files themselves: a caller (or the naming and
//! rotation policy sitting above this crate) hands them already-open
//! sinks, and an Env is one way to obtain those sinks.
//!
//! Sinks are shared through `Rc`, so a writer session can never leave the
//! thread that created it.

use std::{
    cell::RefCell,
    fs::{File, OpenOptions},
    io::{Read, Write},
    path::Path,
    rc::Rc,
};

use crate::status::Result;

pub trait Env {
    /// Open `fname` for appending, creating it if it does not exist.
    /// Existing contents are never truncated.
    ///
    /// The returned file will only be accessed by one thread at a time.
    fn new_appendable_file(&self, fname: &Path) -> Result<Rc<dyn WritableFile>>;

    /// Read the whole of `fname` into memory.
    fn read_file(&self, fname: &Path) -> Result<Vec<u8>>;

    /// Returns the size of `fname` in bytes.
    fn file_size(&self, fname: &Path) -> Result<u64>;

    /// Returns true iff the named file exists.
    fn file_exists(&self, fname: &Path) -> bool;
}

/// A file abstraction for sequential, append-only writing.
///
/// `flush` hands buffered bytes to the operating system; `sync` also asks
/// the operating system to make them durable.
pub trait WritableFile {
    fn append(&self, data: &[u8]) -> Result<()>;
    fn flush(&self) -> Result<()>;
    fn sync(&self) -> Result<()>;
}

/// Env backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixEnv;

impl Env for PosixEnv {
    fn new_appendable_file(&self, fname: &Path) -> Result<Rc<dyn WritableFile>> {
        let file = OpenOptions::new().create(true).append(true).open(fname)?;
        Ok(Rc::new(PosixWritableFile { file: RefCell::new(file) }))
    }

    fn read_file(&self, fname: &Path) -> Result<Vec<u8>> {
        let mut contents = Vec::new();
        File::open(fname)?.read_to_end(&mut contents)?;
        Ok(contents)
    }

    fn file_size(&self, fname: &Path) -> Result<u64> {
        Ok(std::fs::metadata(fname)?.len())
    }

    fn file_exists(&self, fname: &Path) -> bool {
        fname.exists()
    }
}

struct PosixWritableFile {
    file: RefCell<File>,
}

impl WritableFile for PosixWritableFile {
    fn append(&self, data: &[u8]) -> Result<()> {
        self.file.borrow_mut().write_all(data)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.file.borrow_mut().flush()?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.file.borrow().sync_data()?;
        Ok(())
    }
}

/// An appendable in-memory file.
#[derive(Debug, Default)]
pub struct MemFile {
    contents: RefCell<Vec<u8>>,
}

impl MemFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything appended so far.
    pub fn contents(&self) -> Vec<u8> {
        self.contents.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.contents.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.borrow().is_empty()
    }
}

impl WritableFile for MemFile {
    fn append(&self, data: &[u8]) -> Result<()> {
        self.contents.borrow_mut().extend_from_slice(data);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }
}
