//! Backend capability contract.
//!
//! Every backend receives fully-resolved absolute [`Reference`]s, never
//! raw strings. An operation a backend cannot honor is declined with
//! [`VfsError::Unsupported`]; the write-side operations default to
//! exactly that so read-only backends implement nothing they do not
//! have.
//!
//! Optional capabilities are modeled as explicit hook methods returning
//! capability trait objects ([`Backend::as_metadata`],
//! [`Backend::as_mmap`]) rather than any name-based probing.

use std::fmt;
use std::io::Read;
use std::time::SystemTime;

use vfs_uri::Reference;

use crate::file::{OpenMode, VfsFile};
use crate::{VfsError, VfsResult};

/// Resource metadata as assembled for format loaders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub mimetype: String,
    pub description: String,
    pub mtime: SystemTime,
    pub size: u64,
}

/// A filesystem implementation registered under a URI scheme.
pub trait Backend: fmt::Debug + Send + Sync {
    fn exists(&self, reference: &Reference) -> VfsResult<bool>;
    fn is_file(&self, reference: &Reference) -> VfsResult<bool>;
    fn is_folder(&self, reference: &Reference) -> VfsResult<bool>;
    fn can_read(&self, reference: &Reference) -> VfsResult<bool>;
    fn can_write(&self, reference: &Reference) -> VfsResult<bool>;
    fn get_size(&self, reference: &Reference) -> VfsResult<u64>;
    fn get_mtime(&self, reference: &Reference) -> VfsResult<SystemTime>;
    fn get_mimetype(&self, reference: &Reference) -> VfsResult<String>;
    fn open(&self, reference: &Reference, mode: OpenMode) -> VfsResult<Box<dyn VfsFile>>;

    /// Names of the direct children of a folder.
    ///
    /// Fails with [`VfsError::NotADirectory`] when the reference does
    /// not name a folder.
    fn get_names(&self, reference: &Reference) -> VfsResult<Vec<String>>;

    /// Open an existing file for writing, truncating it.
    fn open_write(&self, _reference: &Reference) -> VfsResult<Box<dyn VfsFile>> {
        Err(VfsError::Unsupported("open_write"))
    }

    /// Create a new file and return a writable handle.
    fn make_file(&self, _reference: &Reference) -> VfsResult<Box<dyn VfsFile>> {
        Err(VfsError::Unsupported("make_file"))
    }

    fn make_folder(&self, _reference: &Reference) -> VfsResult<()> {
        Err(VfsError::Unsupported("make_folder"))
    }

    fn remove(&self, _reference: &Reference) -> VfsResult<()> {
        Err(VfsError::Unsupported("remove"))
    }

    fn move_to(&self, _source: &Reference, _target: &Reference) -> VfsResult<()> {
        Err(VfsError::Unsupported("move"))
    }

    /// Full-metadata capability, when the backend offers one.
    fn as_metadata(&self) -> Option<&dyn MetadataCapable> {
        None
    }

    /// Memory-mapped access capability, when the backend offers one.
    fn as_mmap(&self) -> Option<&dyn MmapCapable> {
        None
    }
}

/// Backends that can produce a [`Metadata`] record in one call.
pub trait MetadataCapable {
    fn get_metadata(&self, reference: &Reference) -> VfsResult<Metadata>;
}

/// Backends that can hand out a memory-mapped (or otherwise zero-copy)
/// byte view of a resource.
pub trait MmapCapable {
    fn open_mmap(&self, reference: &Reference) -> VfsResult<Box<dyn AsRef<[u8]> + Send + Sync>>;
}

/// Read a bounded prefix of a resource, for identify-by-signature
/// probes layered above this core. Returns fewer bytes when the
/// resource is shorter than `max_len`.
pub fn read_prefix(
    backend: &dyn Backend,
    reference: &Reference,
    max_len: usize,
) -> VfsResult<Vec<u8>> {
    let file = backend.open(reference, OpenMode::READ)?;
    let mut buf = Vec::with_capacity(max_len);
    file.take(max_len as u64)
        .read_to_end(&mut buf)
        .map_err(|err| VfsError::from_io(err, reference))?;
    Ok(buf)
}
