//! Core of the virtual filesystem layer.
//!
//! Everything file-facing goes through this crate: a raw string enters
//! the normalization facade ([`Vfs::normalize`]), comes out as an
//! absolute [`vfs_uri::Reference`], the reference's scheme selects a
//! [`Backend`] in the [`Registry`], and the backend executes the
//! operation against the reference's path and authority. Callers never
//! see a concrete backend type.
//!
//! The core performs no retries and imposes no timeouts; backend calls
//! are treated as potentially blocking and backend errors propagate
//! unchanged. [`VfsError::Unsupported`] and [`VfsError::UnknownScheme`]
//! are deliberately distinct variants: the latter is a hint that a
//! plugin providing the scheme may still be loadable, the former means
//! this backend will never perform the operation.

use std::io;

use thiserror::Error;

mod backend;
mod file;
mod registry;
mod vfs;

pub use backend::{read_prefix, Backend, Metadata, MetadataCapable, MmapCapable};
pub use file::{OpenMode, Upcastable, VfsFile};
pub use registry::Registry;
pub use vfs::Vfs;

/// Error type for all filesystem-facing operations.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum VfsError {
    /// The input string could not be parsed as a reference.
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    /// No backend is registered for the scheme. Callers may attempt a
    /// plugin-driven late registration and retry.
    #[error("no filesystem registered for scheme '{0}'")]
    UnknownScheme(String),
    /// The referenced resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The backend declines this operation by capability.
    #[error("operation not supported by this filesystem: {0}")]
    Unsupported(&'static str),
    /// A folder operation was applied to a non-folder.
    #[error("not a directory: {0}")]
    NotADirectory(String),
    /// A file operation was applied to a non-file.
    #[error("not a file: {0}")]
    NotAFile(String),
    /// Creation failed because the resource already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// Transport or host failure underneath the backend. Retryable only
    /// if the caller explicitly retries.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl VfsError {
    /// Map an I/O error to the taxonomy, attaching the resource text.
    pub fn from_io(err: io::Error, what: impl std::fmt::Display) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => VfsError::NotFound(what.to_string()),
            io::ErrorKind::AlreadyExists => VfsError::AlreadyExists(what.to_string()),
            _ => VfsError::BackendUnavailable(format!("{what}: {err}")),
        }
    }
}

impl From<vfs_uri::UriError> for VfsError {
    fn from(err: vfs_uri::UriError) -> Self {
        VfsError::InvalidReference(err.to_string())
    }
}

pub type VfsResult<T> = Result<T, VfsError>;
