//! In-memory filesystem backend.
//!
//! Stores a flat map from canonical path text to nodes; folders may be
//! explicit entries or implied by a descendant. Handles share the file
//! buffer, so two open handles on the same file see each other's
//! writes.
//!
//! [`MemFs::read_only`] builds the variant used for synthetic content
//! (an `about:`-style scheme): seeded once, then every mutator is
//! declined.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;

use vfs_core::{Backend, OpenMode, VfsError, VfsFile, VfsResult};
use vfs_uri::Reference;

#[derive(Debug)]
struct FileNode {
    bytes: Vec<u8>,
    mtime: SystemTime,
}

#[derive(Debug, Clone)]
enum Node {
    File(Arc<RwLock<FileNode>>),
    Folder,
}

/// An in-memory [`Backend`].
#[derive(Debug, Default)]
pub struct MemFs {
    entries: RwLock<BTreeMap<String, Node>>,
    read_only: bool,
}

/// The canonical map key: segment names joined by `/`, no leading or
/// trailing slash. The empty key is the root folder.
fn key_of(reference: &Reference) -> String {
    reference
        .path
        .segments()
        .iter()
        .map(|segment| segment.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

fn new_file(bytes: Vec<u8>) -> Node {
    Node::File(Arc::new(RwLock::new(FileNode {
        bytes,
        mtime: SystemTime::now(),
    })))
}

impl MemFs {
    pub fn new() -> Self {
        MemFs::default()
    }

    /// A filesystem that refuses every mutation. Populate it with
    /// [`MemFs::seed`] before handing it out.
    pub fn read_only() -> Self {
        MemFs {
            entries: RwLock::new(BTreeMap::new()),
            read_only: true,
        }
    }

    /// Insert a file directly, bypassing the read-only gate. Builder
    /// style, for synthetic content.
    pub fn seed(self, name: &str, bytes: &[u8]) -> Self {
        let name = name.trim_matches('/').to_owned();
        self.entries.write().insert(name, new_file(bytes.to_vec()));
        self
    }

    fn node(&self, key: &str) -> Option<Node> {
        self.entries.read().get(key).cloned()
    }

    fn file_node(&self, reference: &Reference) -> VfsResult<Arc<RwLock<FileNode>>> {
        match self.node(&key_of(reference)) {
            Some(Node::File(node)) => Ok(node),
            Some(Node::Folder) => Err(VfsError::NotAFile(reference.to_string())),
            None => Err(VfsError::NotFound(reference.to_string())),
        }
    }

    fn folder_exists(&self, key: &str) -> bool {
        if key.is_empty() {
            return true;
        }
        let entries = self.entries.read();
        match entries.get(key) {
            Some(Node::Folder) => true,
            Some(Node::File(_)) => false,
            // Implied by a descendant.
            None => {
                let prefix = format!("{key}/");
                entries
                    .range(prefix.clone()..)
                    .next()
                    .is_some_and(|(child, _)| child.starts_with(&prefix))
            }
        }
    }

    /// Fails when a file sits on the would-be ancestor chain of `key`.
    fn check_ancestors(&self, key: &str, reference: &Reference) -> VfsResult<()> {
        let entries = self.entries.read();
        let mut at = 0;
        while let Some(slash) = key[at..].find('/') {
            let ancestor = &key[..at + slash];
            if let Some(Node::File(_)) = entries.get(ancestor) {
                return Err(VfsError::NotADirectory(reference.to_string()));
            }
            at += slash + 1;
        }
        Ok(())
    }

    fn require_writable(&self, op: &'static str) -> VfsResult<()> {
        if self.read_only {
            return Err(VfsError::Unsupported(op));
        }
        Ok(())
    }
}

impl Backend for MemFs {
    fn exists(&self, reference: &Reference) -> VfsResult<bool> {
        let key = key_of(reference);
        Ok(self.node(&key).is_some() || self.folder_exists(&key))
    }

    fn is_file(&self, reference: &Reference) -> VfsResult<bool> {
        Ok(matches!(self.node(&key_of(reference)), Some(Node::File(_))))
    }

    fn is_folder(&self, reference: &Reference) -> VfsResult<bool> {
        Ok(self.folder_exists(&key_of(reference)))
    }

    fn can_read(&self, reference: &Reference) -> VfsResult<bool> {
        self.exists(reference)
    }

    fn can_write(&self, reference: &Reference) -> VfsResult<bool> {
        Ok(!self.read_only && self.exists(reference)?)
    }

    fn get_size(&self, reference: &Reference) -> VfsResult<u64> {
        let node = self.file_node(reference)?;
        let len = node.read().bytes.len();
        Ok(len as u64)
    }

    fn get_mtime(&self, reference: &Reference) -> VfsResult<SystemTime> {
        let node = self.file_node(reference)?;
        let mtime = node.read().mtime;
        Ok(mtime)
    }

    fn get_mimetype(&self, reference: &Reference) -> VfsResult<String> {
        if self.is_folder(reference)? {
            return Ok("application/x-not-regular-file".to_owned());
        }
        if !self.is_file(reference)? {
            return Err(VfsError::NotFound(reference.to_string()));
        }
        Ok("application/octet-stream".to_owned())
    }

    fn open(&self, reference: &Reference, mode: OpenMode) -> VfsResult<Box<dyn VfsFile>> {
        let wants_write = mode.intersects(OpenMode::WRITE | OpenMode::APPEND);
        if wants_write {
            self.require_writable("open for writing")?;
        }
        let node = self.file_node(reference)?;
        let pos = if mode.contains(OpenMode::APPEND) {
            node.read().bytes.len() as u64
        } else {
            0
        };
        Ok(Box::new(MemFile {
            node,
            pos,
            readable: mode.contains(OpenMode::READ) || !wants_write,
            writable: wants_write,
        }))
    }

    fn get_names(&self, reference: &Reference) -> VfsResult<Vec<String>> {
        let key = key_of(reference);
        if !self.folder_exists(&key) {
            return Err(VfsError::NotADirectory(reference.to_string()));
        }
        let prefix = if key.is_empty() { String::new() } else { format!("{key}/") };
        let entries = self.entries.read();
        let mut names = BTreeSet::new();
        for child in entries.range(prefix.clone()..).map(|(child, _)| child) {
            if !child.starts_with(&prefix) {
                break;
            }
            let rest = &child[prefix.len()..];
            let name = rest.split('/').next().unwrap_or(rest);
            if !name.is_empty() {
                names.insert(name.to_owned());
            }
        }
        Ok(names.into_iter().collect())
    }

    fn open_write(&self, reference: &Reference) -> VfsResult<Box<dyn VfsFile>> {
        self.require_writable("open_write")?;
        let node = self.file_node(reference)?;
        {
            let mut file = node.write();
            file.bytes.clear();
            file.mtime = SystemTime::now();
        }
        Ok(Box::new(MemFile {
            node,
            pos: 0,
            readable: false,
            writable: true,
        }))
    }

    fn make_file(&self, reference: &Reference) -> VfsResult<Box<dyn VfsFile>> {
        self.require_writable("make_file")?;
        let key = key_of(reference);
        if self.exists(reference)? {
            return Err(VfsError::AlreadyExists(reference.to_string()));
        }
        self.check_ancestors(&key, reference)?;
        let node = Arc::new(RwLock::new(FileNode {
            bytes: Vec::new(),
            mtime: SystemTime::now(),
        }));
        self.entries.write().insert(key, Node::File(node.clone()));
        Ok(Box::new(MemFile {
            node,
            pos: 0,
            readable: false,
            writable: true,
        }))
    }

    fn make_folder(&self, reference: &Reference) -> VfsResult<()> {
        self.require_writable("make_folder")?;
        let key = key_of(reference);
        if self.exists(reference)? {
            return Err(VfsError::AlreadyExists(reference.to_string()));
        }
        self.check_ancestors(&key, reference)?;
        self.entries.write().insert(key, Node::Folder);
        Ok(())
    }

    fn remove(&self, reference: &Reference) -> VfsResult<()> {
        self.require_writable("remove")?;
        let key = key_of(reference);
        if !self.exists(reference)? {
            return Err(VfsError::NotFound(reference.to_string()));
        }
        let mut entries = self.entries.write();
        entries.remove(&key);
        let prefix = format!("{key}/");
        let descendants: Vec<String> = entries
            .range(prefix.clone()..)
            .map(|(child, _)| child.clone())
            .take_while(|child| child.starts_with(&prefix))
            .collect();
        for child in descendants {
            entries.remove(&child);
        }
        Ok(())
    }

    fn move_to(&self, source: &Reference, target: &Reference) -> VfsResult<()> {
        self.require_writable("move")?;
        let from = key_of(source);
        let to = key_of(target);
        if !self.exists(source)? {
            return Err(VfsError::NotFound(source.to_string()));
        }
        if self.exists(target)? {
            return Err(VfsError::AlreadyExists(target.to_string()));
        }
        self.check_ancestors(&to, target)?;

        let mut entries = self.entries.write();
        if let Some(node) = entries.remove(&from) {
            entries.insert(to.clone(), node);
        }
        let prefix = format!("{from}/");
        let descendants: Vec<String> = entries
            .range(prefix.clone()..)
            .map(|(child, _)| child.clone())
            .take_while(|child| child.starts_with(&prefix))
            .collect();
        for child in descendants {
            if let Some(node) = entries.remove(&child) {
                entries.insert(format!("{to}/{}", &child[prefix.len()..]), node);
            }
        }
        Ok(())
    }
}

/// A handle over a shared in-memory buffer with a private cursor.
#[derive(Debug)]
pub struct MemFile {
    node: Arc<RwLock<FileNode>>,
    pos: u64,
    readable: bool,
    writable: bool,
}

impl Read for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.readable {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "handle is write-only",
            ));
        }
        let file = self.node.read();
        let start = (self.pos as usize).min(file.bytes.len());
        let n = (&file.bytes[start..]).read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for MemFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.writable {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "handle is read-only",
            ));
        }
        let mut file = self.node.write();
        let start = self.pos as usize;
        if file.bytes.len() < start {
            file.bytes.resize(start, 0);
        }
        let end = start + buf.len();
        if file.bytes.len() < end {
            file.bytes.resize(end, 0);
        }
        file.bytes[start..end].copy_from_slice(buf);
        file.mtime = SystemTime::now();
        self.pos = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.node.read().bytes.len() as i64;
        let target = match pos {
            SeekFrom::Start(at) => at as i64,
            SeekFrom::End(delta) => len + delta,
            SeekFrom::Current(delta) => self.pos as i64 + delta,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start",
            ));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }
}

impl VfsFile for MemFile {}
