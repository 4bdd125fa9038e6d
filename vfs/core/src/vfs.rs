//! The normalization facade.
//!
//! [`Vfs`] is what application code holds: it turns raw user strings
//! into absolute [`Reference`]s and dispatches every filesystem
//! operation to the backend registered for the reference's scheme.

use std::borrow::Cow;
use std::env;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

use vfs_cache::LruCache;
use vfs_uri::{Authority, Query, Reference};

use crate::backend::{Backend, Metadata};
use crate::file::{OpenMode, VfsFile};
use crate::registry::Registry;
use crate::{VfsError, VfsResult};

/// Capacity of the parsed-reference memo.
const REFERENCE_CACHE_SIZE: usize = 200;

/// Facade over the scheme registry and the reference cache.
pub struct Vfs {
    registry: Registry,
    references: Mutex<LruCache<String, Reference>>,
}

impl Default for Vfs {
    fn default() -> Self {
        Vfs::new()
    }
}

impl Vfs {
    pub fn new() -> Self {
        let references = LruCache::new(REFERENCE_CACHE_SIZE, REFERENCE_CACHE_SIZE)
            .expect("constant cache bounds are valid");
        Vfs {
            registry: Registry::new(),
            references: Mutex::new(references),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register `backend` for `scheme`; the service-provider entry
    /// point plugins call at load time.
    pub fn register_filesystem(&self, scheme: &str, backend: Arc<dyn Backend>) {
        self.registry.register(scheme, backend);
    }

    pub fn deregister_filesystem(&self, scheme: &str) -> bool {
        self.registry.deregister(scheme)
    }

    /// Parse `text` into a reference, memoized. Cache hits do not
    /// refresh recency.
    pub fn get_reference(&self, text: &str) -> VfsResult<Reference> {
        let mut cache = self.references.lock();
        if let Some(reference) = cache.get(&text.to_owned()) {
            return Ok(reference.clone());
        }
        let reference = Reference::parse(text)?;
        cache.set(text.to_owned(), reference.clone());
        Ok(reference)
    }

    /// The current working directory as a `file:` folder reference.
    pub fn cwd_reference(&self) -> VfsResult<Reference> {
        let cwd = env::current_dir()
            .map_err(|err| VfsError::BackendUnavailable(format!("cwd: {err}")))?;
        let mut base = cwd.to_string_lossy().into_owned();
        if cfg!(windows) {
            base = base.replace('\\', "/");
            // "c:/..." gets a leading slash so it parses as a file URL
            // path rather than an authority.
            let bytes = base.as_bytes();
            if bytes.len() > 1 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
                base.insert(0, '/');
            }
        }
        Ok(self.get_reference(&format!("file://{base}/"))?)
    }

    /// Normalize `text` into an absolute reference using the current
    /// working directory as the base. Idempotent: normalizing the
    /// serialized result is a no-op.
    pub fn normalize(&self, text: &str) -> VfsResult<Reference> {
        let base = self.cwd_reference()?;
        self.normalize_with_base(text, &base)
    }

    /// Normalize `text` against an explicit base reference.
    pub fn normalize_with_base(&self, text: &str, base: &Reference) -> VfsResult<Reference> {
        let text = fix_file_separators(text);
        let reference = self.get_reference(&text)?;
        if !reference.scheme.is_empty() {
            return Ok(reference);
        }

        // Resolve only the path against the base, then graft the
        // original query and fragment back on so a base with its own
        // query cannot leak into the result.
        let path_only = Reference::new(
            "",
            Authority::empty(),
            reference.path.clone(),
            Query::new(),
            None,
        );
        let resolved = base.resolve(&path_only);
        Ok(Reference::new(
            resolved.scheme,
            resolved.authority,
            resolved.path,
            reference.query.clone(),
            reference.fragment.clone(),
        ))
    }

    /// The canonical form of a reference: query and fragment stripped,
    /// and a trailing slash when the resource is a folder.
    pub fn canonical(&self, reference: &Reference) -> VfsResult<Reference> {
        let mut path = reference.path.clone();
        if self.is_folder(reference)? {
            path.set_trailing_slash(true);
        }
        Ok(Reference::new(
            reference.scheme.clone(),
            reference.authority.clone(),
            path,
            Query::new(),
            None,
        ))
    }

    fn backend(&self, reference: &Reference) -> VfsResult<Arc<dyn Backend>> {
        self.registry.get_backend(&reference.scheme)
    }

    pub fn exists(&self, reference: &Reference) -> VfsResult<bool> {
        self.backend(reference)?.exists(reference)
    }

    pub fn is_file(&self, reference: &Reference) -> VfsResult<bool> {
        self.backend(reference)?.is_file(reference)
    }

    pub fn is_folder(&self, reference: &Reference) -> VfsResult<bool> {
        self.backend(reference)?.is_folder(reference)
    }

    pub fn can_read(&self, reference: &Reference) -> VfsResult<bool> {
        self.backend(reference)?.can_read(reference)
    }

    pub fn can_write(&self, reference: &Reference) -> VfsResult<bool> {
        self.backend(reference)?.can_write(reference)
    }

    pub fn get_size(&self, reference: &Reference) -> VfsResult<u64> {
        self.backend(reference)?.get_size(reference)
    }

    pub fn get_mtime(&self, reference: &Reference) -> VfsResult<SystemTime> {
        self.backend(reference)?.get_mtime(reference)
    }

    pub fn get_mimetype(&self, reference: &Reference) -> VfsResult<String> {
        self.backend(reference)?.get_mimetype(reference)
    }

    pub fn open(&self, reference: &Reference, mode: OpenMode) -> VfsResult<Box<dyn VfsFile>> {
        self.backend(reference)?.open(reference, mode)
    }

    pub fn get_names(&self, reference: &Reference) -> VfsResult<Vec<String>> {
        self.backend(reference)?.get_names(reference)
    }

    pub fn make_file(&self, reference: &Reference) -> VfsResult<Box<dyn VfsFile>> {
        self.backend(reference)?.make_file(reference)
    }

    pub fn make_folder(&self, reference: &Reference) -> VfsResult<()> {
        self.backend(reference)?.make_folder(reference)
    }

    pub fn remove(&self, reference: &Reference) -> VfsResult<()> {
        self.backend(reference)?.remove(reference)
    }

    /// Rename or move within one filesystem. Cross-scheme moves are
    /// not performed here; callers copy-and-remove instead.
    pub fn move_to(&self, source: &Reference, target: &Reference) -> VfsResult<()> {
        if source.scheme != target.scheme {
            return Err(VfsError::Unsupported("move across filesystems"));
        }
        self.backend(source)?.move_to(source, target)
    }

    /// Open a writable handle, creating the file when it is missing.
    pub fn open_write(&self, reference: &Reference) -> VfsResult<Box<dyn VfsFile>> {
        let backend = self.backend(reference)?;
        if backend.exists(reference)? {
            if backend.is_file(reference)? {
                backend.open_write(reference)
            } else {
                Err(VfsError::NotAFile(reference.to_string()))
            }
        } else {
            backend.make_file(reference)
        }
    }

    /// Resource metadata, through the backend's dedicated capability
    /// when it offers one and assembled piecewise otherwise.
    pub fn get_metadata(&self, reference: &Reference) -> VfsResult<Metadata> {
        let backend = self.backend(reference)?;
        if let Some(capable) = backend.as_metadata() {
            return capable.get_metadata(reference);
        }
        Ok(Metadata {
            mimetype: backend.get_mimetype(reference)?,
            description: String::new(),
            mtime: backend.get_mtime(reference)?,
            size: backend.get_size(reference)?,
        })
    }

    /// A zero-copy byte view of the resource, when the backend can map
    /// one.
    pub fn open_mmap(&self, reference: &Reference) -> VfsResult<Box<dyn AsRef<[u8]> + Send + Sync>> {
        let backend = self.backend(reference)?;
        match backend.as_mmap() {
            Some(capable) => capable.open_mmap(reference),
            None => Err(VfsError::Unsupported("mmap")),
        }
    }
}

impl std::fmt::Debug for Vfs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vfs")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// On Windows, paths pasted after a `file:` prefix commonly carry
/// backslashes; flip them before parsing. Elsewhere backslashes are
/// legitimate name characters and stay.
fn fix_file_separators(text: &str) -> Cow<'_, str> {
    if cfg!(windows) && text.starts_with("file:") {
        Cow::Owned(text.replace('\\', "/"))
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn get_reference_memoizes() {
        let vfs = Vfs::new();
        let a = vfs.get_reference("http://h/a").unwrap();
        let b = vfs.get_reference("http://h/a").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cwd_reference_is_a_file_folder() {
        let vfs = Vfs::new();
        let cwd = vfs.cwd_reference().unwrap();
        assert_eq!(cwd.scheme, "file");
        assert!(cwd.path.ends_with_slash());
    }

    #[test]
    fn normalize_keeps_schemed_references() {
        let vfs = Vfs::new();
        let r = vfs.normalize("mem:a/b").unwrap();
        assert_eq!(r.to_string(), "mem:a/b");
    }

    #[test]
    fn normalize_is_idempotent() {
        let vfs = Vfs::new();
        let once = vfs.normalize("some/relative/file.txt").unwrap();
        let twice = vfs.normalize(&once.to_string()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_grafts_query_and_fragment() {
        let vfs = Vfs::new();
        let base = vfs.get_reference("http://h/dir/?stale=1").unwrap();
        let r = vfs.normalize_with_base("file.txt?fresh=2#line", &base).unwrap();
        assert_eq!(r.to_string(), "http://h/dir/file.txt?fresh=2#line");
    }

    #[test]
    fn normalize_against_explicit_base() {
        let vfs = Vfs::new();
        let base = vfs.get_reference("mem:top/dir/").unwrap();
        let r = vfs.normalize_with_base("../other.txt", &base).unwrap();
        assert_eq!(r.to_string(), "mem:top/other.txt");
    }
}
