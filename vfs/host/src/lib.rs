//! Local-disk backend for `file:` references.
//!
//! References map to native paths without going through the platform
//! path routines: a drive-rooted path (`c:/tmp`) passes through
//! verbatim, a slash-rooted path is used as-is, and relative references
//! are rejected outright since the normalization facade is expected to
//! have produced an absolute reference already.

use std::fs;
use std::io::{self, Read, Seek, Write};
use std::path::PathBuf;
use std::time::SystemTime;

use parking_lot::Mutex;

use vfs_cache::LruCache;
use vfs_core::{
    Backend, Metadata, MetadataCapable, MmapCapable, OpenMode, VfsError, VfsFile, VfsResult,
};
use vfs_uri::Reference;

/// The scheme this backend is conventionally registered under.
pub const SCHEME: &str = "file";

/// Bounds of the per-path metadata cache.
const META_CACHE_MIN: usize = 100;
const META_CACHE_MAX: usize = 150;

const MIME_TYPES: &[(&str, &str)] = &[
    ("css", "text/css"),
    ("gif", "image/gif"),
    ("gz", "application/gzip"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("md", "text/markdown"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("py", "text/x-python"),
    ("rs", "text/x-rust"),
    ("svg", "image/svg+xml"),
    ("txt", "text/plain"),
    ("xml", "text/xml"),
    ("zip", "application/zip"),
];

/// Mimetype of folders, and of anything else that is not a regular
/// file.
pub const FOLDER_MIMETYPE: &str = "application/x-not-regular-file";

/// Fallback mimetype for files with no recognized extension.
pub const DEFAULT_MIMETYPE: &str = "application/octet-stream";

#[derive(Clone)]
struct CachedMeta {
    mtime: SystemTime,
    metadata: Metadata,
}

/// Local-disk [`Backend`] with an mtime-invalidated metadata cache.
pub struct HostFs {
    metadata: Mutex<LruCache<String, CachedMeta>>,
}

impl Default for HostFs {
    fn default() -> Self {
        HostFs::new()
    }
}

fn ref_to_path(reference: &Reference) -> VfsResult<PathBuf> {
    let path = &reference.path;
    if path.is_dos_path() || path.starts_with_slash() {
        return Ok(PathBuf::from(path.to_string()));
    }
    Err(VfsError::InvalidReference(format!(
        "not an absolute local path: {reference}"
    )))
}

fn guess_mimetype(name: &str) -> &'static str {
    let ext = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return DEFAULT_MIMETYPE,
    };
    MIME_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIMETYPE)
}

impl HostFs {
    pub fn new() -> Self {
        let metadata = LruCache::new(META_CACHE_MIN, META_CACHE_MAX)
            .expect("constant cache bounds are valid");
        HostFs {
            metadata: Mutex::new(metadata),
        }
    }

    fn stat(&self, reference: &Reference) -> VfsResult<fs::Metadata> {
        let path = ref_to_path(reference)?;
        fs::metadata(&path).map_err(|err| VfsError::from_io(err, reference))
    }
}

impl Backend for HostFs {
    fn exists(&self, reference: &Reference) -> VfsResult<bool> {
        Ok(fs::metadata(ref_to_path(reference)?).is_ok())
    }

    fn is_file(&self, reference: &Reference) -> VfsResult<bool> {
        Ok(fs::metadata(ref_to_path(reference)?)
            .map(|meta| meta.is_file())
            .unwrap_or(false))
    }

    fn is_folder(&self, reference: &Reference) -> VfsResult<bool> {
        Ok(fs::metadata(ref_to_path(reference)?)
            .map(|meta| meta.is_dir())
            .unwrap_or(false))
    }

    fn can_read(&self, reference: &Reference) -> VfsResult<bool> {
        self.exists(reference)
    }

    fn can_write(&self, reference: &Reference) -> VfsResult<bool> {
        Ok(fs::metadata(ref_to_path(reference)?)
            .map(|meta| !meta.permissions().readonly())
            .unwrap_or(false))
    }

    fn get_size(&self, reference: &Reference) -> VfsResult<u64> {
        Ok(self.stat(reference)?.len())
    }

    fn get_mtime(&self, reference: &Reference) -> VfsResult<SystemTime> {
        self.stat(reference)?
            .modified()
            .map_err(|err| VfsError::from_io(err, reference))
    }

    fn get_mimetype(&self, reference: &Reference) -> VfsResult<String> {
        let meta = self.stat(reference)?;
        if !meta.is_file() {
            return Ok(FOLDER_MIMETYPE.to_owned());
        }
        Ok(guess_mimetype(reference.path.name()).to_owned())
    }

    fn open(&self, reference: &Reference, mode: OpenMode) -> VfsResult<Box<dyn VfsFile>> {
        let path = ref_to_path(reference)?;
        let mut options = fs::OpenOptions::new();
        let wants_write = mode.intersects(OpenMode::WRITE | OpenMode::APPEND);
        options.read(mode.contains(OpenMode::READ) || !wants_write);
        options.write(mode.contains(OpenMode::WRITE));
        options.append(mode.contains(OpenMode::APPEND));
        let file = options
            .open(&path)
            .map_err(|err| VfsError::from_io(err, reference))?;
        Ok(Box::new(HostFile(file)))
    }

    fn get_names(&self, reference: &Reference) -> VfsResult<Vec<String>> {
        let path = ref_to_path(reference)?;
        if !self.is_folder(reference)? {
            return Err(VfsError::NotADirectory(reference.to_string()));
        }
        let entries = fs::read_dir(&path).map_err(|err| VfsError::from_io(err, reference))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| VfsError::from_io(err, reference))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn open_write(&self, reference: &Reference) -> VfsResult<Box<dyn VfsFile>> {
        let path = ref_to_path(reference)?;
        let file = fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|err| VfsError::from_io(err, reference))?;
        Ok(Box::new(HostFile(file)))
    }

    fn make_file(&self, reference: &Reference) -> VfsResult<Box<dyn VfsFile>> {
        let path = ref_to_path(reference)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| VfsError::from_io(err, reference))?;
        }
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|err| VfsError::from_io(err, reference))?;
        tracing::debug!(path = %path.display(), "created file");
        Ok(Box::new(HostFile(file)))
    }

    fn make_folder(&self, reference: &Reference) -> VfsResult<()> {
        let path = ref_to_path(reference)?;
        if fs::metadata(&path).is_ok() {
            return Err(VfsError::AlreadyExists(reference.to_string()));
        }
        fs::create_dir_all(&path).map_err(|err| VfsError::from_io(err, reference))
    }

    fn remove(&self, reference: &Reference) -> VfsResult<()> {
        let path = ref_to_path(reference)?;
        let meta = fs::metadata(&path).map_err(|err| VfsError::from_io(err, reference))?;
        let removed = if meta.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|err| VfsError::from_io(err, reference))
    }

    fn move_to(&self, source: &Reference, target: &Reference) -> VfsResult<()> {
        let from = ref_to_path(source)?;
        let to = ref_to_path(target)?;
        fs::rename(&from, &to).map_err(|err| VfsError::from_io(err, source))
    }

    fn as_metadata(&self) -> Option<&dyn MetadataCapable> {
        Some(self)
    }

    fn as_mmap(&self) -> Option<&dyn MmapCapable> {
        Some(self)
    }
}

impl MetadataCapable for HostFs {
    /// Metadata lookups hit the disk for the mtime only; the assembled
    /// record is cached and reused until the mtime moves.
    fn get_metadata(&self, reference: &Reference) -> VfsResult<Metadata> {
        let path = ref_to_path(reference)?;
        let stat = fs::metadata(&path).map_err(|err| VfsError::from_io(err, reference))?;
        let mtime = stat
            .modified()
            .map_err(|err| VfsError::from_io(err, reference))?;

        let key = path.to_string_lossy().into_owned();
        {
            let cache = self.metadata.lock();
            if let Some(cached) = cache.get(&key) {
                if cached.mtime == mtime {
                    return Ok(cached.metadata.clone());
                }
            }
        }

        let metadata = Metadata {
            mimetype: if stat.is_file() {
                guess_mimetype(reference.path.name()).to_owned()
            } else {
                FOLDER_MIMETYPE.to_owned()
            },
            description: String::new(),
            mtime,
            size: stat.len(),
        };
        self.metadata.lock().set(
            key,
            CachedMeta {
                mtime,
                metadata: metadata.clone(),
            },
        );
        Ok(metadata)
    }
}

impl MmapCapable for HostFs {
    fn open_mmap(&self, reference: &Reference) -> VfsResult<Box<dyn AsRef<[u8]> + Send + Sync>> {
        let path = ref_to_path(reference)?;
        let file = fs::File::open(&path).map_err(|err| VfsError::from_io(err, reference))?;
        // Safety contract of memmap2: the mapping is undefined if the
        // file is truncated while mapped. Callers treat mappings as
        // read-only snapshots of quiescent files.
        let map = unsafe { memmap2::Mmap::map(&file) }
            .map_err(|err| VfsError::from_io(err, reference))?;
        Ok(Box::new(map))
    }
}

/// Newtype over [`fs::File`] so the handle can carry the [`VfsFile`]
/// trait.
#[derive(Debug)]
pub struct HostFile(fs::File);

impl Read for HostFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for HostFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl Seek for HostFile {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        self.0.seek(pos)
    }
}

impl VfsFile for HostFile {}

impl std::fmt::Debug for HostFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostFs").finish_non_exhaustive()
    }
}
