//! Scheme to backend mapping.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::Backend;
use crate::{VfsError, VfsResult};

/// Thread-safe registry of [`Backend`]s keyed by URI scheme.
///
/// Scheme names are normalized (trimmed, ASCII-lowercased) on every
/// entry point, so `"File"` and `"file"` address the same backend.
/// Registering a scheme that is already present replaces the previous
/// backend; in-flight operations holding the old `Arc` finish against
/// it unaffected.
#[derive(Default)]
pub struct Registry {
    backends: RwLock<HashMap<String, Arc<dyn Backend>>>,
}

fn normalize_scheme(scheme: &str) -> String {
    scheme.trim().to_ascii_lowercase()
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register `backend` under `scheme`, replacing any previous one.
    pub fn register(&self, scheme: &str, backend: Arc<dyn Backend>) {
        let scheme = normalize_scheme(scheme);
        tracing::debug!(%scheme, "registering filesystem backend");
        self.backends.write().insert(scheme, backend);
    }

    /// Remove the backend for `scheme`. Returns whether one was
    /// registered.
    pub fn deregister(&self, scheme: &str) -> bool {
        let scheme = normalize_scheme(scheme);
        tracing::debug!(%scheme, "deregistering filesystem backend");
        self.backends.write().remove(&scheme).is_some()
    }

    /// The backend for `scheme`, or [`VfsError::UnknownScheme`].
    pub fn get_backend(&self, scheme: &str) -> VfsResult<Arc<dyn Backend>> {
        let scheme = normalize_scheme(scheme);
        self.backends
            .read()
            .get(&scheme)
            .cloned()
            .ok_or(VfsError::UnknownScheme(scheme))
    }

    pub fn contains(&self, scheme: &str) -> bool {
        self.backends.read().contains_key(&normalize_scheme(scheme))
    }

    /// All registered schemes, sorted.
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.backends.read().keys().cloned().collect();
        schemes.sort();
        schemes
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    use vfs_uri::Reference;

    use crate::file::{OpenMode, VfsFile};
    use crate::VfsResult;

    #[derive(Debug)]
    struct DummyBackend {
        tag: &'static str,
    }

    impl Backend for DummyBackend {
        fn exists(&self, _: &Reference) -> VfsResult<bool> {
            Ok(false)
        }
        fn is_file(&self, _: &Reference) -> VfsResult<bool> {
            Ok(false)
        }
        fn is_folder(&self, _: &Reference) -> VfsResult<bool> {
            Ok(false)
        }
        fn can_read(&self, _: &Reference) -> VfsResult<bool> {
            Ok(false)
        }
        fn can_write(&self, _: &Reference) -> VfsResult<bool> {
            Ok(false)
        }
        fn get_size(&self, _: &Reference) -> VfsResult<u64> {
            Ok(0)
        }
        fn get_mtime(&self, _: &Reference) -> VfsResult<SystemTime> {
            Ok(SystemTime::UNIX_EPOCH)
        }
        fn get_mimetype(&self, _: &Reference) -> VfsResult<String> {
            Ok(self.tag.to_owned())
        }
        fn open(&self, reference: &Reference, _: OpenMode) -> VfsResult<Box<dyn VfsFile>> {
            Err(VfsError::NotFound(reference.to_string()))
        }
        fn get_names(&self, _: &Reference) -> VfsResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn reference(text: &str) -> Reference {
        Reference::parse(text).unwrap()
    }

    #[test]
    fn register_and_lookup() {
        let registry = Registry::new();
        registry.register("mem", Arc::new(DummyBackend { tag: "a" }));

        assert!(registry.contains("mem"));
        let backend = registry.get_backend("mem").unwrap();
        assert_eq!(backend.get_mimetype(&reference("mem:x")).unwrap(), "a");
    }

    #[test]
    fn scheme_names_are_normalized() {
        let registry = Registry::new();
        registry.register("  MEM ", Arc::new(DummyBackend { tag: "a" }));
        assert!(registry.contains("mem"));
        assert!(registry.get_backend("Mem").is_ok());
    }

    #[test]
    fn re_registration_replaces() {
        let registry = Registry::new();
        registry.register("mem", Arc::new(DummyBackend { tag: "old" }));
        registry.register("mem", Arc::new(DummyBackend { tag: "new" }));

        let backend = registry.get_backend("mem").unwrap();
        assert_eq!(backend.get_mimetype(&reference("mem:x")).unwrap(), "new");
    }

    #[test]
    fn unknown_scheme_is_an_error() {
        let registry = Registry::new();
        let err = registry.get_backend("gopher").unwrap_err();
        assert_eq!(err, VfsError::UnknownScheme("gopher".to_owned()));
    }

    #[test]
    fn deregister_reports_presence() {
        let registry = Registry::new();
        registry.register("mem", Arc::new(DummyBackend { tag: "a" }));
        assert!(registry.deregister("mem"));
        assert!(!registry.deregister("mem"));
        assert!(registry.get_backend("mem").is_err());
    }

    #[test]
    fn schemes_are_sorted() {
        let registry = Registry::new();
        registry.register("mem", Arc::new(DummyBackend { tag: "a" }));
        registry.register("file", Arc::new(DummyBackend { tag: "b" }));
        registry.register("about", Arc::new(DummyBackend { tag: "c" }));
        assert_eq!(registry.schemes(), vec!["about", "file", "mem"]);
    }
}
