//! Hierarchical path component of a reference.
//!
//! A path is a sequence of segments. A segment has a name and,
//! optionally, one or more `;`-delimited parameters. A path may start
//! and/or end with a slash; a path that starts with a slash (or names a
//! DOS drive, e.g. `c:/tmp`) is absolute, otherwise it is relative.
//!
//! Normalization never uses the platform path routines: separators are
//! always `/` regardless of the host OS.

use std::fmt;
use std::ops::Index;

/// One slash-delimited path component with optional `;param` suffixes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Segment(String);

impl Segment {
    pub fn new(text: impl Into<String>) -> Self {
        Segment(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The segment text before the first `;`.
    pub fn name(&self) -> &str {
        match self.0.find(';') {
            Some(at) => &self.0[..at],
            None => &self.0,
        }
    }

    /// The `;`-delimited parameters after the name.
    pub fn params(&self) -> Vec<&str> {
        match self.0.find(';') {
            Some(at) => self.0[at + 1..].split(';').collect(),
            None => Vec::new(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a path string:
///
/// ```text
/// "a//b/c"     -> "a/b/c"
/// "a/./b/c"    -> "a/b/c"
/// "a/b/c/../d" -> "a/b/d"
/// "/../a/b/c"  -> "/a/b/c"
/// "."          -> ""
/// ```
///
/// The trailing-slash property is decided before cleanup, so `"a/."`
/// normalizes to `"a/"`.
fn normalize(path: &str) -> String {
    let starts_with_slash = path.starts_with('/');
    let ends_with_slash = path.ends_with('/') || path.ends_with("/.");

    let mut stack: Vec<&str> = Vec::new();
    for name in path.split('/') {
        if name.is_empty() || name == "." {
            continue;
        }
        if name == ".." && stack.last().is_some_and(|last| *last != "..") {
            stack.pop();
        } else {
            stack.push(name);
        }
    }

    // An absolute path cannot escape the root.
    if starts_with_slash {
        while stack.first() == Some(&"..") {
            stack.remove(0);
        }
    }

    if stack.is_empty() {
        return if starts_with_slash { "/".into() } else { String::new() };
    }

    let mut out = String::new();
    if starts_with_slash {
        out.push('/');
    }
    out.push_str(&stack.join("/"));
    if ends_with_slash {
        out.push('/');
    }
    out
}

/// A normalized sequence of [`Segment`]s plus slash and drive flags.
///
/// Equality and hashing are defined on the canonical string form, so
/// `a/b` and `a/b/` are distinct paths.
#[derive(Clone, Debug)]
pub struct Path {
    segments: Vec<Segment>,
    starts_with_slash: bool,
    ends_with_slash: bool,
    is_dos_path: bool,
}

impl Path {
    /// Parse and normalize a path from its string form.
    pub fn new(text: impl AsRef<str>) -> Self {
        let normalized = normalize(text.as_ref());

        let bytes = normalized.as_bytes();
        let is_dos_path =
            bytes.len() > 1 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';

        let starts_with_slash = normalized.starts_with('/');
        let body = normalized.strip_prefix('/').unwrap_or(&normalized);
        let ends_with_slash = body.ends_with('/');
        let body = body.strip_suffix('/').unwrap_or(body);

        let segments = if body.is_empty() {
            Vec::new()
        } else {
            body.split('/').map(Segment::new).collect()
        };

        Path {
            segments,
            starts_with_slash,
            ends_with_slash,
            is_dos_path,
        }
    }

    /// Build a path from pre-split parts; same normalization as
    /// [`Path::new`] applied to the `/`-joined text.
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = parts
            .into_iter()
            .map(|part| part.as_ref().to_owned())
            .collect::<Vec<_>>()
            .join("/");
        Path::new(joined)
    }

    pub fn is_absolute(&self) -> bool {
        self.starts_with_slash || self.is_dos_path
    }

    pub fn is_relative(&self) -> bool {
        !self.is_absolute()
    }

    pub fn is_dos_path(&self) -> bool {
        self.is_dos_path
    }

    pub fn starts_with_slash(&self) -> bool {
        self.starts_with_slash
    }

    pub fn ends_with_slash(&self) -> bool {
        self.ends_with_slash
    }

    /// Force or clear the trailing slash, keeping the segments intact.
    pub fn set_trailing_slash(&mut self, trailing: bool) {
        self.ends_with_slash = trailing;
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// The name of the last segment, or `""` for an empty path.
    pub fn name(&self) -> &str {
        match self.segments.last() {
            Some(segment) => segment.name(),
            None => "",
        }
    }

    /// Resolve `other` against this path per RFC2396: the trailing
    /// slash decides whether the final segment is kept.
    ///
    /// ```
    /// use vfs_uri::Path;
    /// assert_eq!(Path::new("/a/b").resolve(&Path::new("c")), Path::new("/a/c"));
    /// assert_eq!(Path::new("/a/b/").resolve(&Path::new("c")), Path::new("/a/b/c"));
    /// ```
    pub fn resolve(&self, other: &Path) -> Path {
        if other.is_absolute() {
            return other.clone();
        }
        if self.ends_with_slash {
            return Path::new(format!("{self}/{other}"));
        }
        Path::new(format!("{self}/../{other}"))
    }

    /// Resolve ignoring the trailing slash: always append.
    ///
    /// ```
    /// use vfs_uri::Path;
    /// assert_eq!(Path::new("/a/b").resolve2(&Path::new("c")), Path::new("/a/b/c"));
    /// ```
    pub fn resolve2(&self, other: &Path) -> Path {
        if other.is_absolute() {
            return other.clone();
        }
        Path::new(format!("{self}/{other}"))
    }

    /// The longest shared leading-segment sequence.
    pub fn common_prefix(&self, other: &Path) -> Path {
        let shared = self
            .segments
            .iter()
            .zip(other.segments.iter())
            .take_while(|(a, b)| a == b)
            .count();
        self.slice(shared)
    }

    /// The `../../x`-style relative path from `self` to `other`; the
    /// complement of [`Path::resolve2`].
    pub fn path_to(&self, other: &Path) -> Path {
        let prefix = self.common_prefix(other).len();
        let ups = self.segments.len() - prefix;
        let mut parts: Vec<&str> = vec![".."; ups];
        parts.extend(other.segments[prefix..].iter().map(Segment::as_str));
        if parts.is_empty() {
            parts.push(".");
        }
        Path::from_parts(parts)
    }

    /// The path from the tail back to the head, e.g. `../../`.
    pub fn path_to_root(&self) -> Path {
        let ups = self.segments.len().saturating_sub(1);
        Path::new("../".repeat(ups))
    }

    fn slice(&self, len: usize) -> Path {
        let segments: Vec<Segment> = self.segments[..len].to_vec();
        let is_dos_path = segments
            .first()
            .map(|segment| {
                let bytes = segment.as_str().as_bytes();
                bytes.len() > 1 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
            })
            .unwrap_or(false);
        Path {
            segments,
            starts_with_slash: self.starts_with_slash,
            ends_with_slash: false,
            is_dos_path,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        if self.starts_with_slash {
            out.push('/');
        }
        out.push_str(
            &self
                .segments
                .iter()
                .map(Segment::as_str)
                .collect::<Vec<_>>()
                .join("/"),
        );
        if self.ends_with_slash {
            out.push('/');
        }
        if out.is_empty() {
            out.push('.');
        }
        f.write_str(&out)
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for Path {}

impl std::hash::Hash for Path {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl PartialEq<str> for Path {
    fn eq(&self, other: &str) -> bool {
        *self == Path::new(other)
    }
}

impl PartialEq<&str> for Path {
    fn eq(&self, other: &&str) -> bool {
        *self == Path::new(other)
    }
}

impl Index<usize> for Path {
    type Output = Segment;

    fn index(&self, index: usize) -> &Segment {
        &self.segments[index]
    }
}

impl From<&str> for Path {
    fn from(text: &str) -> Self {
        Path::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalization() {
        assert_eq!(Path::new("a//b/c").to_string(), "a/b/c");
        assert_eq!(Path::new("a/./b/c").to_string(), "a/b/c");
        assert_eq!(Path::new("a/b/c/../d").to_string(), "a/b/d");
        assert_eq!(Path::new("/../a/b/c").to_string(), "/a/b/c");
        assert_eq!(Path::new(".").to_string(), ".");
        assert_eq!(Path::new("").to_string(), ".");
        assert_eq!(Path::new("/").to_string(), "/");
        assert_eq!(Path::new("../../a").to_string(), "../../a");
    }

    #[test]
    fn trailing_slash_is_preserved() {
        assert_eq!(Path::new("a/b/").to_string(), "a/b/");
        assert_eq!(Path::new("a/b/.").to_string(), "a/b/");
        assert!(Path::new("a/b/").ends_with_slash());
        assert!(!Path::new("a/b").ends_with_slash());
    }

    #[test]
    fn round_trip_of_normalized_strings() {
        for text in ["a/b/c", "/a/b/c", "/a/b/", "a", "/", "c:/tmp/f.txt"] {
            assert_eq!(Path::new(text).to_string(), text);
        }
    }

    #[test]
    fn dos_paths_are_absolute() {
        let path = Path::new("c:/a/b");
        assert!(path.is_dos_path());
        assert!(path.is_absolute());
        assert!(!path.starts_with_slash());

        assert!(Path::new("a/b").is_relative());
        assert!(Path::new("/a/b").is_absolute());
    }

    #[test]
    fn segment_names_and_params() {
        let path = Path::new("a/b;lang=es;v=2/c");
        assert_eq!(path[1].name(), "b");
        assert_eq!(path[1].params(), vec!["lang=es", "v=2"]);
        assert_eq!(path.name(), "c");
        assert_eq!(Path::new("").name(), "");
    }

    #[test]
    fn resolve_and_resolve2_diverge() {
        let base = Path::new("/a/b");
        assert_eq!(base.resolve(&Path::new("c")), Path::new("/a/c"));
        assert_eq!(base.resolve2(&Path::new("c")), Path::new("/a/b/c"));

        let dir = Path::new("/a/b/");
        assert_eq!(dir.resolve(&Path::new("c")), Path::new("/a/b/c"));
        assert_eq!(dir.resolve2(&Path::new("c")), Path::new("/a/b/c"));
    }

    #[test]
    fn resolve_absolute_wins() {
        let base = Path::new("/a/b");
        assert_eq!(base.resolve(&Path::new("/x/y")), Path::new("/x/y"));
        assert_eq!(base.resolve2(&Path::new("c:/x")), Path::new("c:/x"));
    }

    #[test]
    fn resolve_with_parent_steps() {
        let base = Path::new("/a/b/c");
        assert_eq!(base.resolve(&Path::new("../d")), Path::new("/a/d"));
        assert_eq!(base.resolve2(&Path::new("../d")), Path::new("/a/b/d"));
    }

    #[test]
    fn common_prefix() {
        let a = Path::new("a/b/c");
        let b = Path::new("a/b/d/e");
        assert_eq!(a.common_prefix(&b), Path::new("a/b"));
        assert_eq!(Path::new("/x").common_prefix(&Path::new("/y")), Path::new("/"));
    }

    #[test]
    fn path_to_complements_resolve2() {
        let a = Path::new("a/b/c");
        let b = Path::new("a/x/y");
        let rel = a.path_to(&b);
        assert_eq!(rel, Path::new("../../x/y"));
        assert_eq!(a.resolve2(&rel), b);

        assert_eq!(a.path_to(&a), Path::new("."));
    }

    #[test]
    fn path_to_root() {
        assert_eq!(Path::new("a/b/c").path_to_root().to_string(), "../../");
        assert_eq!(Path::new("a").path_to_root().to_string(), ".");
    }

    #[test]
    fn equality_is_canonical() {
        assert_eq!(Path::new("a/./b"), Path::new("a/b"));
        assert_ne!(Path::new("a/b"), Path::new("a/b/"));
        assert_ne!(Path::new("a/b"), Path::new("/a/b"));
        assert_eq!(Path::new("a/b"), "a/b");
    }

    #[test]
    fn from_parts_matches_joined_string() {
        assert_eq!(Path::from_parts(["a", "b", ".."]), Path::new("a"));
        assert_eq!(Path::from_parts(Vec::<&str>::new()).to_string(), ".");
    }
}
