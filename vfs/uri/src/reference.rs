//! Generic URI references per RFC2396, with the Windows drive-letter
//! extensions the editor layer depends on.
//!
//! A reference is made of five components:
//!
//! ```text
//! <scheme>://<authority><path>?<query>#<fragment>
//! ```
//!
//! The parser follows RFC2396 rather than RFC3986, and layers two
//! heuristic fixups for Windows paths (`c:/a/b`, `file:///c:/a/b`) on
//! top of the generic splitter. Those heuristics can misfire on
//! legitimate single-letter schemes; that is long-standing, documented
//! behavior and is kept as-is.

use std::fmt;
use std::str::FromStr;

use crate::authority::Authority;
use crate::path::Path;
use crate::query::{decode_query, encode_query, Query, QueryValue};
use crate::UriError;

/// A parsed URI reference.
///
/// `fragment` distinguishes absent (`None`, as in `"foo"`) from present
/// but empty (`Some("")`, as in the literal input `"#"`). References
/// are value types; `resolve`/`replace` return new instances.
#[derive(Clone, Debug)]
pub struct Reference {
    pub scheme: String,
    pub authority: Authority,
    pub path: Path,
    pub query: Query,
    pub fragment: Option<String>,
}

impl Reference {
    pub fn new(
        scheme: impl Into<String>,
        authority: Authority,
        path: Path,
        query: Query,
        fragment: Option<String>,
    ) -> Self {
        Reference {
            scheme: scheme.into(),
            authority,
            path,
            query,
            fragment,
        }
    }

    /// The distinguished empty reference: "no navigation, same
    /// document". Serializes to the empty string.
    pub fn empty() -> Self {
        Reference::new("", Authority::empty(), Path::new(""), Query::new(), None)
    }

    /// True for the distinguished empty reference.
    pub fn is_empty(&self) -> bool {
        self.scheme.is_empty()
            && self.authority.is_empty()
            && self.path.is_empty()
            && self.path.is_relative()
            && !self.path.ends_with_slash()
            && self.query.is_empty()
            && self.fragment.is_none()
    }

    /// Parse a reference from its textual form.
    ///
    /// Two literal inputs are special-cased: `""` is the empty
    /// reference and `"#"` is the empty-fragment reference. Everything
    /// else goes through generic splitting plus the documented Windows
    /// fixups, applied in order.
    pub fn parse(text: &str) -> Result<Reference, UriError> {
        if text.is_empty() {
            return Ok(Reference::empty());
        }
        if text == "#" {
            return Ok(Reference::new(
                "",
                Authority::empty(),
                Path::new(""),
                Query::new(),
                Some(String::new()),
            ));
        }

        let (mut scheme, authority, mut path, query, mut fragment) = split_reference(text);

        if scheme.len() == 1 {
            // The generic splitter saw a Windows drive name and took it
            // for a scheme ("c:/a/b"). Undo that, and pull out a
            // trailing #<digits> fragment the splitter may have left
            // inside the path.
            let (fixed, found) = find_fragment(&path, fragment.take());
            fragment = found;
            path = format!("{scheme}:{}", fixed.replace('\\', "/"));
            scheme = "file".to_owned();
        } else if path.len() > 3 && path.as_bytes()[0] == b'/' && path.as_bytes()[2] == b':' {
            // "file:///c:/a/b" splits with a spurious leading slash in
            // the path; drop it and lowercase the drive letter.
            let drive = path[1..2].to_ascii_lowercase();
            let rest = path[3..].to_owned();
            let (fixed, found) = find_fragment(&rest, fragment.take());
            fragment = found;
            path = format!("{drive}:{}", fixed.replace('\\', "/"));
        }

        let path = percent_decode(&path, "path", text)?;
        let authority = percent_decode(&authority, "authority", text)?;

        // An empty path with a non-empty authority stays empty rather
        // than becoming "/": "scheme://host" and "scheme://host/" must
        // remain distinguishable.
        let fragment = match fragment {
            Some(fragment) if fragment.is_empty() => None,
            other => other,
        };

        Ok(Reference::new(
            scheme,
            Authority::new(authority),
            Path::new(path),
            decode_query(&query),
            fragment,
        ))
    }

    /// Resolve `other` against this base, strict RFC2396 §5.2 path
    /// semantics (via [`Path::resolve`]).
    ///
    /// The empty reference is detected structurally, so `"."` and
    /// `"./"` parse to it and resolve as same-document references
    /// (base path kept, fragment dropped) rather than as relative
    /// paths naming the base's folder.
    pub fn resolve(&self, other: &Reference) -> Reference {
        self.resolve_with(other, Path::resolve)
    }

    /// Resolve `other` against this base, lenient trailing-slash
    /// semantics (via [`Path::resolve2`]).
    pub fn resolve2(&self, other: &Reference) -> Reference {
        self.resolve_with(other, Path::resolve2)
    }

    fn resolve_with(&self, other: &Reference, join: fn(&Path, &Path) -> Path) -> Reference {
        // Absolute URI.
        if !other.scheme.is_empty() {
            return other.clone();
        }

        // Network-path reference.
        if !other.authority.is_empty() {
            return Reference::new(
                self.scheme.clone(),
                other.authority.clone(),
                other.path.clone(),
                other.query.clone(),
                other.fragment.clone(),
            );
        }

        // Absolute-path reference.
        if other.path.is_absolute() {
            return Reference::new(
                self.scheme.clone(),
                self.authority.clone(),
                other.path.clone(),
                other.query.clone(),
                other.fragment.clone(),
            );
        }

        // Same document; the fragment does not survive.
        if other.is_empty() {
            return Reference::new(
                self.scheme.clone(),
                self.authority.clone(),
                self.path.clone(),
                self.query.clone(),
                None,
            );
        }

        // Fragment-only reference.
        let fragment_only = matches!(&other.fragment, Some(f) if !f.is_empty());
        if fragment_only && other.path.is_empty() && other.query.is_empty() {
            return Reference::new(
                self.scheme.clone(),
                self.authority.clone(),
                self.path.clone(),
                self.query.clone(),
                other.fragment.clone(),
            );
        }

        // Relative-path reference.
        Reference::new(
            self.scheme.clone(),
            self.authority.clone(),
            join(&self.path, &other.path),
            other.query.clone(),
            other.fragment.clone(),
        )
    }

    /// A copy with the given query keys set; a `None` value removes
    /// the key.
    pub fn replace(&self, updates: &[(&str, Option<&str>)]) -> Reference {
        let mut query = self.query.clone();
        for (key, value) in updates {
            match value {
                Some(value) => query.insert(*key, QueryValue::One((*value).to_owned())),
                None => {
                    query.remove(key);
                }
            }
        }
        Reference::new(
            self.scheme.clone(),
            self.authority.clone(),
            self.path.clone(),
            query,
            self.fragment.clone(),
        )
    }

    /// The reference one level up, keeping query and fragment.
    pub fn parent(&self) -> Reference {
        Reference::new(
            self.scheme.clone(),
            self.authority.clone(),
            self.path.resolve2(&Path::new("../")),
            self.query.clone(),
            self.fragment.clone(),
        )
    }

    /// The last path segment, if any.
    pub fn filename(&self) -> Option<&str> {
        self.path.segments().last().map(|segment| segment.as_str())
    }

    /// A copy with the final segment's extension replaced (or appended
    /// when there is none). The leading `.` on `ext` is optional.
    pub fn with_extension(&self, ext: &str) -> Reference {
        let ext = ext.trim_start_matches('.');
        let last = self.filename().unwrap_or("");
        let prefix = match last.rfind('.') {
            Some(at) if at > 0 => &last[..at],
            _ => last,
        };
        Reference::new(
            self.scheme.clone(),
            self.authority.clone(),
            self.path.resolve2(&Path::new(format!("../{prefix}.{ext}"))),
            self.query.clone(),
            self.fragment.clone(),
        )
    }
}

/// Generic RFC2396 splitting into raw (still percent-encoded) parts.
///
/// The scheme requires a leading ASCII letter, `[A-Za-z0-9+.-]` for the
/// remainder, and a non-all-digit rest (so `a:8080` stays a path). The
/// authority follows `//` up to the next `/`, `?` or `#`. The fragment
/// is split before the query, so `p#f?x` keeps `f?x` as the fragment.
fn split_reference(text: &str) -> (String, String, String, String, Option<String>) {
    let mut url = text;
    let mut scheme = String::new();

    if let Some(colon) = url.find(':') {
        if colon > 0 {
            let candidate = &url[..colon];
            let rest = &url[colon + 1..];
            let starts_alpha = candidate.as_bytes()[0].is_ascii_alphabetic();
            let chars_ok = candidate
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'));
            let looks_like_port = !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit());
            if starts_alpha && chars_ok && !looks_like_port {
                scheme = candidate.to_ascii_lowercase();
                url = rest;
            }
        }
    }

    let mut authority = String::new();
    if let Some(rest) = url.strip_prefix("//") {
        let end = rest
            .find(['/', '?', '#'])
            .unwrap_or(rest.len());
        authority = rest[..end].to_owned();
        url = &rest[end..];
    }

    let mut fragment = None;
    if let Some((before, after)) = url.split_once('#') {
        fragment = Some(after.to_owned());
        url = before;
    }

    let mut query = String::new();
    if let Some((before, after)) = url.split_once('?') {
        query = after.to_owned();
        url = before;
    }

    (scheme, authority, url.to_owned(), query, fragment)
}

/// Break a trailing `#<digits>` fragment out of a path the generic
/// splitter did not handle. Only all-digit fragments (line numbers)
/// qualify.
fn find_fragment(path: &str, fragment: Option<String>) -> (String, Option<String>) {
    if let Some((before, after)) = path.rsplit_once('#') {
        if !after.is_empty() && after.bytes().all(|b| b.is_ascii_digit()) {
            return (before.to_owned(), Some(after.to_owned()));
        }
    }
    (path.to_owned(), fragment)
}

fn percent_decode(text: &str, what: &'static str, source: &str) -> Result<String, UriError> {
    let bytes = urlencoding::decode_binary(text.as_bytes());
    String::from_utf8(bytes.into_owned()).map_err(|_| UriError::NotUtf8 {
        component: what,
        text: source.to_owned(),
    })
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }

        let path = self.path.to_string();
        let mut out = if path == "." { String::new() } else { path };

        if !self.authority.is_empty() || out.starts_with("//") {
            if !out.is_empty() && !out.starts_with('/') {
                out.insert(0, '/');
            }
            out = format!("//{}{}", self.authority, out);
        }
        if !self.scheme.is_empty() {
            out = format!("{}:{}", self.scheme, out);
        }
        if !self.query.is_empty() {
            out.push('?');
            out.push_str(&encode_query(&self.query));
        }
        if let Some(fragment) = &self.fragment {
            if !fragment.is_empty() {
                out.push('#');
                out.push_str(fragment);
            }
        }

        if out.is_empty() {
            if self.fragment.is_some() {
                out.push('#');
            } else {
                out.push('.');
            }
        }
        f.write_str(&out)
    }
}

impl FromStr for Reference {
    type Err = UriError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Reference::parse(text)
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for Reference {}

impl std::hash::Hash for Reference {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}
