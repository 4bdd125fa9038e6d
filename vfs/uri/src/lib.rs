//! URI references for the virtual filesystem layer.
//!
//! Implements the RFC2396 generic syntax: [`Path`] and [`Segment`] for
//! the hierarchical part, [`Authority`] for the network location,
//! [`Query`] for the form-encoded query component, and [`Reference`]
//! tying them together with the two resolution algorithms
//! ([`Reference::resolve`] and [`Reference::resolve2`]).
//!
//! This is deliberately not an RFC3986 implementation; the older
//! grammar plus the Windows drive-letter fixups are what the rest of
//! the system is written against.

use thiserror::Error;

mod authority;
mod path;
mod query;
mod reference;

pub use authority::Authority;
pub use path::{Path, Segment};
pub use query::{decode_query, encode_query, Query, QueryValue};
pub use reference::Reference;

/// Parse failure for a reference string.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum UriError {
    /// A percent-encoded component did not decode to valid UTF-8.
    #[error("percent-decoded {component} of '{text}' is not valid UTF-8")]
    NotUtf8 {
        component: &'static str,
        text: String,
    },
}
