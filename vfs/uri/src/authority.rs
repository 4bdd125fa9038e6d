//! The userinfo/host/port triple of a network-location component.

use std::fmt;

/// Server-based authority component of a reference.
///
/// No validation is applied to the host text, and the port is kept as a
/// string because ports may be symbolic. An authority with an empty
/// serialized form means "no authority".
#[derive(Clone, Debug)]
pub struct Authority {
    pub userinfo: Option<String>,
    pub host: String,
    pub port: Option<String>,
}

impl Authority {
    /// Split on the first `@` for userinfo, then the first `:` of the
    /// remainder for host:port.
    pub fn new(text: impl AsRef<str>) -> Self {
        let text = text.as_ref();
        let (userinfo, rest) = match text.split_once('@') {
            Some((userinfo, rest)) => (Some(userinfo.to_owned()), rest),
            None => (None, text),
        };
        let (host, port) = match rest.split_once(':') {
            Some((host, port)) => (host.to_owned(), Some(port.to_owned())),
            None => (rest.to_owned(), None),
        };
        Authority {
            userinfo,
            host,
            port,
        }
    }

    pub fn empty() -> Self {
        Authority::new("")
    }

    /// True when the serialized form is empty.
    pub fn is_empty(&self) -> bool {
        self.userinfo.is_none() && self.host.is_empty() && self.port.is_none()
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(userinfo) = &self.userinfo {
            write!(f, "{userinfo}@")?;
        }
        f.write_str(&self.host)?;
        if let Some(port) = &self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

impl PartialEq for Authority {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for Authority {}

impl std::hash::Hash for Authority {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}
