//! Query component, `application/x-www-form-urlencoded`.
//!
//! The query is decoded into a mapping that preserves first-occurrence
//! key order. A key may carry no value at all (`?a&b=1`); such bare
//! keys must survive re-encoding, so they are kept as a distinct
//! [`QueryValue::Flag`] variant instead of being dropped.

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;

/// The value(s) associated with one query key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryValue {
    /// A bare key with no `=` at all.
    Flag,
    One(String),
    /// The same key repeated; values in encounter order.
    Many(Vec<String>),
}

impl QueryValue {
    /// The first value, if any.
    pub fn first(&self) -> Option<&str> {
        match self {
            QueryValue::Flag => None,
            QueryValue::One(value) => Some(value),
            QueryValue::Many(values) => values.first().map(String::as_str),
        }
    }
}

/// Ordered key-to-value(s) mapping for the query component.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query(IndexMap<String, QueryValue>);

impl Query {
    pub fn new() -> Self {
        Query(IndexMap::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: QueryValue) {
        self.0.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<QueryValue> {
        self.0.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &QueryValue)> {
        self.0.iter()
    }

    fn push(&mut self, key: String, value: Option<String>) {
        match self.0.get_mut(&key) {
            None => {
                let value = match value {
                    Some(value) => QueryValue::One(value),
                    None => QueryValue::Flag,
                };
                self.0.insert(key, value);
            }
            Some(existing) => {
                // A repeated bare key contributes an empty value.
                let value = value.unwrap_or_default();
                match existing {
                    QueryValue::Many(values) => values.push(value),
                    QueryValue::One(first) => {
                        *existing = QueryValue::Many(vec![std::mem::take(first), value]);
                    }
                    QueryValue::Flag => {
                        *existing = QueryValue::Many(vec![String::new(), value]);
                    }
                }
            }
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_query(self))
    }
}

fn quote_plus(text: &str) -> String {
    // `urlencoding` leaves spaces as %20; the form encoding wants '+'.
    urlencoding::encode(text).replace("%20", "+")
}

fn unquote_plus(text: &str) -> String {
    let spaced = text.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    match bytes {
        Cow::Borrowed(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Cow::Owned(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
    }
}

/// Decode `a=1&b=2` into a [`Query`]. Empty `&&` runs are skipped;
/// repeated keys grow a list in encounter order.
pub fn decode_query(data: &str) -> Query {
    let mut query = Query::new();
    if data.is_empty() {
        return query;
    }
    for item in data.split('&') {
        if item.is_empty() {
            continue;
        }
        match item.split_once('=') {
            Some((key, value)) => query.push(unquote_plus(key), Some(unquote_plus(value))),
            None => query.push(unquote_plus(item), None),
        }
    }
    query
}

/// Encode a [`Query`] as `application/x-www-form-urlencoded` text:
/// `+` for space, UTF-8 percent escapes, bare keys for flags.
pub fn encode_query(query: &Query) -> String {
    let mut line = Vec::with_capacity(query.len());
    for (key, value) in query.iter() {
        let key = quote_plus(key);
        match value {
            QueryValue::Flag => line.push(key),
            QueryValue::One(value) => line.push(format!("{key}={}", quote_plus(value))),
            QueryValue::Many(values) => {
                for value in values {
                    line.push(format!("{key}={}", quote_plus(value)));
                }
            }
        }
    }
    line.join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_simple_pairs() {
        let query = decode_query("a=1&b=2");
        assert_eq!(query.get("a"), Some(&QueryValue::One("1".into())));
        assert_eq!(query.get("b"), Some(&QueryValue::One("2".into())));
    }

    #[test]
    fn repeated_keys_collect_in_order() {
        let query = decode_query("b=2&a=1&b=3");
        assert_eq!(
            query.get("b"),
            Some(&QueryValue::Many(vec!["2".into(), "3".into()]))
        );
        let keys: Vec<_> = query.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn bare_keys_survive_round_trip() {
        let query = decode_query("a&b=1");
        assert_eq!(query.get("a"), Some(&QueryValue::Flag));
        assert_eq!(encode_query(&query), "a&b=1");
    }

    #[test]
    fn round_trip_with_lists() {
        let mut query = Query::new();
        query.insert("a", QueryValue::One("1".into()));
        query.insert("b", QueryValue::Many(vec!["2".into(), "3".into()]));
        let encoded = encode_query(&query);
        assert_eq!(encoded, "a=1&b=2&b=3");
        assert_eq!(decode_query(&encoded), query);
    }

    #[test]
    fn plus_and_percent_escapes() {
        let mut query = Query::new();
        query.insert("key one", QueryValue::One("a value/with&stuff".into()));
        let encoded = encode_query(&query);
        assert_eq!(encoded, "key+one=a+value%2Fwith%26stuff");
        assert_eq!(decode_query(&encoded), query);
    }

    #[test]
    fn utf8_values_are_percent_encoded() {
        let mut query = Query::new();
        query.insert("q", QueryValue::One("café".into()));
        let encoded = encode_query(&query);
        assert_eq!(encoded, "q=caf%C3%A9");
        assert_eq!(decode_query(&encoded), query);
    }

    #[test]
    fn empty_runs_are_skipped() {
        let query = decode_query("&&a=1&&");
        assert_eq!(query.len(), 1);
        assert_eq!(decode_query(""), Query::new());
    }
}
