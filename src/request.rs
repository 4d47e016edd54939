//! Raw request pieces handed to the binder.

use std::collections::HashMap;

use indexmap::IndexMap;
use percent_encoding::percent_decode_str;
use tracing::trace;

/// Path values keyed by template placeholder name.
pub type PathValues = HashMap<String, String>;

/// Query values keyed by parameter name, in first-seen order.
///
/// Repeated keys collect every value in the order they appeared.
pub type QueryValues = IndexMap<String, Vec<String>>;

/// Split a request target into its path and query string.
///
/// The query string excludes the `?`. Any fragment is dropped.
pub fn split_target(target: &str) -> (&str, &str) {
    let target = target.split('#').next().unwrap_or(target);
    match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    }
}

/// Parse a query string into a multi-valued map.
///
/// Keys and values are form-urldecoded (`+` is a space). A leading `?` is
/// ignored. A key without `=` yields an empty value.
pub fn parse_query(query: &str) -> QueryValues {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut values = QueryValues::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        values
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    trace!(keys = values.len(), "query string parsed");
    values
}

/// Percent-decode one path segment.
pub(crate) fn decode_segment(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}
