//! Immutable request snapshot consumed by the compiler

use bytes::Bytes;

/// Request header carrying a row range, e.g. `Range: 0-9`
pub const HEADER_RANGE: &str = "range";
/// Request header carrying client preferences
pub const HEADER_PREFER: &str = "prefer";
/// Request header describing the body media type
pub const HEADER_CONTENT_TYPE: &str = "content-type";

/// Decoded query string, preserving repeated keys and their order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse a raw (still percent-encoded) query string
    pub fn parse(query_string: &str) -> Self {
        let pairs = url::form_urlencoded::parse(query_string.as_bytes())
            .into_owned()
            .collect();
        Self { pairs }
    }

    /// Append a decoded key/value pair
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// First value for `name`, or `None` when the key is absent
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name` in request order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Distinct keys in order of first appearance
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for (k, _) in &self.pairs {
            if !keys.contains(&k.as_str()) {
                keys.push(k);
            }
        }
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Everything the compiler needs to know about one inbound request.
///
/// The body is captured once as [`Bytes`]; every stage that inspects it
/// works on a cheap clone of the same buffer, so nothing is consumed.
#[derive(Debug, Clone, Default)]
pub struct RequestDescriptor {
    query: QueryParams,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl RequestDescriptor {
    pub fn new(query: QueryParams) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }

    /// Build a descriptor from a raw query string
    pub fn from_query_string(query_string: &str) -> Self {
        Self::new(QueryParams::parse(query_string))
    }

    /// Add a header; names are matched case-insensitively
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    /// First value of header `name`; empty values count as absent
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Replayable view of the buffered body
    pub fn body(&self) -> Bytes {
        self.body.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repeated_keys() {
        let params = QueryParams::parse("id=gt.1&name=eq.a&id=lt.5");
        assert_eq!(params.keys(), vec!["id", "name"]);
        assert_eq!(params.get("id"), Some("gt.1"));
        assert_eq!(params.get_all("id").collect::<Vec<_>>(), vec!["gt.1", "lt.5"]);
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_parse_percent_encoded() {
        let params = QueryParams::parse("name=eq.hello%20world&select=a%2Cb");
        assert_eq!(params.get("name"), Some("eq.hello world"));
        assert_eq!(params.get("select"), Some("a,b"));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = RequestDescriptor::default()
            .with_header("Content-Type", "application/json")
            .with_header("Range", "");
        assert_eq!(req.header(HEADER_CONTENT_TYPE), Some("application/json"));
        assert_eq!(req.header(HEADER_RANGE), None);
        assert_eq!(req.header(HEADER_PREFER), None);
    }

    #[test]
    fn test_body_is_replayable() {
        let req = RequestDescriptor::default().with_body(r#"{"a":1}"#);
        assert_eq!(req.body(), req.body());
        assert_eq!(&req.body()[..], br#"{"a":1}"#);
    }
}
