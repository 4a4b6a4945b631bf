//! Path normalisation for inbound requests.
//!
//! Clients may address the server with or without the protocol mount point
//! (`/wd/hub` by default). The normaliser strips one leading occurrence of
//! that prefix and splits what is left into a [`ParsedUri`].

pub const DEFAULT_URL_PREFIX: &str = "/wd/hub";

/// Structured view of a request path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedUri {
    source: String,
    path: String,
    query: Option<String>,
    segments: Vec<String>,
}

impl ParsedUri {
    pub fn parse(source: &str) -> Self {
        let rest = source.split_once('#').map_or(source, |(rest, _)| rest);
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (rest, None),
        };
        let segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            source: source.to_string(),
            path: path.to_string(),
            query,
            segments,
        }
    }

    /// The exact string this value was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlNormalizer {
    prefix: String,
}

impl Default for UrlNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_URL_PREFIX)
    }
}

impl UrlNormalizer {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let prefix = prefix.trim_end_matches('/').to_string();
        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Removes one leading occurrence of the prefix. The prefix must end on a
    /// segment boundary, so `/wd/hubx` is returned untouched.
    pub fn strip<'a>(&self, raw: &'a str) -> &'a str {
        if self.prefix.is_empty() {
            return raw;
        }
        match raw.strip_prefix(self.prefix.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with(['/', '?', '#']) => rest,
            _ => raw,
        }
    }

    pub fn normalize(&self, raw: &str) -> ParsedUri {
        ParsedUri::parse(self.strip(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_mount_prefix_once() {
        let normalizer = UrlNormalizer::default();
        let parsed = normalizer.normalize("/wd/hub/session/abc/url?x=1");
        assert_eq!(parsed.source(), "/session/abc/url?x=1");
        assert_eq!(parsed.path(), "/session/abc/url");
        assert_eq!(parsed.query(), Some("x=1"));
        assert_eq!(parsed.segments(), ["session", "abc", "url"]);
        assert_eq!(parsed.segment(1), Some("abc"));
    }

    #[test]
    fn normalisation_is_idempotent() {
        let normalizer = UrlNormalizer::default();
        for raw in ["/wd/hub/status", "/status", "/wd/hub", "", "/session/1/window/current/size"] {
            let once = normalizer.normalize(raw);
            let twice = normalizer.normalize(once.source());
            assert_eq!(once, twice, "path {raw:?}");
        }
    }

    #[test]
    fn prefix_must_end_on_segment_boundary() {
        let normalizer = UrlNormalizer::default();
        assert_eq!(normalizer.strip("/wd/hubble/status"), "/wd/hubble/status");
        assert_eq!(normalizer.strip("/wd/hub?x"), "?x");
        assert_eq!(normalizer.strip("/status/wd/hub"), "/status/wd/hub");
    }

    #[test]
    fn empty_prefix_keeps_path() {
        let normalizer = UrlNormalizer::new("");
        assert_eq!(normalizer.strip("/wd/hub/status"), "/wd/hub/status");
        let trailing = UrlNormalizer::new("/mount/");
        assert_eq!(trailing.prefix(), "/mount");
        assert_eq!(trailing.strip("/mount/status"), "/status");
    }

    #[test]
    fn fragment_is_dropped_from_path_and_query() {
        let parsed = ParsedUri::parse("/a/b?first=1#frag");
        assert_eq!(parsed.source(), "/a/b?first=1#frag");
        assert_eq!(parsed.path(), "/a/b");
        assert_eq!(parsed.query(), Some("first=1"));
        assert_eq!(parsed.segments(), ["a", "b"]);
        assert!(ParsedUri::parse("").segments().is_empty());
    }
}
