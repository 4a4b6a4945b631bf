use axum::http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::InvalidRequest;
use crate::uri::ParsedUri;

/// The path a request carried when the router first saw it. Frozen on the
/// first re-route and never overwritten afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OriginalUrl {
    #[default]
    Unset,
    Frozen(String),
}

impl OriginalUrl {
    /// Returns `false` when a value was already frozen.
    pub fn freeze(&mut self, url: &str) -> bool {
        match self {
            OriginalUrl::Unset => {
                *self = OriginalUrl::Frozen(url.to_string());
                true
            }
            OriginalUrl::Frozen(_) => false,
        }
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            OriginalUrl::Unset => None,
            OriginalUrl::Frozen(url) => Some(url),
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self, OriginalUrl::Frozen(_))
    }
}

#[derive(Debug, Clone)]
pub struct WireRequest {
    method: Method,
    url: String,
    url_original: OriginalUrl,
    url_parsed: ParsedUri,
    post: Option<String>,
    post_raw: Option<String>,
}

impl WireRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let url = url.into();
        let url_parsed = ParsedUri::parse(&url);
        Self {
            method,
            url,
            url_original: OriginalUrl::Unset,
            url_parsed,
            post: None,
            post_raw: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.post = Some(body.into());
        self
    }

    /// Body as delivered under the transport's alternate field. Takes over
    /// the canonical body once the router consolidates the request.
    pub fn with_raw_body(mut self, body: impl Into<String>) -> Self {
        self.post_raw = Some(body.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn url_original(&self) -> &OriginalUrl {
        &self.url_original
    }

    pub fn url_parsed(&self) -> &ParsedUri {
        &self.url_parsed
    }

    pub fn post(&self) -> Option<&str> {
        self.post.as_deref()
    }

    pub fn post_raw(&self) -> Option<&str> {
        self.post_raw.as_deref()
    }

    pub(crate) fn consolidate_body(&mut self) {
        if let Some(raw) = self.post_raw.take() {
            self.post = Some(raw);
        }
    }

    pub(crate) fn freeze_original(&mut self) -> bool {
        let url = self.url.clone();
        self.url_original.freeze(&url)
    }

    pub(crate) fn set_url(&mut self, url: String) {
        self.url = url;
    }

    pub(crate) fn set_parsed(&mut self, parsed: ParsedUri) {
        self.url = parsed.source().to_string();
        self.url_parsed = parsed;
    }

    /// Parses the body as JSON. An absent or empty body counts as a missing
    /// parameter, as does a body that is not JSON.
    pub fn json_body(&self) -> Result<Value, InvalidRequest> {
        let body = self
            .post
            .as_deref()
            .map(str::trim)
            .filter(|body| !body.is_empty())
            .ok_or_else(|| InvalidRequest::MissingCommandParameters("request body".into()))?;
        serde_json::from_str(body)
            .map_err(|err| InvalidRequest::MissingCommandParameters(format!("invalid JSON body: {err}")))
    }

    pub fn parse_body<T: DeserializeOwned>(&self) -> Result<T, InvalidRequest> {
        let value = self.json_body()?;
        serde_json::from_value(value)
            .map_err(|err| InvalidRequest::MissingCommandParameters(err.to_string()))
    }

    /// `METHOD url` for error messages.
    pub fn describe(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn original_url_freezes_once() {
        let mut original = OriginalUrl::default();
        assert_eq!(original.as_deref(), None);
        assert!(original.freeze("/first"));
        assert!(!original.freeze("/second"));
        assert_eq!(original.as_deref(), Some("/first"));
        assert!(original.is_frozen());
    }

    #[test]
    fn alternate_body_replaces_canonical_body() {
        let mut request = WireRequest::new(Method::POST, "/session")
            .with_body("{\"broken\u{fffd}")
            .with_raw_body("{\"ok\":true}");
        request.consolidate_body();
        assert_eq!(request.post(), Some("{\"ok\":true}"));
        assert_eq!(request.post_raw(), None);

        let mut plain = WireRequest::new(Method::POST, "/session").with_body("{}");
        plain.consolidate_body();
        assert_eq!(plain.post(), Some("{}"));
    }

    #[test]
    fn json_body_reports_missing_parameters() {
        let empty = WireRequest::new(Method::POST, "/session/1/url");
        assert!(matches!(
            empty.json_body(),
            Err(InvalidRequest::MissingCommandParameters(_))
        ));

        let garbage = WireRequest::new(Method::POST, "/session/1/url").with_body("not json");
        assert!(garbage.json_body().is_err());

        #[derive(Deserialize)]
        struct Navigate {
            url: String,
        }
        let good = WireRequest::new(Method::POST, "/session/1/url")
            .with_body(r#"{"url":"https://example.com"}"#);
        let parsed: Navigate = good.parse_body().unwrap();
        assert_eq!(parsed.url, "https://example.com");
        assert_eq!(good.describe(), "POST /session/1/url");
    }
}
