use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::{FailedCommand, RouterError, RouterResult};
use crate::request::WireRequest;
use crate::result::{CommandOutcome, RawCommandResult};
use crate::session::SessionHandle;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
pub const NO_CACHE: &str = "no-cache";

/// The `{sessionId, status, value}` body every command answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    pub status: i64,
    pub value: Value,
}

/// `status` defaults to 0 and `value` to `{}` only when absent; an explicit
/// `false`, `0` or `null` is kept.
pub fn build_response_body(
    session_id: Option<&str>,
    status: Option<i64>,
    value: Option<Value>,
) -> Envelope {
    Envelope {
        session_id: session_id.map(str::to_string),
        status: status.unwrap_or(0),
        value: value.unwrap_or_else(|| json!({})),
    }
}

/// Raw transport response.
pub trait ResponseSink: Send {
    fn set_status(&mut self, status: StatusCode);
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);
    fn write(&mut self, chunk: &[u8]);
    fn close(&mut self);
    fn is_closed(&self) -> bool;
}

/// In-memory sink handed back to axum once the command completes.
#[derive(Debug, Default)]
pub struct BufferedSink {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    closed: bool,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseSink for BufferedSink {
    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    fn write(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Protocol-level view of one response. Once any of the closing operations
/// has run, every further write fails with [`RouterError::ResponseClosed`].
#[derive(Debug)]
pub struct WireResponse<S: ResponseSink = BufferedSink> {
    sink: S,
}

impl Default for WireResponse<BufferedSink> {
    fn default() -> Self {
        Self::new(BufferedSink::new())
    }
}

impl<S: ResponseSink> WireResponse<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn is_closed(&self) -> bool {
        self.sink.is_closed()
    }

    fn ensure_open(&self) -> RouterResult<()> {
        if self.sink.is_closed() {
            Err(RouterError::ResponseClosed)
        } else {
            Ok(())
        }
    }

    /// Applies the default protocol headers. Safe to call more than once.
    pub fn decorate(&mut self) {
        if self.sink.is_closed() {
            return;
        }
        self.sink
            .set_header(CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
        self.sink
            .set_header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    }

    pub fn set_status(&mut self, status: StatusCode) -> RouterResult<()> {
        self.ensure_open()?;
        self.sink.set_status(status);
        Ok(())
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> RouterResult<()> {
        self.ensure_open()?;
        self.sink.set_header(name, value);
        Ok(())
    }

    pub fn write(&mut self, body: &str) -> RouterResult<()> {
        self.ensure_open()?;
        self.sink.write(body.as_bytes());
        Ok(())
    }

    pub fn close(&mut self) -> RouterResult<()> {
        self.ensure_open()?;
        self.sink.close();
        Ok(())
    }

    /// Content-Length is measured on the same bytes that get written.
    pub fn write_and_close(&mut self, body: &str) -> RouterResult<()> {
        self.ensure_open()?;
        let bytes = body.as_bytes();
        self.sink.set_header(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
        self.sink.write(bytes);
        self.sink.close();
        Ok(())
    }

    pub fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> RouterResult<()> {
        self.ensure_open()?;
        let body = serde_json::to_string(value)?;
        self.write(&body)
    }

    pub fn write_json_and_close<T: Serialize + ?Sized>(&mut self, value: &T) -> RouterResult<()> {
        self.ensure_open()?;
        let body = serde_json::to_string(value)?;
        self.write_and_close(&body)
    }

    /// `None` closes without a body; `Some(value)` writes the success
    /// envelope, even when the value is `false` or `0`.
    pub fn success(&mut self, session_id: Option<&str>, value: Option<Value>) -> RouterResult<()> {
        self.set_status(StatusCode::OK)?;
        match value {
            Some(value) => {
                let body = build_response_body(session_id, Some(0), Some(value));
                self.write_json_and_close(&body)
            }
            None => self.close(),
        }
    }

    /// Writes the failure envelope for `failure` and closes.
    pub fn fail(&mut self, failure: &FailedCommand) -> RouterResult<()> {
        debug!(
            status = failure.status.name(),
            code = failure.status.code(),
            origin = %failure.origin,
            message = %failure.message,
            "command failed"
        );
        self.set_status(StatusCode::OK)?;
        self.write_json_and_close(&failure.envelope())
    }

    pub fn respond_based_on_result(
        &mut self,
        session: &dyn SessionHandle,
        request: &WireRequest,
        result: RawCommandResult,
    ) -> RouterResult<()> {
        CommandOutcome::classify(result).respond(session, request, self)
    }
}
