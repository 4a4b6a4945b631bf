use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, Uri},
    response::Response,
    Router,
};
use tracing::{warn, Instrument};

use crate::engine::{BrowserEngine, NoopEngine};
use crate::errors::{handle_failed_command, ErrorStatus};
use crate::handlers::RootHandler;
use crate::model::BuildInfo;
use crate::request::WireRequest;
use crate::response::WireResponse;
use crate::router::RequestRouter;
use crate::session::SessionRegistry;
use crate::trace::RouterTracer;
use crate::uri::{UrlNormalizer, DEFAULT_URL_PREFIX};

const ORIGIN: &str = "WireServer";
const ABANDONED_MESSAGE: &str = "Command finished without writing a response";

/// Builds the HTTP front end: every request lands on a single fallback that
/// hands it to the root [`RequestRouter`].
#[derive(Clone)]
pub struct WireServer {
    url_prefix: String,
    engine: Arc<dyn BrowserEngine>,
    build: BuildInfo,
    tracer: RouterTracer,
    sessions: Arc<SessionRegistry>,
}

impl Default for WireServer {
    fn default() -> Self {
        Self::new(DEFAULT_URL_PREFIX)
    }
}

impl WireServer {
    pub fn new(url_prefix: impl Into<String>) -> Self {
        Self {
            url_prefix: url_prefix.into(),
            engine: Arc::new(NoopEngine),
            build: BuildInfo::default(),
            tracer: RouterTracer,
            sessions: Arc::new(SessionRegistry::default()),
        }
    }

    pub fn with_engine(mut self, engine: Arc<dyn BrowserEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_build_info(mut self, build: BuildInfo) -> Self {
        self.build = build;
        self
    }

    pub fn sessions(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.sessions)
    }

    pub fn build(self) -> Router {
        let normalizer = UrlNormalizer::new(self.url_prefix);
        let root = RootHandler::new(normalizer.clone(), self.sessions, self.engine, self.build);
        Router::new().fallback(dispatch).with_state(WireCtx {
            router: RequestRouter::new(normalizer, Arc::new(root)),
            tracer: self.tracer,
        })
    }
}

#[derive(Clone)]
struct WireCtx {
    router: RequestRouter,
    tracer: RouterTracer,
}

async fn dispatch(
    State(ctx): State<WireCtx>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let url = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let span = ctx.tracer.span(method.as_str(), uri.path());

    let mut request = WireRequest::new(method, url);
    if !body.is_empty() {
        request = request.with_body(String::from_utf8_lossy(&body).into_owned());
        if let Ok(exact) = std::str::from_utf8(&body) {
            request = request.with_raw_body(exact);
        }
    }

    let mut response = WireResponse::default();
    async {
        ctx.router.handle(&mut request, &mut response).await;
        close_abandoned(&request, &mut response);
    }
    .instrument(span)
    .await;

    response.into_sink().into_response()
}

/// Closes a response the command layer left open with an UnknownError
/// failure, so the client never waits on a silent handler.
fn close_abandoned(request: &WireRequest, response: &mut WireResponse) {
    if response.is_closed() {
        return;
    }
    warn!(url = request.url(), "handler left the response open");
    if let Err(err) = handle_failed_command(
        ErrorStatus::UnknownError,
        ABANDONED_MESSAGE,
        request,
        response,
        None,
        ORIGIN,
    ) {
        warn!(error = %err, "failed to close abandoned response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RouterResult;
    use crate::router::CommandHandler;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, HeaderMap, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(router: &Router, method: Method, path: &str, body: Option<Value>) -> (StatusCode, HeaderMap, Value) {
        let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(body)
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, value)
    }

    #[tokio::test]
    async fn status_is_served_with_and_without_prefix() {
        let router = WireServer::default().build();
        for path in ["/wd/hub/status", "/status"] {
            let (status, headers, body) = call(&router, Method::GET, path, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(
                headers.get(header::CONTENT_TYPE).unwrap(),
                "application/json; charset=UTF-8"
            );
            assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-cache");
            assert_eq!(body["status"], 0);
        }
    }

    #[tokio::test]
    async fn content_length_matches_body() {
        let router = WireServer::default().build();
        let request = Request::builder()
            .uri("/wd/hub/status")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let declared: usize = response.headers()[header::CONTENT_LENGTH]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(declared, bytes.len());
    }

    #[tokio::test]
    async fn session_round_trip_over_http() {
        let server = WireServer::new("/wd/hub");
        let sessions = server.sessions();
        let router = server.build();

        let (_, _, created) = call(
            &router,
            Method::POST,
            "/wd/hub/session",
            Some(json!({ "desiredCapabilities": {} })),
        )
        .await;
        let id = created["sessionId"].as_str().unwrap().to_string();
        assert_eq!(sessions.len(), 1);

        let (_, _, handle) = call(&router, Method::GET, &format!("/wd/hub/session/{id}/window_handle"), None).await;
        assert_eq!(handle["sessionId"], id.as_str());
        assert!(handle["value"].is_string());

        // no engine attached
        let (status, _, title) = call(&router, Method::GET, &format!("/wd/hub/session/{id}/title"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(title["status"], ErrorStatus::UnknownCommand.code());

        let (status, _, _) = call(&router, Method::DELETE, &format!("/wd/hub/session/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn prefix_only_matches_whole_segments() {
        let router = WireServer::default().build();
        let (status, _, body) = call(&router, Method::GET, "/wd/hubstatus", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], ErrorStatus::UnknownCommand.code());
    }

    #[tokio::test]
    async fn non_utf8_body_is_decoded_lossily() {
        let router = WireServer::default().build();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/session")
            .body(Body::from(vec![0xff, 0xfe]))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    /// Returns without touching the response.
    struct Silent;

    #[async_trait]
    impl CommandHandler for Silent {
        async fn handle(
            &self,
            _request: &mut WireRequest,
            _response: &mut WireResponse,
        ) -> RouterResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn silent_handler_response_is_closed_with_unknown_error() {
        let router = RequestRouter::new(UrlNormalizer::default(), Arc::new(Silent));
        let mut request = WireRequest::new(Method::GET, "/wd/hub/quiet");
        let mut response = WireResponse::default();

        router.handle(&mut request, &mut response).await;
        assert!(!response.is_closed());
        close_abandoned(&request, &mut response);

        assert!(response.is_closed());
        let sink = response.into_sink();
        assert_eq!(sink.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(sink.body()).unwrap();
        assert_eq!(
            body,
            json!({
                "sessionId": null,
                "status": ErrorStatus::UnknownError.code(),
                "value": { "message": ABANDONED_MESSAGE }
            })
        );
    }

    #[tokio::test]
    async fn closed_response_is_left_alone() {
        let request = WireRequest::new(Method::GET, "/status");
        let mut response = WireResponse::default();
        response.success(None, Some(json!(1))).unwrap();
        let before = response.sink().body().to_vec();

        close_abandoned(&request, &mut response);
        assert_eq!(response.sink().body(), before.as_slice());
    }
}
