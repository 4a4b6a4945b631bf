use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use dashmap::DashMap;
use serde_json::{json, Map, Value};
use tracing::info;

use super::{invalid_method, path_segments, unknown_command};
use crate::engine::BrowserEngine;
use crate::errors::{create_failed_command, ErrorStatus, InvalidRequest, RouterError, RouterResult};
use crate::handlers::SessionHandler;
use crate::model::{BuildInfo, NewSessionRequest, OsInfo, SessionSummary, StatusValue};
use crate::request::WireRequest;
use crate::response::WireResponse;
use crate::router::{CommandHandler, RequestRouter};
use crate::session::{SessionHandle, SessionRegistry};
use crate::uri::UrlNormalizer;

const ORIGIN: &str = "RootHandler";

/// Capabilities a client cannot override.
const RESERVED_CAPABILITIES: [&str; 3] = ["browserName", "version", "platform"];

pub struct RootHandler {
    normalizer: UrlNormalizer,
    sessions: Arc<SessionRegistry>,
    session_routers: DashMap<String, RequestRouter>,
    engine: Arc<dyn BrowserEngine>,
    build: BuildInfo,
}

impl RootHandler {
    pub fn new(
        normalizer: UrlNormalizer,
        sessions: Arc<SessionRegistry>,
        engine: Arc<dyn BrowserEngine>,
        build: BuildInfo,
    ) -> Self {
        Self {
            normalizer,
            sessions,
            session_routers: DashMap::new(),
            engine,
            build,
        }
    }

    fn status(&self, response: &mut WireResponse) -> RouterResult<()> {
        let status = StatusValue {
            build: self.build.clone(),
            os: OsInfo::current(),
        };
        response.success(None, Some(serde_json::to_value(status)?))
    }

    fn list_sessions(&self, response: &mut WireResponse) -> RouterResult<()> {
        let sessions: Vec<SessionSummary> = self
            .sessions
            .list()
            .iter()
            .map(|session| SessionSummary {
                id: session.id().to_string(),
                capabilities: session.capabilities().clone(),
            })
            .collect();
        response.success(None, Some(serde_json::to_value(sessions)?))
    }

    fn create_session(
        &self,
        request: &WireRequest,
        response: &mut WireResponse,
    ) -> RouterResult<()> {
        let req: NewSessionRequest = request.parse_body()?;
        let capabilities = negotiate_capabilities(&req.desired_capabilities)?;

        let session = self.sessions.create(capabilities.clone());
        let handler = SessionHandler::new(Arc::clone(&session), Arc::clone(&self.engine));
        self.session_routers.insert(
            session.id().to_string(),
            RequestRouter::new(self.normalizer.clone(), Arc::new(handler)),
        );
        info!(session = session.id(), "session created");

        response.success(Some(session.id()), Some(capabilities))
    }

    fn delete_session(
        &self,
        session_id: &str,
        request: &WireRequest,
        response: &mut WireResponse,
    ) -> RouterResult<()> {
        self.session_routers.remove(session_id);
        match self.sessions.remove(session_id) {
            Some(session) => {
                info!(session = session.id(), "session deleted");
                response.success(Some(session.id()), None)
            }
            None => Err(no_such_session(session_id, request)),
        }
    }

    async fn route_to_session(
        &self,
        session_id: &str,
        request: &mut WireRequest,
        response: &mut WireResponse,
    ) -> RouterResult<()> {
        let router = self
            .session_routers
            .get(session_id)
            .map(|entry| entry.value().clone());
        let Some(router) = router else {
            return Err(no_such_session(session_id, request));
        };
        let prefix = format!("/session/{session_id}");
        router.reroute(request, response, &prefix).await;
        Ok(())
    }
}

#[async_trait]
impl CommandHandler for RootHandler {
    async fn handle(
        &self,
        request: &mut WireRequest,
        response: &mut WireResponse,
    ) -> RouterResult<()> {
        let owned = path_segments(request);
        let segments: Vec<&str> = owned.iter().map(String::as_str).collect();
        let method = request.method().clone();

        match (&method, segments.as_slice()) {
            (&Method::GET, ["status"]) => self.status(response),
            (&Method::GET, ["sessions"]) => self.list_sessions(response),
            (&Method::POST, ["session"]) => self.create_session(request, response),
            (&Method::DELETE, ["session", id]) => self.delete_session(id, request, response),
            (_, ["session", id, ..]) => self.route_to_session(id, request, response).await,
            (_, ["status"] | ["sessions"] | ["session"]) => Err(invalid_method(request)),
            _ => Err(unknown_command(request)),
        }
    }
}

fn no_such_session(session_id: &str, request: &WireRequest) -> RouterError {
    create_failed_command(
        ErrorStatus::NoSuchDriver,
        format!("Session '{session_id}' not found"),
        Some(request),
        None,
        ORIGIN,
    )
    .into()
}

fn default_capabilities() -> Map<String, Value> {
    let defaults = json!({
        "browserName": "wirehub",
        "version": env!("CARGO_PKG_VERSION"),
        "platform": std::env::consts::OS,
        "javascriptEnabled": true,
        "takesScreenshot": false,
        "handlesAlerts": false,
        "databaseEnabled": false,
        "locationContextEnabled": false,
        "applicationCacheEnabled": false,
        "browserConnectionEnabled": false,
        "cssSelectorsEnabled": true,
        "webStorageEnabled": false,
        "rotatable": false,
        "acceptSslCerts": false,
        "nativeEvents": true,
    });
    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn negotiate_capabilities(desired: &Value) -> Result<Value, InvalidRequest> {
    let Value::Object(desired) = desired else {
        return Err(InvalidRequest::MissingCommandParameters(
            "desiredCapabilities must be an object".into(),
        ));
    };
    let mut capabilities = default_capabilities();
    for (key, value) in desired {
        if !RESERVED_CAPABILITIES.contains(&key.as_str()) {
            capabilities.insert(key.clone(), value.clone());
        }
    }
    Ok(Value::Object(capabilities))
}
