use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::{invalid_method, path_segments, unknown_command};
use crate::engine::{BrowserEngine, EngineCommand};
use crate::errors::{
    create_failed_command, ErrorStatus, InvalidRequest, RouterError, RouterResult,
};
use crate::model::{ExecuteScriptRequest, NavigateToUrlRequest, SwitchWindowRequest};
use crate::request::WireRequest;
use crate::response::WireResponse;
use crate::router::CommandHandler;
use crate::session::{
    get_current_window, get_window, Session, SessionHandle, Window, WindowPosition, WindowRef,
    WindowSize,
};

const ORIGIN: &str = "SessionHandler";

/// Serves the commands of one session, reached through a re-route that
/// removed the `/session/:id` prefix.
pub struct SessionHandler {
    session: Arc<Session>,
    engine: Arc<dyn BrowserEngine>,
}

impl SessionHandler {
    pub fn new(session: Arc<Session>, engine: Arc<dyn BrowserEngine>) -> Self {
        Self { session, engine }
    }

    fn id(&self) -> &str {
        self.session.id()
    }

    fn view(&self) -> &dyn SessionHandle {
        &*self.session
    }

    fn switch_window(&self, request: &WireRequest, response: &mut WireResponse) -> RouterResult<()> {
        let req: SwitchWindowRequest = request.parse_body()?;
        let target = req
            .target()
            .ok_or_else(|| InvalidRequest::MissingCommandParameters("name".into()))?;
        let window = get_window(
            &WindowRef::Named(target.to_string()),
            self.view(),
            request,
        )?;
        self.activate(&window, request, response)
    }

    /// Makes an already resolved window current. The window may have been
    /// closed since it was resolved.
    fn activate(
        &self,
        window: &Window,
        request: &WireRequest,
        response: &mut WireResponse,
    ) -> RouterResult<()> {
        if self.session.switch_to(&window.handle).is_none() {
            return Err(self.vanished(&window.handle, request));
        }
        debug!(session = self.id(), window = %window.handle, "switched window");
        response.success(Some(self.id()), None)
    }

    fn close_window(&self, request: &WireRequest, response: &mut WireResponse) -> RouterResult<()> {
        let window = get_current_window(self.view(), request)?;
        self.close(&window, request, response)
    }

    fn close(
        &self,
        window: &Window,
        request: &WireRequest,
        response: &mut WireResponse,
    ) -> RouterResult<()> {
        if self.session.close_window(&window.handle).is_none() {
            return Err(self.vanished(&window.handle, request));
        }
        debug!(session = self.id(), window = %window.handle, "closed window");
        response.success(Some(self.id()), None)
    }

    /// A window that resolved but was gone by the time it was changed.
    fn vanished(&self, handle_or_name: &str, request: &WireRequest) -> RouterError {
        create_failed_command(
            ErrorStatus::NoSuchWindow,
            format!("Window handle/name '{handle_or_name}' is invalid (closed?)"),
            Some(request),
            Some(self.view()),
            ORIGIN,
        )
        .into()
    }

    fn resolve(&self, segment: &str, request: &WireRequest) -> RouterResult<Window> {
        Ok(get_window(
            &WindowRef::from_segment(segment),
            self.view(),
            request,
        )?)
    }

    fn update_window<F>(
        &self,
        segment: &str,
        request: &WireRequest,
        response: &mut WireResponse,
        update: F,
    ) -> RouterResult<()>
    where
        F: FnOnce(&mut Window),
    {
        let window = self.resolve(segment, request)?;
        if self.session.update_window(&window.handle, update).is_none() {
            return Err(self.vanished(segment, request));
        }
        response.success(Some(self.id()), None)
    }

    async fn run_engine(
        &self,
        command: EngineCommand,
        request: &WireRequest,
        response: &mut WireResponse,
    ) -> RouterResult<()> {
        let window = get_current_window(self.view(), request)?;
        debug!(session = self.id(), command = command.name(), "dispatching to engine");
        let result = self.engine.execute(self.id(), &window, command).await;
        response.respond_based_on_result(self.view(), request, result)
    }

    fn navigate_command(&self, request: &WireRequest) -> RouterResult<EngineCommand> {
        let req: NavigateToUrlRequest = request.parse_body()?;
        if req.url.trim().is_empty() {
            return Err(InvalidRequest::MissingCommandParameters("url".into()).into());
        }
        let parsed = Url::parse(&req.url).map_err(|err| {
            create_failed_command(
                ErrorStatus::UnknownError,
                format!("Invalid URL '{}': {err}", req.url),
                Some(request),
                Some(self.view()),
                ORIGIN,
            )
        })?;
        Ok(EngineCommand::Navigate {
            url: parsed.to_string(),
        })
    }
}

#[async_trait]
impl CommandHandler for SessionHandler {
    async fn handle(
        &self,
        request: &mut WireRequest,
        response: &mut WireResponse,
    ) -> RouterResult<()> {
        let owned = path_segments(request);
        let segments: Vec<&str> = owned.iter().map(String::as_str).collect();
        let method = request.method().clone();

        match (&method, segments.as_slice()) {
            (&Method::GET, []) => {
                response.success(Some(self.id()), Some(self.session.capabilities().clone()))
            }
            (&Method::GET, ["window_handle"]) => {
                let window = get_current_window(self.view(), request)?;
                response.success(Some(self.id()), Some(json!(window.handle)))
            }
            (&Method::GET, ["window_handles"]) => {
                response.success(Some(self.id()), Some(json!(self.session.window_handles())))
            }
            (&Method::POST, ["window"]) => self.switch_window(request, response),
            (&Method::DELETE, ["window"]) => self.close_window(request, response),
            (&Method::GET, ["window", handle, "size"]) => {
                let window = self.resolve(handle, request)?;
                response.success(Some(self.id()), Some(serde_json::to_value(window.size)?))
            }
            (&Method::POST, ["window", handle, "size"]) => {
                let size: WindowSize = request.parse_body()?;
                self.update_window(handle, request, response, |w| w.size = size)
            }
            (&Method::GET, ["window", handle, "position"]) => {
                let window = self.resolve(handle, request)?;
                response.success(Some(self.id()), Some(serde_json::to_value(window.position)?))
            }
            (&Method::POST, ["window", handle, "position"]) => {
                let position: WindowPosition = request.parse_body()?;
                self.update_window(handle, request, response, |w| w.position = position)
            }
            (&Method::GET, ["url"]) => {
                self.run_engine(EngineCommand::CurrentUrl, request, response)
                    .await
            }
            (&Method::POST, ["url"]) => {
                let command = self.navigate_command(request)?;
                self.run_engine(command, request, response).await
            }
            (&Method::GET, ["title"]) => self.run_engine(EngineCommand::Title, request, response).await,
            (&Method::GET, ["source"]) => {
                self.run_engine(EngineCommand::Source, request, response)
                    .await
            }
            (&Method::POST, ["execute"]) => {
                let req: ExecuteScriptRequest = request.parse_body()?;
                let command = EngineCommand::ExecuteScript {
                    script: req.script,
                    args: req.args,
                };
                self.run_engine(command, request, response).await
            }
            (_, path) if is_known_path(path) => Err(invalid_method(request)),
            _ => Err(unknown_command(request)),
        }
    }
}

fn is_known_path(segments: &[&str]) -> bool {
    matches!(
        segments,
        [] | ["window_handle"]
            | ["window_handles"]
            | ["window"]
            | ["window", _, "size" | "position"]
            | ["url"]
            | ["title"]
            | ["source"]
            | ["execute"]
    )
}
