use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::ErrorStatus;
use crate::result::RawCommandResult;
use crate::session::Window;

/// Browser-side operations delegated to the attached engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Navigate { url: String },
    CurrentUrl,
    Title,
    Source,
    ExecuteScript { script: String, args: Vec<Value> },
}

impl EngineCommand {
    pub fn name(&self) -> &'static str {
        match self {
            EngineCommand::Navigate { .. } => "navigate",
            EngineCommand::CurrentUrl => "currentUrl",
            EngineCommand::Title => "title",
            EngineCommand::Source => "source",
            EngineCommand::ExecuteScript { .. } => "executeScript",
        }
    }
}

/// The page engine behind a session. Results come back raw and are
/// classified by the router before anything reaches the client.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn execute(
        &self,
        session_id: &str,
        window: &Window,
        command: EngineCommand,
    ) -> RawCommandResult;
}

/// Used when no engine is attached; reports every command as unknown.
pub struct NoopEngine;

#[async_trait]
impl BrowserEngine for NoopEngine {
    async fn execute(
        &self,
        _session_id: &str,
        _window: &Window,
        command: EngineCommand,
    ) -> RawCommandResult {
        RawCommandResult::Json(json!({
            "status": ErrorStatus::UnknownCommand.code(),
            "value": {
                "message": format!("'{}' is not supported without a browser engine", command.name()),
            }
        }))
    }
}
