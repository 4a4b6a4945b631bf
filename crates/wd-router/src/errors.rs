use std::collections::HashMap;
use std::fmt;

use axum::http::StatusCode;
use once_cell::sync::Lazy;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::request::WireRequest;
use crate::response::{build_response_body, ResponseSink, WireResponse};
use crate::session::SessionHandle;

/// Failure statuses of the JSON wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    Success,
    NoSuchDriver,
    NoSuchElement,
    NoSuchFrame,
    UnknownCommand,
    StaleElementReference,
    ElementNotVisible,
    InvalidElementState,
    UnknownError,
    ElementIsNotSelectable,
    JavaScriptError,
    XPathLookupError,
    Timeout,
    NoSuchWindow,
    InvalidCookieDomain,
    UnableToSetCookie,
    UnexpectedAlertOpen,
    NoAlertOpenError,
    ScriptTimeout,
    InvalidElementCoordinates,
    ImeNotAvailable,
    ImeEngineActivationFailed,
    InvalidSelector,
    SessionNotCreatedException,
    MoveTargetOutOfBounds,
    /// A code reported by an engine that is not part of the table. The
    /// numeric value is kept so it reaches the client unchanged.
    Unrecognized(i64),
}

impl ErrorStatus {
    pub const ALL: [ErrorStatus; 25] = [
        ErrorStatus::Success,
        ErrorStatus::NoSuchDriver,
        ErrorStatus::NoSuchElement,
        ErrorStatus::NoSuchFrame,
        ErrorStatus::UnknownCommand,
        ErrorStatus::StaleElementReference,
        ErrorStatus::ElementNotVisible,
        ErrorStatus::InvalidElementState,
        ErrorStatus::UnknownError,
        ErrorStatus::ElementIsNotSelectable,
        ErrorStatus::JavaScriptError,
        ErrorStatus::XPathLookupError,
        ErrorStatus::Timeout,
        ErrorStatus::NoSuchWindow,
        ErrorStatus::InvalidCookieDomain,
        ErrorStatus::UnableToSetCookie,
        ErrorStatus::UnexpectedAlertOpen,
        ErrorStatus::NoAlertOpenError,
        ErrorStatus::ScriptTimeout,
        ErrorStatus::InvalidElementCoordinates,
        ErrorStatus::ImeNotAvailable,
        ErrorStatus::ImeEngineActivationFailed,
        ErrorStatus::InvalidSelector,
        ErrorStatus::SessionNotCreatedException,
        ErrorStatus::MoveTargetOutOfBounds,
    ];

    pub fn code(&self) -> i64 {
        match self {
            ErrorStatus::Success => 0,
            ErrorStatus::NoSuchDriver => 6,
            ErrorStatus::NoSuchElement => 7,
            ErrorStatus::NoSuchFrame => 8,
            ErrorStatus::UnknownCommand => 9,
            ErrorStatus::StaleElementReference => 10,
            ErrorStatus::ElementNotVisible => 11,
            ErrorStatus::InvalidElementState => 12,
            ErrorStatus::UnknownError => 13,
            ErrorStatus::ElementIsNotSelectable => 15,
            ErrorStatus::JavaScriptError => 17,
            ErrorStatus::XPathLookupError => 19,
            ErrorStatus::Timeout => 21,
            ErrorStatus::NoSuchWindow => 23,
            ErrorStatus::InvalidCookieDomain => 24,
            ErrorStatus::UnableToSetCookie => 25,
            ErrorStatus::UnexpectedAlertOpen => 26,
            ErrorStatus::NoAlertOpenError => 27,
            ErrorStatus::ScriptTimeout => 28,
            ErrorStatus::InvalidElementCoordinates => 29,
            ErrorStatus::ImeNotAvailable => 30,
            ErrorStatus::ImeEngineActivationFailed => 31,
            ErrorStatus::InvalidSelector => 32,
            ErrorStatus::SessionNotCreatedException => 33,
            ErrorStatus::MoveTargetOutOfBounds => 34,
            ErrorStatus::Unrecognized(code) => *code,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorStatus::Success => "Success",
            ErrorStatus::NoSuchDriver => "NoSuchDriver",
            ErrorStatus::NoSuchElement => "NoSuchElement",
            ErrorStatus::NoSuchFrame => "NoSuchFrame",
            ErrorStatus::UnknownCommand => "UnknownCommand",
            ErrorStatus::StaleElementReference => "StaleElementReference",
            ErrorStatus::ElementNotVisible => "ElementNotVisible",
            ErrorStatus::InvalidElementState => "InvalidElementState",
            ErrorStatus::UnknownError => "UnknownError",
            ErrorStatus::ElementIsNotSelectable => "ElementIsNotSelectable",
            ErrorStatus::JavaScriptError => "JavaScriptError",
            ErrorStatus::XPathLookupError => "XPathLookupError",
            ErrorStatus::Timeout => "Timeout",
            ErrorStatus::NoSuchWindow => "NoSuchWindow",
            ErrorStatus::InvalidCookieDomain => "InvalidCookieDomain",
            ErrorStatus::UnableToSetCookie => "UnableToSetCookie",
            ErrorStatus::UnexpectedAlertOpen => "UnexpectedAlertOpen",
            ErrorStatus::NoAlertOpenError => "NoAlertOpenError",
            ErrorStatus::ScriptTimeout => "ScriptTimeout",
            ErrorStatus::InvalidElementCoordinates => "InvalidElementCoordinates",
            ErrorStatus::ImeNotAvailable => "IMENotAvailable",
            ErrorStatus::ImeEngineActivationFailed => "IMEEngineActivationFailed",
            ErrorStatus::InvalidSelector => "InvalidSelector",
            ErrorStatus::SessionNotCreatedException => "SessionNotCreatedException",
            ErrorStatus::MoveTargetOutOfBounds => "MoveTargetOutOfBounds",
            ErrorStatus::Unrecognized(_) => "UnknownError",
        }
    }

    /// Reverse lookup; codes outside the table become `Unrecognized`.
    pub fn from_code(code: i64) -> Self {
        BY_CODE
            .get(&code)
            .copied()
            .unwrap_or(ErrorStatus::Unrecognized(code))
    }

    pub fn from_name(name: &str) -> Option<Self> {
        BY_NAME.get(name).copied()
    }

    pub fn is_success(&self) -> bool {
        self.code() == 0
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static BY_CODE: Lazy<HashMap<i64, ErrorStatus>> = Lazy::new(|| {
    ErrorStatus::ALL
        .iter()
        .map(|status| (status.code(), *status))
        .collect()
});

static BY_NAME: Lazy<HashMap<&'static str, ErrorStatus>> = Lazy::new(|| {
    ErrorStatus::ALL
        .iter()
        .map(|status| (status.name(), *status))
        .collect()
});

/// Where a failure was raised, kept for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSummary {
    pub method: String,
    pub url: String,
}

impl From<&WireRequest> for RequestSummary {
    fn from(request: &WireRequest) -> Self {
        Self {
            method: request.method().to_string(),
            url: request.url().to_string(),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{status}: {message}")]
pub struct FailedCommand {
    pub status: ErrorStatus,
    pub message: String,
    pub session_id: Option<String>,
    pub request: Option<RequestSummary>,
    pub origin: String,
}

impl FailedCommand {
    /// Wire body for this failure: `{sessionId, status, value: {message}}`.
    pub fn envelope(&self) -> crate::response::Envelope {
        build_response_body(
            self.session_id.as_deref(),
            Some(self.status.code()),
            Some(json!({ "message": self.message })),
        )
    }
}

pub fn create_failed_command(
    status: ErrorStatus,
    message: impl Into<String>,
    request: Option<&WireRequest>,
    session: Option<&dyn SessionHandle>,
    origin: &str,
) -> FailedCommand {
    FailedCommand {
        status,
        message: message.into(),
        session_id: session.map(|session| session.id().to_string()),
        request: request.map(RequestSummary::from),
        origin: origin.to_string(),
    }
}

/// Writes the failure envelope and closes `response`.
pub fn handle_failed_command<S: ResponseSink>(
    status: ErrorStatus,
    message: impl Into<String>,
    request: &WireRequest,
    response: &mut WireResponse<S>,
    session: Option<&dyn SessionHandle>,
    origin: &str,
) -> RouterResult<()> {
    let failure = create_failed_command(status, message, Some(request), session, origin);
    response.fail(&failure)
}

/// Request-level problems, reported with their own HTTP status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidRequest {
    #[error("Unknown Command - {0}")]
    UnknownCommand(String),
    #[error("Unimplemented Command - {0}")]
    UnimplementedCommand(String),
    #[error("Variable Resource Not Found - {0}")]
    VariableResourceNotFound(String),
    #[error("Invalid Command Method - {0}")]
    InvalidCommandMethod(String),
    #[error("Missing Command Parameter - {0}")]
    MissingCommandParameters(String),
}

impl InvalidRequest {
    pub fn http_status(&self) -> StatusCode {
        match self {
            InvalidRequest::UnknownCommand(_) => StatusCode::NOT_FOUND,
            InvalidRequest::UnimplementedCommand(_) => StatusCode::NOT_IMPLEMENTED,
            InvalidRequest::VariableResourceNotFound(_) => StatusCode::NOT_FOUND,
            InvalidRequest::InvalidCommandMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            InvalidRequest::MissingCommandParameters(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn wire_status(&self) -> ErrorStatus {
        match self {
            InvalidRequest::MissingCommandParameters(_) => ErrorStatus::UnknownError,
            _ => ErrorStatus::UnknownCommand,
        }
    }
}

pub fn handle_invalid_request<S: ResponseSink>(
    kind: &InvalidRequest,
    request: &WireRequest,
    response: &mut WireResponse<S>,
) -> RouterResult<()> {
    debug!(method = %request.method(), url = request.url(), error = %kind, "invalid request");
    let body = build_response_body(
        None,
        Some(kind.wire_status().code()),
        Some(json!({ "message": kind.to_string() })),
    );
    response.set_status(kind.http_status())?;
    response.write_json_and_close(&body)
}

/// Terminal response for a command result that could not be parsed at all.
pub fn handle_invalid_req_invalid_command_method<S: ResponseSink>(
    request: &WireRequest,
    response: &mut WireResponse<S>,
    detail: &str,
) -> RouterResult<()> {
    warn!(url = request.url(), detail, "command produced a malformed result");
    let kind = InvalidRequest::InvalidCommandMethod(format!("malformed command result: {detail}"));
    let body = build_response_body(
        None,
        Some(ErrorStatus::UnknownError.code()),
        Some(json!({ "message": kind.to_string() })),
    );
    response.set_status(kind.http_status())?;
    response.write_json_and_close(&body)
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Failed(#[from] FailedCommand),
    #[error(transparent)]
    Invalid(#[from] InvalidRequest),
    #[error("response already closed")]
    ResponseClosed,
    #[error("failed to serialize response body: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type RouterResult<T> = Result<T, RouterError>;
