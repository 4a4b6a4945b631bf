use serde_json::{json, Map, Value};
use tracing::warn;

use crate::errors::{
    handle_failed_command, handle_invalid_req_invalid_command_method, ErrorStatus, RouterResult,
};
use crate::request::WireRequest;
use crate::response::{ResponseSink, WireResponse};
use crate::session::SessionHandle;

pub const INCOMPLETE_RESULT_MESSAGE: &str =
    "Command failed without producing the expected error report";

const ORIGIN: &str = "ResultDispatcher";

/// What a command handed back before envelope formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCommandResult {
    /// JSON text, parsed on classification.
    Text(String),
    Json(Value),
}

impl From<String> for RawCommandResult {
    fn from(text: String) -> Self {
        RawCommandResult::Text(text)
    }
}

impl From<&str> for RawCommandResult {
    fn from(text: &str) -> Self {
        RawCommandResult::Text(text.to_string())
    }
}

impl From<Value> for RawCommandResult {
    fn from(value: Value) -> Self {
        RawCommandResult::Json(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Text that is not JSON; carries the parser's complaint.
    Malformed(String),
    /// Not an object, or neither `status` nor `value` present.
    Incomplete,
    Reported { status: ErrorStatus, message: String },
    Success(Value),
}

impl CommandOutcome {
    pub fn classify(raw: RawCommandResult) -> Self {
        match raw {
            RawCommandResult::Text(text) => match serde_json::from_str::<Value>(&text) {
                Ok(value) => Self::from_value(value),
                Err(err) => CommandOutcome::Malformed(err.to_string()),
            },
            RawCommandResult::Json(value) => Self::from_value(value),
        }
    }

    fn from_value(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return CommandOutcome::Incomplete;
        };
        if !fields.contains_key("status") && !fields.contains_key("value") {
            return CommandOutcome::Incomplete;
        }

        let code = match fields.get("status") {
            None | Some(Value::Null) => 0,
            Some(status) => match status.as_i64() {
                Some(code) => code,
                None => return CommandOutcome::Incomplete,
            },
        };
        let value = fields.remove("value").unwrap_or_else(|| json!({}));

        let status = ErrorStatus::from_code(code);
        if status.is_success() {
            CommandOutcome::Success(value)
        } else {
            CommandOutcome::Reported {
                status,
                message: failure_message(&value),
            }
        }
    }

    /// Closes `response` with the envelope matching this outcome.
    pub fn respond<S: ResponseSink>(
        self,
        session: &dyn SessionHandle,
        request: &WireRequest,
        response: &mut WireResponse<S>,
    ) -> RouterResult<()> {
        match self {
            CommandOutcome::Malformed(detail) => {
                handle_invalid_req_invalid_command_method(request, response, &detail)
            }
            CommandOutcome::Incomplete => handle_failed_command(
                ErrorStatus::UnknownError,
                INCOMPLETE_RESULT_MESSAGE,
                request,
                response,
                Some(session),
                ORIGIN,
            ),
            CommandOutcome::Reported { status, message } => {
                warn!(status = status.name(), code = status.code(), %message, "command reported failure");
                handle_failed_command(status, message, request, response, Some(session), ORIGIN)
            }
            CommandOutcome::Success(value) => response.success(Some(session.id()), Some(value)),
        }
    }
}

fn failure_message(value: &Value) -> String {
    match value {
        Value::Object(fields) => message_field(fields).unwrap_or_else(|| value.to_string()),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn message_field(fields: &Map<String, Value>) -> Option<String> {
    fields
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use axum::http::{Method, StatusCode};

    fn respond(raw: impl Into<RawCommandResult>) -> (Session, WireResponse) {
        let session = Session::new(json!({}));
        let request = WireRequest::new(Method::GET, "/title");
        let mut response = WireResponse::default();
        response
            .respond_based_on_result(&session, &request, raw.into())
            .unwrap();
        (session, response)
    }

    fn body(response: &WireResponse) -> Value {
        serde_json::from_slice(response.sink().body()).unwrap()
    }

    #[test]
    fn classifies_each_shape() {
        assert_eq!(
            CommandOutcome::classify(r#"{"status":0,"value":42}"#.into()),
            CommandOutcome::Success(json!(42))
        );
        assert!(matches!(
            CommandOutcome::classify("not json".into()),
            CommandOutcome::Malformed(_)
        ));
        assert_eq!(
            CommandOutcome::classify(json!({}).into()),
            CommandOutcome::Incomplete
        );
        assert_eq!(
            CommandOutcome::classify(json!(null).into()),
            CommandOutcome::Incomplete
        );
        assert_eq!(
            CommandOutcome::classify(json!({ "status": "zero", "value": 1 }).into()),
            CommandOutcome::Incomplete
        );
        assert_eq!(
            CommandOutcome::classify(json!({ "status": 3, "value": { "message": "x" } }).into()),
            CommandOutcome::Reported {
                status: ErrorStatus::Unrecognized(3),
                message: "x".into()
            }
        );
    }

    #[test]
    fn string_success_writes_envelope_with_session() {
        let (session, response) = respond(r#"{"status":0,"value":42}"#);
        assert!(response.is_closed());
        assert_eq!(
            body(&response),
            json!({ "sessionId": session.id(), "status": 0, "value": 42 })
        );
    }

    #[test]
    fn malformed_text_is_an_invalid_command() {
        let (_, response) = respond("not json");
        assert!(response.is_closed());
        assert_eq!(response.sink().status(), StatusCode::METHOD_NOT_ALLOWED);
        let invalid = body(&response);
        assert_eq!(invalid["status"], json!(ErrorStatus::UnknownError.code()));
        assert!(invalid["value"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid Command Method"));
    }

    #[test]
    fn empty_object_is_an_unknown_error() {
        let (session, response) = respond(json!({}));
        assert_eq!(
            body(&response),
            json!({
                "sessionId": session.id(),
                "status": 13,
                "value": { "message": INCOMPLETE_RESULT_MESSAGE }
            })
        );
    }

    #[test]
    fn reported_failure_keeps_code_and_message() {
        let (_, response) = respond(json!({ "status": 3, "value": { "message": "x" } }));
        let reported = body(&response);
        assert_eq!(reported["status"], json!(3));
        assert_eq!(reported["value"], json!({ "message": "x" }));

        let (_, response) = respond(json!({ "status": 23, "value": { "message": "closed" } }));
        assert_eq!(body(&response)["status"], json!(ErrorStatus::NoSuchWindow.code()));
    }

    #[test]
    fn missing_value_defaults_to_empty_object() {
        let (_, response) = respond(json!({ "status": 0 }));
        assert_eq!(body(&response)["value"], json!({}));
        let (_, response) = respond(json!({ "value": false }));
        assert_eq!(body(&response)["value"], json!(false));
    }
}
