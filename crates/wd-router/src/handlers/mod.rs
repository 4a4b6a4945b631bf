//! Command handlers mounted behind the request routers: the root handler
//! owns session lifecycle and re-routes everything under `/session/:id` to
//! that session's own handler.

mod root;
mod session;

pub use root::RootHandler;
pub use session::SessionHandler;

use crate::errors::{InvalidRequest, RouterError};
use crate::request::WireRequest;

fn unknown_command(request: &WireRequest) -> RouterError {
    InvalidRequest::UnknownCommand(request.describe()).into()
}

fn invalid_method(request: &WireRequest) -> RouterError {
    InvalidRequest::InvalidCommandMethod(request.describe()).into()
}

/// Owned copy of the parsed path segments, so handlers can match on them
/// while handing the request on mutably.
fn path_segments(request: &WireRequest) -> Vec<String> {
    request.url_parsed().segments().to_vec()
}
