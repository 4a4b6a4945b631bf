use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::errors::{
    handle_failed_command, handle_invalid_request, ErrorStatus, RouterError, RouterResult,
};
use crate::request::WireRequest;
use crate::response::WireResponse;
use crate::uri::UrlNormalizer;

const ORIGIN: &str = "RequestRouter";

/// Executes commands for requests that reached it through a
/// [`RequestRouter`]. Returned errors are turned into wire responses by the
/// router.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(
        &self,
        request: &mut WireRequest,
        response: &mut WireResponse,
    ) -> RouterResult<()>;
}

#[derive(Clone)]
pub struct RequestRouter {
    normalizer: UrlNormalizer,
    handler: Arc<dyn CommandHandler>,
}

impl RequestRouter {
    pub fn new(normalizer: UrlNormalizer, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            normalizer,
            handler,
        }
    }

    /// Decorates both halves of the exchange and dispatches to the handler.
    pub async fn handle(&self, request: &mut WireRequest, response: &mut WireResponse) {
        request.consolidate_body();
        self.decorate_request(request);
        response.decorate();

        if let Err(err) = self.handler.handle(request, response).await {
            report(err, request, response);
        }
    }

    /// Strips `prefix_to_remove` from the parsed path and dispatches again.
    /// The first call freezes the path the request arrived with.
    pub async fn reroute(
        &self,
        request: &mut WireRequest,
        response: &mut WireResponse,
        prefix_to_remove: &str,
    ) {
        request.freeze_original();
        let rebased = request
            .url_parsed()
            .source()
            .get(prefix_to_remove.len()..)
            .unwrap_or_default()
            .to_string();
        debug!(
            original = request.url_original().as_deref().unwrap_or_default(),
            from = request.url(),
            to = %rebased,
            "re-routing request"
        );
        request.set_url(rebased);
        self.decorate_request(request);
        self.handle(request, response).await;
    }

    pub fn decorate_request(&self, request: &mut WireRequest) {
        let parsed = self.normalizer.normalize(request.url());
        request.set_parsed(parsed);
    }
}

fn report(err: RouterError, request: &WireRequest, response: &mut WireResponse) {
    if response.is_closed() {
        warn!(url = request.url(), error = %err, "command failed after its response was closed");
        return;
    }

    let written = match err {
        RouterError::Failed(failure) => response.fail(&failure),
        RouterError::Invalid(kind) => handle_invalid_request(&kind, request, response),
        RouterError::ResponseClosed => Ok(()),
        RouterError::Serialize(err) => handle_failed_command(
            ErrorStatus::UnknownError,
            err.to_string(),
            request,
            response,
            None,
            ORIGIN,
        ),
    };
    if let Err(err) = written {
        error!(url = request.url(), error = %err, "failed to write error response");
    }
}
