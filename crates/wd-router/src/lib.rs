//! JSON wire protocol routing: URL normalisation, request re-routing,
//! response envelopes and the session/window command handlers.

pub mod engine;
pub mod errors;
pub mod handlers;
pub mod model;
pub mod request;
pub mod response;
pub mod result;
pub mod router;
pub mod session;
pub mod trace;
pub mod transport;
pub mod uri;

pub use engine::{BrowserEngine, EngineCommand, NoopEngine};
pub use errors::{ErrorStatus, FailedCommand, InvalidRequest, RouterError, RouterResult};
pub use model::BuildInfo;
pub use request::WireRequest;
pub use response::{BufferedSink, ResponseSink, WireResponse};
pub use result::{CommandOutcome, RawCommandResult};
pub use router::{CommandHandler, RequestRouter};
pub use session::{Session, SessionHandle, SessionRegistry, WindowRef};
pub use transport::WireServer;
pub use uri::{UrlNormalizer, DEFAULT_URL_PREFIX};
