use tracing::{span, Level, Span};

#[derive(Clone, Default)]
pub struct RouterTracer;

impl RouterTracer {
    pub fn span(&self, method: &str, path: &str) -> Span {
        span!(Level::INFO, "wd.router", method = method, path = path)
    }
}
