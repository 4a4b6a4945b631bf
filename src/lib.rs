//! Library half of the `wirehub` binary: configuration loading and the
//! server bootstrap, exposed for integration tests.

pub mod config;

pub use config::{default_config_path, load_config, Config, LoadedConfig};

use axum::Router;
use wd_router::{BuildInfo, WireServer};

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        revision: env!("WIREHUB_GIT_REVISION").to_string(),
        time: env!("WIREHUB_BUILD_TIME").to_string(),
    }
}

/// The wire protocol router for this configuration, with no browser engine
/// attached.
pub fn build_router(config: &Config) -> Router {
    WireServer::new(config.server.url_prefix.clone())
        .with_build_info(build_info())
        .build()
}
