use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Build details reported by `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub revision: String,
    pub time: String,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            revision: "unknown".to_string(),
            time: "unknown".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusValue {
    pub build: BuildInfo,
    pub os: OsInfo,
}

#[derive(Debug, Serialize)]
pub struct OsInfo {
    pub name: &'static str,
    pub arch: &'static str,
}

impl OsInfo {
    pub fn current() -> Self {
        Self {
            name: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub capabilities: Value,
}

#[derive(Debug, Deserialize)]
pub struct NewSessionRequest {
    #[serde(rename = "desiredCapabilities")]
    pub desired_capabilities: Value,
}

#[derive(Debug, Deserialize)]
pub struct NavigateToUrlRequest {
    pub url: String,
}

/// JSON wire clients send `name`; newer ones send `handle`.
#[derive(Debug, Deserialize)]
pub struct SwitchWindowRequest {
    pub name: Option<String>,
    pub handle: Option<String>,
}

impl SwitchWindowRequest {
    pub fn target(&self) -> Option<&str> {
        self.name.as_deref().or(self.handle.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct ExecuteScriptRequest {
    pub script: String,
    #[serde(default)]
    pub args: Vec<Value>,
}
