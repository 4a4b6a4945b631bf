use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{create_failed_command, ErrorStatus, FailedCommand};
use crate::request::WireRequest;

const RESOLVER_ORIGIN: &str = "WindowResolver";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: 400,
            height: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowPosition {
    pub x: i32,
    pub y: i32,
}

/// Snapshot of one browsing context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Window {
    pub handle: String,
    pub name: Option<String>,
    pub size: WindowSize,
    pub position: WindowPosition,
}

impl Window {
    fn new(name: Option<String>) -> Self {
        Self {
            handle: Uuid::new_v4().to_string(),
            name,
            size: WindowSize::default(),
            position: WindowPosition::default(),
        }
    }

    fn answers_to(&self, handle_or_name: &str) -> bool {
        self.handle == handle_or_name || self.name.as_deref() == Some(handle_or_name)
    }
}

/// Read-only view of a session used while resolving windows.
pub trait SessionHandle: Send + Sync {
    fn id(&self) -> &str;
    fn current_window(&self) -> Option<Window>;
    fn window(&self, handle_or_name: &str) -> Option<Window>;
}

#[derive(Debug, Default)]
struct WindowTable {
    windows: Vec<Window>,
    current: Option<String>,
}

#[derive(Debug)]
pub struct Session {
    id: String,
    capabilities: Value,
    created_at: Instant,
    windows: RwLock<WindowTable>,
}

impl Session {
    /// New session with a single window, which becomes current.
    pub fn new(capabilities: Value) -> Self {
        let first = Window::new(None);
        let table = WindowTable {
            current: Some(first.handle.clone()),
            windows: vec![first],
        };
        Self {
            id: Uuid::new_v4().to_string(),
            capabilities,
            created_at: Instant::now(),
            windows: RwLock::new(table),
        }
    }

    pub fn capabilities(&self) -> &Value {
        &self.capabilities
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn window_handles(&self) -> Vec<String> {
        self.windows
            .read()
            .windows
            .iter()
            .map(|window| window.handle.clone())
            .collect()
    }

    pub fn open_window(&self, name: Option<String>) -> Window {
        let window = Window::new(name);
        self.windows.write().windows.push(window.clone());
        window
    }

    /// Makes the window with this handle current.
    pub fn switch_to(&self, handle: &str) -> Option<Window> {
        let mut table = self.windows.write();
        let window = table.windows.iter().find(|w| w.handle == handle)?.clone();
        table.current = Some(window.handle.clone());
        Some(window)
    }

    /// Closes a window. The current handle is left dangling when the closed
    /// window was current, until the client switches elsewhere.
    pub fn close_window(&self, handle: &str) -> Option<Window> {
        let mut table = self.windows.write();
        let index = table.windows.iter().position(|w| w.handle == handle)?;
        Some(table.windows.remove(index))
    }

    pub fn update_window<F>(&self, handle: &str, update: F) -> Option<Window>
    where
        F: FnOnce(&mut Window),
    {
        let mut table = self.windows.write();
        let window = table.windows.iter_mut().find(|w| w.handle == handle)?;
        update(window);
        Some(window.clone())
    }
}

impl SessionHandle for Session {
    fn id(&self) -> &str {
        &self.id
    }

    fn current_window(&self) -> Option<Window> {
        let table = self.windows.read();
        let current = table.current.as_deref()?;
        table.windows.iter().find(|w| w.handle == current).cloned()
    }

    fn window(&self, handle_or_name: &str) -> Option<Window> {
        self.windows
            .read()
            .windows
            .iter()
            .find(|w| w.answers_to(handle_or_name))
            .cloned()
    }
}

/// A window as addressed by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowRef {
    Current,
    Named(String),
}

impl WindowRef {
    /// Path form used by window commands, where `current` is reserved.
    pub fn from_segment(segment: &str) -> Self {
        if segment == "current" {
            WindowRef::Current
        } else {
            WindowRef::Named(segment.to_string())
        }
    }
}

pub fn get_window(
    target: &WindowRef,
    session: &dyn SessionHandle,
    request: &WireRequest,
) -> Result<Window, FailedCommand> {
    let resolved = match target {
        WindowRef::Current => session.current_window(),
        WindowRef::Named(handle_or_name) => session.window(handle_or_name),
    };
    if let Some(window) = resolved {
        return Ok(window);
    }

    let message = match target {
        WindowRef::Current => "Currently Window handle/name is invalid (closed?)".to_string(),
        WindowRef::Named(handle_or_name) => {
            format!("Window handle/name '{handle_or_name}' is invalid (closed?)")
        }
    };
    debug!(session = session.id(), %message, "window resolution failed");
    Err(create_failed_command(
        ErrorStatus::NoSuchWindow,
        message,
        Some(request),
        Some(session),
        RESOLVER_ORIGIN,
    ))
}

pub fn get_current_window(
    session: &dyn SessionHandle,
    request: &WireRequest,
) -> Result<Window, FailedCommand> {
    get_window(&WindowRef::Current, session, request)
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn create(&self, capabilities: Value) -> Arc<Session> {
        let session = Arc::new(Session::new(capabilities));
        self.sessions
            .write()
            .insert(session.id().to_string(), Arc::clone(&session));
        session
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.write().remove(id)
    }

    /// Live sessions, oldest first.
    pub fn list(&self) -> Vec<Arc<Session>> {
        let mut sessions: Vec<_> = self.sessions.read().values().cloned().collect();
        sessions.sort_by_key(|session| session.created_at());
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
