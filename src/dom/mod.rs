//! DOM environment abstraction for script injection.
//!
//! Defines the `DomEnvironment` and `ScriptNode` traits that abstract over
//! the browser-like execution context (currently Chromium via chromiumoxide,
//! plus an in-memory simulator for headless use and tests).

pub mod chromium;
pub mod sim;

use crate::error::LoadError;
use async_trait::async_trait;

/// Signal emitted by a script node's one-shot observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptEvent {
    /// The script finished fetching and executing.
    Loaded,
    /// The loading mechanism reported failure.
    Errored,
}

/// A browser-like execution context that can host script nodes.
#[async_trait]
pub trait DomEnvironment: Send + Sync {
    /// Capability probe: does a DOM-capable document exist at all?
    fn is_available(&self) -> bool;

    /// Create an async script node with the given source and append it as
    /// the last child of the head insertion point.
    ///
    /// Fails with `LoadError::Dom` when the document has no head-like
    /// insertion point; no node is created in that case.
    async fn insert_script(&self, src: &str) -> Result<Box<dyn ScriptNode>, LoadError>;
}

/// A script-loading node owned by the orchestrator for one invocation.
#[async_trait]
pub trait ScriptNode: Send {
    /// The source URL the node was created with.
    fn src(&self) -> &str;

    /// Resolve when the node's load or error observer fires.
    ///
    /// Pends forever if neither fires; the caller races this against its
    /// own timer. Must be cancel-safe.
    async fn next_event(&mut self) -> ScriptEvent;

    /// Detach the load/error observers. Idempotent.
    async fn detach_observers(&mut self);

    /// Remove the node from its parent. Idempotent.
    async fn remove(&mut self);
}

impl std::fmt::Debug for dyn ScriptNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptNode").field("src", &self.src()).finish()
    }
}

/// The absent environment — no document, no window.
///
/// Every load against it fails fast with `LoadError::Environment`, which is
/// what a server-side caller should see.
pub struct NoDom;

#[async_trait]
impl DomEnvironment for NoDom {
    fn is_available(&self) -> bool {
        false
    }

    async fn insert_script(&self, _src: &str) -> Result<Box<dyn ScriptNode>, LoadError> {
        Err(LoadError::Environment(
            "no document in this execution context".to_string(),
        ))
    }
}
