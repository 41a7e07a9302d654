//! In-memory DOM simulator.
//!
//! A headless stand-in for a real document, used by the test suite and by
//! callers that want to exercise loader behavior without a browser. Each
//! inserted script node follows a scripted [`ScriptFate`] on the tokio
//! clock, so tests driven with `tokio::time::pause` stay deterministic.

use super::{DomEnvironment, ScriptEvent, ScriptNode};
use crate::error::LoadError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a simulated script node does after insertion.
#[derive(Debug, Clone, Copy)]
pub enum ScriptFate {
    /// Fire the success observer after the given delay.
    LoadAfter(Duration),
    /// Fire the failure observer after the given delay.
    ErrorAfter(Duration),
    /// Never fire either observer.
    Hang,
}

#[derive(Debug, Clone)]
struct SimNodeState {
    src: String,
    attached: bool,
    observers_detached: bool,
}

/// Snapshot of one simulated node, for test assertions.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub src: String,
    pub attached: bool,
    pub observers_detached: bool,
}

/// Simulated browser-like environment.
pub struct SimDom {
    has_head: bool,
    fate: ScriptFate,
    nodes: Arc<Mutex<Vec<Arc<Mutex<SimNodeState>>>>>,
}

impl SimDom {
    /// A document whose head accepts script nodes with the given fate.
    pub fn new(fate: ScriptFate) -> Self {
        Self {
            has_head: true,
            fate,
            nodes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A document with no head insertion point.
    pub fn without_head() -> Self {
        Self {
            has_head: false,
            fate: ScriptFate::Hang,
            nodes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of script nodes ever inserted.
    pub fn inserted_count(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }

    /// Snapshots of every inserted node, in insertion order.
    pub fn nodes(&self) -> Vec<NodeSnapshot> {
        self.nodes
            .lock()
            .unwrap()
            .iter()
            .map(|n| {
                let state = n.lock().unwrap();
                NodeSnapshot {
                    src: state.src.clone(),
                    attached: state.attached,
                    observers_detached: state.observers_detached,
                }
            })
            .collect()
    }
}

#[async_trait]
impl DomEnvironment for SimDom {
    fn is_available(&self) -> bool {
        true
    }

    async fn insert_script(&self, src: &str) -> Result<Box<dyn ScriptNode>, LoadError> {
        if !self.has_head {
            return Err(LoadError::Dom(
                "document has no head insertion point".to_string(),
            ));
        }

        let state = Arc::new(Mutex::new(SimNodeState {
            src: src.to_string(),
            attached: true,
            observers_detached: false,
        }));
        self.nodes.lock().unwrap().push(Arc::clone(&state));

        Ok(Box::new(SimNode {
            src: src.to_string(),
            fate: self.fate,
            state,
        }))
    }
}

struct SimNode {
    src: String,
    fate: ScriptFate,
    state: Arc<Mutex<SimNodeState>>,
}

#[async_trait]
impl ScriptNode for SimNode {
    fn src(&self) -> &str {
        &self.src
    }

    async fn next_event(&mut self) -> ScriptEvent {
        match self.fate {
            ScriptFate::LoadAfter(delay) => {
                tokio::time::sleep(delay).await;
                ScriptEvent::Loaded
            }
            ScriptFate::ErrorAfter(delay) => {
                tokio::time::sleep(delay).await;
                ScriptEvent::Errored
            }
            ScriptFate::Hang => std::future::pending().await,
        }
    }

    async fn detach_observers(&mut self) {
        self.state.lock().unwrap().observers_detached = true;
    }

    async fn remove(&mut self) {
        self.state.lock().unwrap().attached = false;
    }
}
