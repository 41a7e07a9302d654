//! Load orchestrator: URL construction, node insertion, and the
//! load/error/timeout race.
//!
//! Each `load` call owns its node, its timer, and its observers; nothing is
//! shared between concurrent calls except the environment handle. There is
//! no retry and no caching — a caller wanting either re-invokes the whole
//! operation.

use crate::dom::{DomEnvironment, ScriptEvent, ScriptNode};
use crate::error::{LoadError, LoadResult};
use crate::url::{build_url, UrlPolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default load timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Loader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// How long to wait for the load or error observer before settling
    /// with a timeout.
    pub timeout_ms: u64,
    /// Validation strictness for the base URL and parameter set.
    pub url_policy: UrlPolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            url_policy: UrlPolicy::default(),
        }
    }
}

/// The settled terminal state of one invocation's race.
enum Settlement {
    Loaded,
    Errored,
    TimedOut,
}

/// Injects script nodes into a DOM environment and awaits their outcome.
pub struct ScriptLoader {
    env: Arc<dyn DomEnvironment>,
    config: LoaderConfig,
}

impl ScriptLoader {
    /// Create a loader with the default (strictest) configuration.
    pub fn new(env: Arc<dyn DomEnvironment>) -> Self {
        Self::with_config(env, LoaderConfig::default())
    }

    /// Create a loader with an explicit configuration.
    pub fn with_config(env: Arc<dyn DomEnvironment>, config: LoaderConfig) -> Self {
        Self { env, config }
    }

    /// The active configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Inject an async script node for `base_url` plus encoded `params` and
    /// resolve exactly once on load, error, or timeout.
    ///
    /// Validation and environment failures settle before any DOM mutation.
    /// On success the node stays attached and its lifecycle passes to the
    /// host document; on error or timeout the node is removed.
    pub async fn load(&self, base_url: &str, params: &[(String, String)]) -> LoadResult<()> {
        if !self.env.is_available() {
            return Err(LoadError::Environment(
                "no browser-like execution context".to_string(),
            ));
        }

        let url = build_url(base_url, params, &self.config.url_policy)?;

        let mut node = self.env.insert_script(&url).await?;
        debug!(%url, "script node inserted");

        let timer = tokio::time::sleep(Duration::from_millis(self.config.timeout_ms));
        tokio::pin!(timer);

        // First of the three race participants wins; the losing branches
        // are dropped, so no second settlement is possible.
        let settlement = tokio::select! {
            event = node.next_event() => match event {
                ScriptEvent::Loaded => Settlement::Loaded,
                ScriptEvent::Errored => Settlement::Errored,
            },
            _ = &mut timer => Settlement::TimedOut,
        };

        match settlement {
            Settlement::Loaded => {
                debug!(%url, "script loaded");
                Self::conclude(node.as_mut(), false).await;
                Ok(())
            }
            Settlement::Errored => {
                debug!(%url, "script reported a load failure");
                Self::conclude(node.as_mut(), true).await;
                Err(LoadError::Load { url })
            }
            Settlement::TimedOut => {
                debug!(%url, timeout_ms = self.config.timeout_ms, "script load timed out");
                Self::conclude(node.as_mut(), true).await;
                Err(LoadError::Timeout {
                    url,
                    timeout_ms: self.config.timeout_ms,
                })
            }
        }
    }

    /// Single cleanup funnel for every settlement path: detach the
    /// observers, and remove the node on the failure paths.
    async fn conclude(node: &mut dyn ScriptNode, remove_node: bool) {
        node.detach_observers().await;
        if remove_node {
            node.remove().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::sim::{ScriptFate, SimDom};
    use crate::dom::NoDom;
    use crate::error::ValidationError;

    #[tokio::test]
    async fn test_missing_environment_fails_fast() {
        let loader = ScriptLoader::new(Arc::new(NoDom));
        let err = loader.load("https://cdn.example.com/w.js", &[]).await.unwrap_err();
        assert!(matches!(err, LoadError::Environment(_)));
    }

    #[tokio::test]
    async fn test_validation_failure_touches_no_dom() {
        let dom = Arc::new(SimDom::new(ScriptFate::Hang));
        let loader = ScriptLoader::new(Arc::clone(&dom) as Arc<dyn DomEnvironment>);

        let err = loader.load("javascript:alert(1)", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::Validation(ValidationError::DisallowedScheme { .. })
        ));
        assert_eq!(dom.inserted_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_head_is_a_dom_error() {
        let dom = Arc::new(SimDom::without_head());
        let loader = ScriptLoader::new(Arc::clone(&dom) as Arc<dyn DomEnvironment>);

        let err = loader.load("https://cdn.example.com/w.js", &[]).await.unwrap_err();
        assert!(matches!(err, LoadError::Dom(_)));
        assert_eq!(dom.inserted_count(), 0);
    }

    #[test]
    fn test_default_config_is_strict_with_2000ms_timer() {
        let config = LoaderConfig::default();
        assert_eq!(config.timeout_ms, 2000);
        assert!(config.url_policy.enforce_http_scheme);
        assert!(config.url_policy.reject_empty_keys);
    }
}
