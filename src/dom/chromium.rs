//! Chromium-backed DOM environment using chromiumoxide.
//!
//! Script nodes are created and observed through evaluated JS on a page:
//! insertion registers one-shot `onload`/`onerror` handlers that write into
//! a window-scoped slot, which the Rust side polls.

use super::{DomEnvironment, ScriptEvent, ScriptNode};
use crate::error::LoadError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const EVENT_SLOT: &str = "__lazyscript_events";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. LAZYSCRIPT_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("LAZYSCRIPT_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.lazyscript/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".lazyscript/chromium/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".lazyscript/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".lazyscript/chromium/chrome-linux64/chrome"),
                home.join(".lazyscript/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    if let Ok(path) = which::which("google-chrome") {
        return Some(path);
    }
    if let Ok(path) = which::which("chromium") {
        return Some(path);
    }
    if let Ok(path) = which::which("chromium-browser") {
        return Some(path);
    }

    // 4. Common macOS locations
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// DOM environment backed by a headless Chromium page.
pub struct ChromiumDom {
    page: Page,
    // Browser kept alive for the lifetime of the environment when launched
    // by us; None when attached to a caller-owned page.
    _browser: Option<Browser>,
    next_node_id: AtomicUsize,
}

impl ChromiumDom {
    /// Launch a headless Chromium instance and open a blank page.
    pub async fn launch() -> Result<Self> {
        let chrome_path = find_chromium()
            .context("Chromium not found. Set LAZYSCRIPT_CHROMIUM_PATH or install Chrome.")?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Spawn the handler task
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to create page")?;

        Ok(Self {
            page,
            _browser: Some(browser),
            next_node_id: AtomicUsize::new(1),
        })
    }

    /// Attach to a page owned by the caller's chromiumoxide session.
    pub fn from_page(page: Page) -> Self {
        Self {
            page,
            _browser: None,
            next_node_id: AtomicUsize::new(1),
        }
    }

    /// Navigate the page, so injected scripts load in a real document.
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.page.goto(url).await.context("navigation failed")?;
        let _ = self.page.wait_for_navigation().await;
        Ok(())
    }
}

#[async_trait]
impl DomEnvironment for ChromiumDom {
    fn is_available(&self) -> bool {
        true
    }

    async fn insert_script(&self, src: &str) -> Result<Box<dyn ScriptNode>, LoadError> {
        let node_id = self.next_node_id.fetch_add(1, Ordering::Relaxed);
        let src_js = serde_json::to_string(src)
            .map_err(|e| LoadError::Dom(format!("failed to quote script source: {e}")))?;

        let script = format!(
            r#"(() => {{
                const head = document.head || document.getElementsByTagName('head')[0];
                if (!head) {{ return 'no-head'; }}
                const s = document.createElement('script');
                s.async = true;
                s.src = {src_js};
                s.setAttribute('data-lazyscript-id', '{node_id}');
                window.{EVENT_SLOT} = window.{EVENT_SLOT} || {{}};
                s.onload = () => {{ window.{EVENT_SLOT}['{node_id}'] = 'load'; }};
                s.onerror = () => {{ window.{EVENT_SLOT}['{node_id}'] = 'error'; }};
                head.appendChild(s);
                return 'ok';
            }})()"#
        );

        let outcome: String = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| LoadError::Dom(format!("script insertion failed: {e}")))?
            .into_value()
            .map_err(|e| LoadError::Dom(format!("unexpected insertion result: {e:?}")))?;

        match outcome.as_str() {
            "ok" => Ok(Box::new(ChromiumNode {
                page: self.page.clone(),
                src: src.to_string(),
                node_id,
            })),
            "no-head" => Err(LoadError::Dom(
                "document has no head insertion point".to_string(),
            )),
            other => Err(LoadError::Dom(format!(
                "unexpected insertion result: {other}"
            ))),
        }
    }
}

/// A script element living in a Chromium page.
pub struct ChromiumNode {
    page: Page,
    src: String,
    node_id: usize,
}

impl ChromiumNode {
    fn selector(&self) -> String {
        format!("script[data-lazyscript-id=\"{}\"]", self.node_id)
    }
}

#[async_trait]
impl ScriptNode for ChromiumNode {
    fn src(&self) -> &str {
        &self.src
    }

    async fn next_event(&mut self) -> ScriptEvent {
        let probe = format!(
            "(() => (window.{EVENT_SLOT} || {{}})['{}'] || '')()",
            self.node_id
        );
        loop {
            let fired = self
                .page
                .evaluate(probe.clone())
                .await
                .ok()
                .and_then(|v| v.into_value::<String>().ok())
                .unwrap_or_default();
            match fired.as_str() {
                "load" => return ScriptEvent::Loaded,
                "error" => return ScriptEvent::Errored,
                _ => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }
    }

    async fn detach_observers(&mut self) {
        let script = format!(
            r#"(() => {{
                const s = document.querySelector('{}');
                if (s) {{ s.onload = null; s.onerror = null; }}
                if (window.{EVENT_SLOT}) {{ delete window.{EVENT_SLOT}['{}']; }}
            }})()"#,
            self.selector(),
            self.node_id
        );
        let _ = self.page.evaluate(script).await;
    }

    async fn remove(&mut self) {
        let script = format!(
            r#"(() => {{
                const s = document.querySelector('{}');
                if (s && s.parentNode) {{ s.parentNode.removeChild(s); }}
            }})()"#,
            self.selector()
        );
        let _ = self.page.evaluate(script).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ScriptLoader;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_loads_real_script() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/widget.js"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/javascript")
                    .set_body_string("window.__widget_ready = true;"),
            )
            .mount(&server)
            .await;

        let dom = ChromiumDom::launch().await.expect("failed to launch");
        dom.goto("data:text/html,<html><head></head><body></body></html>")
            .await
            .expect("navigation failed");

        let loader = ScriptLoader::new(Arc::new(dom));
        let base = format!("{}/widget.js", server.uri());
        loader
            .load(&base, &[("v".to_string(), "2".to_string())])
            .await
            .expect("script load failed");
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_reports_load_failure() {
        let dom = ChromiumDom::launch().await.expect("failed to launch");
        dom.goto("data:text/html,<html><head></head><body></body></html>")
            .await
            .expect("navigation failed");

        let loader = ScriptLoader::new(Arc::new(dom));
        // Port 9 (discard) refuses script fetches.
        let err = loader
            .load("http://127.0.0.1:9/missing.js", &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Load { .. } | LoadError::Timeout { .. }
        ));
    }
}
