// Copyright 2026 Lazyscript Contributors
// SPDX-License-Identifier: Apache-2.0

//! Async script-tag injection for browser pages.
//!
//! Builds a percent-encoded request URL from a base address and a flat
//! string parameter set, appends an async script node to the document head
//! through a pluggable [`dom::DomEnvironment`], and settles exactly once on
//! load, error, or timeout.
//!
//! ```no_run
//! use lazyscript::{dom::chromium::ChromiumDom, ScriptLoader};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let dom = ChromiumDom::launch().await?;
//! dom.goto("https://example.com").await?;
//!
//! let loader = ScriptLoader::new(Arc::new(dom));
//! loader
//!     .load(
//!         "https://cdn.example.com/widget.js",
//!         &[("v".to_string(), "2".to_string())],
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod dom;
pub mod error;
pub mod loader;
pub mod url;

pub use dom::{DomEnvironment, NoDom, ScriptEvent, ScriptNode};
pub use error::{LoadError, LoadResult, ValidationError};
pub use loader::{LoaderConfig, ScriptLoader, DEFAULT_TIMEOUT_MS};
pub use url::{build_url, UrlPolicy};
