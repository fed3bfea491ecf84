//! Browser session abstraction.
//!
//! Every operation drives the account through this capability. The
//! production implementation launches Chrome over the DevTools protocol
//! (`cdp`); tests substitute scripted sessions.

mod cdp;
mod filter;
mod profile;

pub use cdp::{find_chrome, CdpSessionFactory};
pub use filter::{RequestPolicy, Verdict};
pub use profile::{SessionProfile, Visibility};

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

/// Result of a bounded wait. Expiry is routine control flow for callers,
/// not a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Present,
    TimedOut,
}

impl WaitOutcome {
    pub fn is_present(self) -> bool {
        matches!(self, WaitOutcome::Present)
    }
}

/// One live browser page plus the browser that owns it.
///
/// Sessions are created per operation, never reused, never shared, and torn
/// down on every exit path of the operation that opened them.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Wait for `selector` to appear, up to `timeout`.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<WaitOutcome>;

    /// Wait for the next navigation to complete, up to `timeout`.
    async fn wait_for_navigation(&self, timeout: Duration) -> Result<WaitOutcome>;

    async fn click(&self, selector: &str) -> Result<()>;

    /// Focus `selector`, select any existing content, and type over it.
    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    /// Press a key with `selector` focused. `"body"` for page-level keys.
    async fn press_key(&self, selector: &str, key: &str) -> Result<()>;

    /// Evaluate a script in the page, returning its completion value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Rendered HTML of the current page.
    async fn content(&self) -> Result<String>;

    async fn current_url(&self) -> Result<String>;

    /// Tear down the page and its browser process.
    async fn close(&mut self) -> Result<()>;
}

/// Opens sessions. The production factory launches Chrome/Chromium; tests
/// hand out scripted sessions instead.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, profile: &SessionProfile) -> Result<Box<dyn BrowserSession>>;
}
