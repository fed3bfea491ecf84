//! Chrome DevTools Protocol session implementation.
//!
//! Launches a local Chrome/Chromium, applies the identity profile, and
//! installs the request filter before the first navigation so no page
//! request escapes it.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
    RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ErrorReason, Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{BrowserSession, RequestPolicy, SessionFactory, SessionProfile, Verdict, WaitOutcome};

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs in every new document before page scripts; hides the flag the
/// site's bot detection checks first.
const STEALTH_SCRIPT: &str = "\
Object.defineProperty(navigator, 'webdriver', {
    get: () => false
});";

/// Opens CDP-backed sessions against a locally installed Chrome/Chromium.
pub struct CdpSessionFactory {
    policy: RequestPolicy,
}

impl CdpSessionFactory {
    pub fn new() -> Self {
        Self {
            policy: RequestPolicy::new(),
        }
    }
}

impl Default for CdpSessionFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionFactory for CdpSessionFactory {
    async fn open(&self, profile: &SessionProfile) -> Result<Box<dyn BrowserSession>> {
        let session = CdpSession::launch(profile, self.policy.clone()).await?;
        Ok(Box::new(session))
    }
}

/// One browser process plus its single driven page.
pub struct CdpSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    intercept_task: JoinHandle<()>,
}

impl CdpSession {
    async fn launch(profile: &SessionProfile, policy: RequestPolicy) -> Result<Self> {
        let executable = match profile.executable() {
            Some(path) => path.to_string(),
            None => find_chrome().context(
                "Chrome/Chromium not found. Install it or set [browser].executable in the config.",
            )?,
        };

        let mut config = BrowserConfig::builder()
            .chrome_executable(executable)
            .viewport(None)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            // The flows never need images; skipping them cuts page weight.
            .arg("--blink-settings=imagesEnabled=false");

        if !profile.is_headless() {
            config = config.with_head();
        }

        let config = config
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to configure browser: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;
        let handler_task = tokio::spawn(async move { while (handler.next().await).is_some() {} });

        let page = browser.new_page("about:blank").await?;

        apply_identity(&page, profile).await?;

        // The filter must be live before the first navigation.
        let intercept_task = install_request_filter(&page, policy).await?;

        Ok(Self {
            browser,
            page,
            handler_task,
            intercept_task,
        })
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("Failed to open {url}"))?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<WaitOutcome> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(WaitOutcome::Present);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(WaitOutcome::TimedOut);
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<WaitOutcome> {
        match tokio::time::timeout(timeout, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(WaitOutcome::Present),
            Ok(Err(err)) => Err(err).context("Navigation wait failed"),
            Err(_) => Ok(WaitOutcome::TimedOut),
        }
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.page
            .find_element(selector)
            .await
            .with_context(|| format!("Element not found: {selector}"))?
            .click()
            .await
            .with_context(|| format!("Click failed: {selector}"))?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .with_context(|| format!("Element not found: {selector}"))?;
        element
            .click()
            .await
            .with_context(|| format!("Focus failed: {selector}"))?;

        // Select any prefilled value so the typed text replaces it.
        let select_all = format!(
            "(() => {{ const el = document.querySelector({}); if (el && el.select) el.select(); }})()",
            js_string(selector)
        );
        self.page.evaluate(select_all).await?;

        element
            .type_str(text)
            .await
            .with_context(|| format!("Typing failed: {selector}"))?;
        Ok(())
    }

    async fn press_key(&self, selector: &str, key: &str) -> Result<()> {
        self.page
            .find_element(selector)
            .await
            .with_context(|| format!("Element not found: {selector}"))?
            .press_key(key)
            .await
            .with_context(|| format!("Key press failed: {key}"))?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script.to_string())
            .await
            .context("Script evaluation failed")?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .context("Failed to read page content")
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn close(&mut self) -> Result<()> {
        self.intercept_task.abort();
        if let Err(err) = self.browser.close().await {
            warn!(error = %err, "browser close reported an error");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        Ok(())
    }
}

async fn apply_identity(page: &Page, profile: &SessionProfile) -> Result<()> {
    let user_agent = SetUserAgentOverrideParams::builder()
        .user_agent(profile.user_agent())
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build user-agent override: {e}"))?;
    page.execute(user_agent).await?;

    let mut header_map = serde_json::Map::new();
    for (name, value) in profile.extra_headers() {
        header_map.insert(name.clone(), serde_json::Value::String(value.clone()));
    }
    let headers = SetExtraHttpHeadersParams::builder()
        .headers(Headers::new(serde_json::Value::Object(header_map)))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build extra headers: {e}"))?;
    page.execute(headers).await?;

    let (width, height) = profile.viewport();
    let metrics = SetDeviceMetricsOverrideParams::builder()
        .width(i64::from(width))
        .height(i64::from(height))
        // Zero keeps the page's own scale factor.
        .device_scale_factor(0.0)
        .mobile(false)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build device metrics: {e}"))?;
    page.execute(metrics).await?;

    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
        .await?;

    Ok(())
}

async fn install_request_filter(page: &Page, policy: RequestPolicy) -> Result<JoinHandle<()>> {
    // Listener before enable, otherwise early requests can slip past.
    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .context("Failed to listen for paused requests")?;

    let pattern = RequestPattern {
        url_pattern: Some("*".to_string()),
        resource_type: None,
        request_stage: Some(RequestStage::Request),
    };
    page.execute(EnableParams {
        patterns: Some(vec![pattern]),
        handle_auth_requests: None,
    })
    .await
    .context("Failed to enable request interception")?;

    let page = page.clone();
    let task = tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            match policy.verdict(&event.request.url) {
                Verdict::Block => {
                    debug!(url = %event.request.url, "blocked page request");
                    let params = FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    );
                    let _ = page.execute(params).await;
                }
                Verdict::Allow => {
                    let _ = page
                        .execute(ContinueRequestParams {
                            request_id: event.request_id.clone(),
                            url: None,
                            method: None,
                            post_data: None,
                            headers: None,
                            intercept_response: None,
                        })
                        .await;
                }
            }
        }
    });

    Ok(task)
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).expect("string serializes")
}

/// Find a Chrome/Chromium executable.
pub fn find_chrome() -> Option<String> {
    for binary in ["google-chrome", "chromium"] {
        if let Ok(output) = std::process::Command::new("which").arg(binary).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(path);
                }
            }
        }
    }

    let candidates = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // NixOS
        "/run/current-system/sw/bin/google-chrome",
        "/run/current-system/sw/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    for candidate in candidates {
        if std::path::Path::new(candidate).exists() {
            return Some(candidate.to_string());
        }
    }
    None
}
