use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use kroger_cli::browser::{
    BrowserSession, SessionFactory, SessionProfile, Visibility, WaitOutcome,
};
use kroger_cli::config::Config;
use kroger_cli::credentials::Credentials;
use kroger_cli::report::Reporter;
use secrecy::SecretString;

pub fn test_credentials() -> Credentials {
    Credentials::new("shopper@example.com", SecretString::from("hunter2".to_string()))
}

pub fn visible_config() -> Config {
    let mut config = Config::default();
    config.browser.headless = false;
    config
}

/// Page content that satisfies a sign-in marker check.
pub fn signed_in_page(marker: &str) -> String {
    format!("<html><body><h1>{marker}</h1></body></html>")
}

/// Page content with an API payload embedded in a `<pre>` block.
pub fn payload_page(json: &str) -> String {
    format!("<html><body><pre>{json}</pre></body></html>")
}

/// Script for one mock session, shared with the test for later inspection.
///
/// Scripted values are consumed in order; the last entry in a queue repeats
/// once the queue would otherwise run dry. Selectors without a wait script
/// resolve as present.
#[derive(Default)]
pub struct SessionScript {
    contents: Mutex<VecDeque<String>>,
    urls: Mutex<VecDeque<String>>,
    selector_waits: Mutex<HashMap<String, VecDeque<WaitOutcome>>>,
    navigation_waits: Mutex<VecDeque<WaitOutcome>>,

    pub navigations: Mutex<Vec<String>>,
    pub clicks: Mutex<Vec<String>>,
    pub typed: Mutex<Vec<(String, String)>>,
    pub key_presses: Mutex<Vec<(String, String)>>,
    pub evaluated: Mutex<Vec<String>>,
    pub closed: AtomicBool,
}

impl SessionScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(self, content: impl Into<String>) -> Self {
        self.contents.lock().unwrap().push_back(content.into());
        self
    }

    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.urls.lock().unwrap().push_back(url.into());
        self
    }

    pub fn with_selector_wait(self, selector: impl Into<String>, outcome: WaitOutcome) -> Self {
        self.selector_waits
            .lock()
            .unwrap()
            .entry(selector.into())
            .or_default()
            .push_back(outcome);
        self
    }

    pub fn with_navigation_wait(self, outcome: WaitOutcome) -> Self {
        self.navigation_waits.lock().unwrap().push_back(outcome);
        self
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn clicks_on(&self, selector: &str) -> usize {
        self.clicks
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.as_str() == selector)
            .count()
    }

    fn next_content(&self) -> String {
        next_scripted(&mut self.contents.lock().unwrap()).unwrap_or_default()
    }

    fn next_url(&self) -> String {
        next_scripted(&mut self.urls.lock().unwrap()).unwrap_or_default()
    }

    fn next_selector_wait(&self, selector: &str) -> WaitOutcome {
        self.selector_waits
            .lock()
            .unwrap()
            .get_mut(selector)
            .and_then(|queue| next_scripted(queue))
            .unwrap_or(WaitOutcome::Present)
    }

    fn next_navigation_wait(&self) -> WaitOutcome {
        next_scripted(&mut self.navigation_waits.lock().unwrap()).unwrap_or(WaitOutcome::Present)
    }
}

fn next_scripted<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

pub struct MockSession {
    script: Arc<SessionScript>,
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.script.navigations.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<WaitOutcome> {
        Ok(self.script.next_selector_wait(selector))
    }

    async fn wait_for_navigation(&self, _timeout: Duration) -> Result<WaitOutcome> {
        Ok(self.script.next_navigation_wait())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.script.clicks.lock().unwrap().push(selector.to_string());
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.script
            .typed
            .lock()
            .unwrap()
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn press_key(&self, selector: &str, key: &str) -> Result<()> {
        self.script
            .key_presses
            .lock()
            .unwrap()
            .push((selector.to_string(), key.to_string()));
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.script.evaluated.lock().unwrap().push(script.to_string());
        Ok(serde_json::Value::Null)
    }

    async fn content(&self) -> Result<String> {
        Ok(self.script.next_content())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.script.next_url())
    }

    async fn close(&mut self) -> Result<()> {
        self.script.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out scripted sessions in the order they were pushed and records
/// the visibility each one was opened with.
#[derive(Default)]
pub struct MockSessionFactory {
    scripts: Mutex<VecDeque<Arc<SessionScript>>>,
    opened: Mutex<Vec<Visibility>>,
}

impl MockSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_session(&self, script: SessionScript) -> Arc<SessionScript> {
        let script = Arc::new(script);
        self.scripts.lock().unwrap().push_back(script.clone());
        script
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    pub fn opened_visibilities(&self) -> Vec<Visibility> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionFactory for MockSessionFactory {
    async fn open(&self, profile: &SessionProfile) -> Result<Box<dyn BrowserSession>> {
        self.opened.lock().unwrap().push(profile.visibility());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Arc::new(SessionScript::default()));
        Ok(Box::new(MockSession { script }))
    }
}

/// Captures progress and failure messages for assertions.
#[derive(Default)]
pub struct RecordingReporter {
    pub progress: Mutex<Vec<String>>,
    pub failures: Mutex<Vec<String>>,
}

impl Reporter for RecordingReporter {
    fn progress(&self, message: &str) {
        self.progress.lock().unwrap().push(message.to_string());
    }

    fn failure(&self, message: &str) {
        self.failures.lock().unwrap().push(message.to_string());
    }
}
