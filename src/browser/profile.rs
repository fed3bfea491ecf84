use std::time::Duration;

/// User agent reported by `navigator.userAgent` in the driven page.
const NAVIGATOR_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_6) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/67.0.3396.99 Safari/537.36";

/// User agent sent on outbound requests via the extra-headers override.
const HEADER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/81.0.4044.129 Safari/537.36";

const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Whether the driven browser renders a visible window or runs headless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Headless,
}

/// Fixed identity and launch settings for one browser session.
///
/// A profile is immutable once built. Callers that need a different
/// visibility mode (the sign-in retry, the survey flow) construct a new
/// profile instead of toggling shared state.
#[derive(Debug, Clone)]
pub struct SessionProfile {
    visibility: Visibility,
    user_agent: String,
    extra_headers: Vec<(String, String)>,
    viewport_width: u32,
    viewport_height: u32,
    executable: Option<String>,
}

impl SessionProfile {
    pub fn new(visibility: Visibility) -> Self {
        Self {
            visibility,
            user_agent: NAVIGATOR_USER_AGENT.to_string(),
            extra_headers: vec![
                ("user-agent".to_string(), HEADER_USER_AGENT.to_string()),
                ("Accept-Language".to_string(), ACCEPT_LANGUAGE.to_string()),
            ],
            // Height 0 leaves the height unconstrained.
            viewport_width: 700,
            viewport_height: 0,
            executable: None,
        }
    }

    pub fn visible() -> Self {
        Self::new(Visibility::Visible)
    }

    pub fn headless() -> Self {
        Self::new(Visibility::Headless)
    }

    /// Copy of this profile forced into visible mode.
    pub fn to_visible(&self) -> Self {
        let mut profile = self.clone();
        profile.visibility = Visibility::Visible;
        profile
    }

    pub fn with_executable(mut self, executable: Option<String>) -> Self {
        self.executable = executable;
        self
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_headless(&self) -> bool {
        self.visibility == Visibility::Headless
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn extra_headers(&self) -> &[(String, String)] {
        &self.extra_headers
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }

    pub fn executable(&self) -> Option<&str> {
        self.executable.as_deref()
    }

    /// Post-submit navigation budget for sign-in. Headless automation gets
    /// flagged and throttled more often, so it fails fast; a visible window
    /// is given time to settle.
    pub fn navigation_timeout(&self) -> Duration {
        match self.visibility {
            Visibility::Visible => Duration::from_secs(60),
            Visibility::Headless => Duration::from_secs(20),
        }
    }
}
