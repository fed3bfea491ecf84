use regex::Regex;

/// Classification of one outbound page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block,
}

/// Allow/block policy applied to every network request a driven page issues.
///
/// Blocks known analytics and telemetry endpoints plus the vendor-tagged
/// `8-4-4-4-12` tracking-token requests; everything else continues. This
/// trims page noise and keeps third-party scripts from disturbing automation
/// timing. It is not a security boundary.
#[derive(Debug, Clone)]
pub struct RequestPolicy {
    blocked: Regex,
}

const BLOCKED_PATTERN: &str = "clarity|pinterest|adobe|mbox|ruxitagentjs|akam|sstats.kroger.com\
     |rb_[A-Za-z0-9]{8}-[A-Za-z0-9]{4}-[A-Za-z0-9]{4}-[A-Za-z0-9]{4}-[A-Za-z0-9]{12}";

impl RequestPolicy {
    pub fn new() -> Self {
        Self {
            blocked: Regex::new(BLOCKED_PATTERN).expect("valid block pattern"),
        }
    }

    pub fn verdict(&self, url: &str) -> Verdict {
        if self.blocked.is_match(url) {
            Verdict::Block
        } else {
            Verdict::Allow
        }
    }
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self::new()
    }
}
