//! Progress reporting.
//!
//! Operations emit progress and failure notices through [`Reporter`] and
//! never branch on what happens to them; reporting is fire-and-forget.

pub trait Reporter: Send + Sync {
    fn progress(&self, message: &str);
    fn failure(&self, message: &str);
}

/// Writes notices to the terminal.
#[derive(Debug, Clone, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn progress(&self, message: &str) {
        println!("{message}");
    }

    fn failure(&self, message: &str) {
        eprintln!("{message}");
    }
}

/// Discards all notices.
#[derive(Debug, Clone, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn progress(&self, _message: &str) {}
    fn failure(&self, _message: &str) {}
}
