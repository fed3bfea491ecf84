//! Survey completion engine.
//!
//! The feedback survey is a multi-step form whose step count varies by
//! store and visit. The engine advances it as a bounded state machine: a
//! step either shows the next control, signals completion in its URL, or
//! is a transient page that resolves on its own.

use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::browser::{BrowserSession, WaitOutcome};

use super::receipt::FeedbackTarget;

const DATE_PICKER: &str = "#Index_VisitDateDatePicker";
const NEXT_BUTTON: &str = "#NextButton";
/// Substring of the survey's final-page URL.
const COMPLETION_MARKER: &str = "Finish";

const MAX_STEPS: usize = 35;
const NEXT_WAIT: Duration = Duration::from_secs(5);
const DATE_PICKER_WAIT: Duration = Duration::from_secs(10);

/// How a single survey step presented itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    /// The next control is present; answer and advance.
    InProgress,
    /// The URL carries the completion marker; the survey is done.
    Finished,
    /// No control and no marker; the page resolves on its own.
    Transient,
}

/// Terminal survey outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyOutcome {
    Finished,
    /// The step budget ran out before the completion marker appeared.
    Stalled,
}

/// Classify a survey step from the next-control wait and the URL captured
/// before the wait.
pub fn classify_step(control: WaitOutcome, current_url: &str) -> StepState {
    match control {
        WaitOutcome::Present => StepState::InProgress,
        WaitOutcome::TimedOut if current_url.contains(COMPLETION_MARKER) => StepState::Finished,
        WaitOutcome::TimedOut => StepState::Transient,
    }
}

pub struct SurveyEngine {
    answers_js: String,
    max_steps: usize,
}

impl SurveyEngine {
    pub fn new(answers_js: String) -> Self {
        Self {
            answers_js,
            max_steps: MAX_STEPS,
        }
    }

    /// Drive the survey at `target` to a terminal state.
    pub async fn run(
        &self,
        session: &dyn BrowserSession,
        target: &FeedbackTarget,
    ) -> Result<SurveyOutcome> {
        session.navigate(&target.url).await?;

        let picker = session
            .wait_for_selector(DATE_PICKER, DATE_PICKER_WAIT)
            .await?;
        if !picker.is_present() {
            anyhow::bail!("survey page never showed the visit date field");
        }

        // The picker rejects typed text, so the date goes in through its
        // own API.
        let set_date = format!(
            "(() => {{ $('{DATE_PICKER}').datepicker('setDate', '{}'); }})()",
            target.visit_date
        );
        session.evaluate(&set_date).await?;
        session.click(NEXT_BUTTON).await?;

        for step in 0..self.max_steps {
            let current_url = session.current_url().await?;
            let control = session.wait_for_selector(NEXT_BUTTON, NEXT_WAIT).await?;
            match classify_step(control, &current_url) {
                StepState::Finished => {
                    debug!(step, "survey reached its completion page");
                    return Ok(SurveyOutcome::Finished);
                }
                StepState::InProgress => {
                    session.evaluate(&self.answers_js).await?;
                    session.click(NEXT_BUTTON).await?;
                }
                StepState::Transient => {
                    debug!(step, url = %current_url, "step without a next control, moving on");
                }
            }
        }

        Ok(SurveyOutcome::Stalled)
    }
}
