//! Receipt to feedback-survey resolution.
//!
//! Walks from the purchases listing to the most recent receipt, pulls the
//! survey entry printed on it, and derives the feedback site URL.

use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::browser::BrowserSession;
use crate::report::Reporter;

const MODAL_OVERLAY: &str = ".ModalitySelectorDynamicTooltip--Overlay";
const VIEW_DETAILS: &str = ".PurchaseCard-top-view-details-button";
const VIEW_DETAILS_LINK: &str = ".PurchaseCard-top-view-details-button a";
const STEP_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("couldn't retrieve the latest purchase, please make sure it exists: {url}")]
    PurchaseNotFound { url: String },
    #[error("couldn't retrieve the feedback entry from the receipt, please make sure it exists: {url}")]
    EntryNotFound { url: String },
    #[error("receipt entry has an unexpected format: {detail}")]
    MalformedEntry { detail: String },
}

/// The survey identifiers printed on a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptEntry {
    /// Six-part identifier, e.g. `123-45-678-90-12-345678901234`.
    pub entry_id: String,
    /// Two-digit-year date, e.g. `06/15/24`.
    pub date: String,
    /// Clock time with meridian, e.g. `02:30pm`.
    pub time: String,
}

/// Where and when to start the feedback survey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackTarget {
    pub url: String,
    /// Four-digit-year visit date, fed to the survey's date picker.
    pub visit_date: String,
}

pub struct ReceiptParser {
    entry_id: Regex,
    date: Regex,
    time: Regex,
}

impl ReceiptParser {
    pub fn new() -> Self {
        Self {
            entry_id: Regex::new("Entry ID: (.*?) ").expect("valid entry pattern"),
            date: Regex::new("Date: (.*?) ").expect("valid date pattern"),
            time: Regex::new("Time: (.*?) ").expect("valid time pattern"),
        }
    }

    /// Pull the survey entry out of rendered receipt content.
    pub fn parse(&self, content: &str, receipt_url: &str) -> Result<ReceiptEntry, ResolutionError> {
        let capture = |regex: &Regex| {
            regex
                .captures(content)
                .and_then(|captures| captures.get(1))
                .map(|capture| capture.as_str().to_string())
        };

        match (
            capture(&self.entry_id),
            capture(&self.date),
            capture(&self.time),
        ) {
            (Some(entry_id), Some(date), Some(time)) => Ok(ReceiptEntry {
                entry_id,
                date,
                time,
            }),
            _ => Err(ResolutionError::EntryNotFound {
                url: receipt_url.to_string(),
            }),
        }
    }
}

impl Default for ReceiptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiptEntry {
    /// Derive the feedback URL and the normalized visit date.
    ///
    /// The six identifier parts become `CN1..CN6`; the date and time become
    /// the survey's date-picker and hour/minute/meridian parameters.
    pub fn feedback_target(&self) -> Result<FeedbackTarget, ResolutionError> {
        let parts: Vec<&str> = self.entry_id.split('-').collect();
        if parts.len() != 6 {
            return Err(ResolutionError::MalformedEntry {
                detail: format!("expected a six-part entry id, got `{}`", self.entry_id),
            });
        }

        let hour = self.time_slice(0..2)?;
        let minute = self.time_slice(3..5)?;
        let meridian = self.time_slice(5..7)?.to_uppercase();

        let date = NaiveDate::parse_from_str(&self.date, "%m/%d/%y").map_err(|_| {
            ResolutionError::MalformedEntry {
                detail: format!("expected a MM/DD/YY date, got `{}`", self.date),
            }
        })?;
        let visit_date = date.format("%m/%d/%Y").to_string();
        let month = date.format("%m").to_string();
        let day = date.format("%d").to_string();
        let year = date.format("%Y").to_string();

        let url = format!(
            "https://www.krogerstoresfeedback.com/Index.aspx?\
             CN1={}&CN2={}&CN3={}&CN4={}&CN5={}&CN6={}&\
             Index_VisitDateDatePicker={month}%2f{day}%2f{year}&\
             InputHour={hour}&InputMeridian={meridian}&InputMinute={minute}",
            parts[0], parts[1], parts[2], parts[3], parts[4], parts[5],
        );

        Ok(FeedbackTarget { url, visit_date })
    }

    fn time_slice(&self, range: std::ops::Range<usize>) -> Result<&str, ResolutionError> {
        self.time
            .get(range)
            .ok_or_else(|| ResolutionError::MalformedEntry {
                detail: format!("expected a HH:MMAM time, got `{}`", self.time),
            })
    }
}

/// Resolve the most recent purchase into a feedback survey target.
///
/// The session must already be signed in and sitting on the purchases
/// listing. The outer error is a session failure; the inner one is a
/// resolution outcome the caller reports to the user.
pub async fn resolve_feedback_target(
    session: &dyn BrowserSession,
    reporter: &dyn Reporter,
    domain: &str,
) -> Result<Result<FeedbackTarget, ResolutionError>> {
    reporter.progress("Loading `My Purchases` page (to retrieve the feedback entry)");

    if dismiss_modality_overlay(session).await {
        debug!("dismissed the modality overlay");
    }

    let content = match open_latest_receipt(session).await {
        Ok(content) => content,
        Err(err) => {
            debug!(error = %err, "receipt navigation failed");
            let url = format!("https://www.{domain}/mypurchases");
            return Ok(Err(ResolutionError::PurchaseNotFound { url }));
        }
    };

    let receipt_url = session.current_url().await?;
    let entry = match ReceiptParser::new().parse(&content, &receipt_url) {
        Ok(entry) => entry,
        Err(err) => return Ok(Err(err)),
    };
    reporter.progress(&format!("Entry ID retrieved: {}", entry.entry_id));

    Ok(entry.feedback_target())
}

/// Best-effort dismissal of the modality tooltip, which sits on top of the
/// order details link when present. Absence is normal; returns whether the
/// overlay was there.
async fn dismiss_modality_overlay(session: &dyn BrowserSession) -> bool {
    match session.wait_for_selector(MODAL_OVERLAY, STEP_WAIT).await {
        Ok(outcome) if outcome.is_present() => {
            if let Err(err) = session.click(MODAL_OVERLAY).await {
                debug!(error = %err, "overlay dismissal click failed");
            }
            true
        }
        Ok(_) => false,
        Err(err) => {
            debug!(error = %err, "overlay wait failed");
            false
        }
    }
}

async fn open_latest_receipt(session: &dyn BrowserSession) -> Result<String> {
    let details = session.wait_for_selector(VIEW_DETAILS, STEP_WAIT).await?;
    if !details.is_present() {
        anyhow::bail!("order details control never appeared");
    }
    session.click(VIEW_DETAILS_LINK).await?;

    let receipt = session.wait_for_selector(VIEW_DETAILS_LINK, STEP_WAIT).await?;
    if !receipt.is_present() {
        anyhow::bail!("receipt link never appeared");
    }
    session.click(VIEW_DETAILS_LINK).await?;

    session.content().await
}
