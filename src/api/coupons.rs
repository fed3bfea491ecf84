//! Coupon clipping.
//!
//! Clips everything the coupon gallery offers. Best effort: the page gives
//! no stable confirmation of how many clips registered, so the flow clicks
//! every clip button it can reach and leaves time for the requests to land.

use std::time::Duration;

use anyhow::Result;

use crate::browser::BrowserSession;
use crate::report::Reporter;

const CLIP_ROUNDS: usize = 6;
const ROUND_SETTLE: Duration = Duration::from_millis(1000);
const FINAL_SETTLE: Duration = Duration::from_millis(3000);

/// Clicks up to the first 150 clip buttons, scrolling each into view so
/// lazy-loaded rows mount before the click.
const CLIP_JS: &str = "\
(() => {
    window.scrollTo(0, document.body.scrollHeight);
    for (let i = 0; i < 150; i++) {
        let el = document.getElementsByClassName('kds-Button--favorable')[i];
        if (el !== undefined) {
            el.scrollIntoView();
            el.click();
        }
    }
})()";

/// Clip every coupon the gallery offers.
///
/// The session must already be signed in on the coupon gallery.
pub async fn clip_all(session: &dyn BrowserSession, reporter: &dyn Reporter) -> Result<()> {
    reporter.progress("Applying the coupons, please wait..");

    // Close any promo overlay sitting over the gallery.
    session.press_key("body", "Escape").await?;

    for _ in 0..CLIP_ROUNDS {
        session.evaluate(CLIP_JS).await?;
        session.press_key("body", "End").await?;
        tokio::time::sleep(ROUND_SETTLE).await;
    }

    // Let the last round's clip requests land before teardown.
    tokio::time::sleep(FINAL_SETTLE).await;
    Ok(())
}
