//! High-level account operations.
//!
//! Each operation opens its own browser session, signs in with a redirect
//! to the page it needs, does its work, and tears the session down on
//! every exit path. The data reads cache their first result for the life
//! of the process.

mod cache;
mod coupons;
mod extract;
mod models;
mod receipt;
mod signin;
mod survey;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::browser::{BrowserSession, CdpSessionFactory, SessionFactory, SessionProfile};
use crate::config::Config;
use crate::credentials::Credentials;
use crate::report::{ConsoleReporter, Reporter};

use cache::OpCache;

pub use extract::{JsonExtractor, ParseError};
pub use models::{
    AccountProfile, PointsSummary, ProgramBalance, ProgramPoints, PurchasesSummary, ReceiptSummary,
};
pub use receipt::{FeedbackTarget, ReceiptEntry, ReceiptParser, ResolutionError};
pub use signin::{sign_in_url, SignInFlow, SignInOutcome, SignInTarget};
pub use survey::{classify_step, StepState, SurveyEngine, SurveyOutcome};

const PROFILE_PATH: &str = "/accountmanagement/api/profile";
const POINTS_PATH: &str = "/accountmanagement/api/points-summary";
const PURCHASES_PATH: &str = "/mypurchases/api/v1/receipt/summary/by-user-id";

/// Facade over the account operations.
pub struct KrogerApi {
    config: Config,
    credentials: Credentials,
    factory: Arc<dyn SessionFactory>,
    reporter: Arc<dyn Reporter>,
    extractor: JsonExtractor,
    cache: OpCache,
}

impl KrogerApi {
    pub fn new(config: Config, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
            factory: Arc::new(CdpSessionFactory::new()),
            reporter: Arc::new(ConsoleReporter),
            extractor: JsonExtractor::new(),
            cache: OpCache::default(),
        }
    }

    pub fn with_factory(mut self, factory: Arc<dyn SessionFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    fn domain(&self) -> &str {
        &self.config.main.domain
    }

    fn api_url(&self, path: &str) -> String {
        format!("https://www.{}{path}", self.domain())
    }

    fn session_profile(&self) -> SessionProfile {
        let profile = if self.config.browser.headless {
            SessionProfile::headless()
        } else {
            SessionProfile::visible()
        };
        profile.with_executable(self.config.browser.executable.clone())
    }

    fn visible_profile(&self) -> SessionProfile {
        SessionProfile::visible().with_executable(self.config.browser.executable.clone())
    }

    async fn sign_in(
        &self,
        profile: &SessionProfile,
        target: &SignInTarget<'_>,
    ) -> Result<SignInOutcome> {
        let flow = SignInFlow {
            factory: self.factory.as_ref(),
            reporter: self.reporter.as_ref(),
            credentials: &self.credentials,
            domain: self.domain(),
        };
        flow.run(profile, target).await
    }

    /// Account profile, cached for the life of the process.
    ///
    /// `None` means sign-in failed or the payload was unavailable.
    pub async fn account_info(&self) -> Result<Option<AccountProfile>> {
        self.cache
            .account_info
            .get_or_try_init(|| self.fetch_account_info())
            .await
            .map(Clone::clone)
    }

    async fn fetch_account_info(&self) -> Result<Option<AccountProfile>> {
        let outcome = self
            .sign_in(&self.session_profile(), &SignInTarget::account_update())
            .await?;
        if !outcome.signed_in {
            return finish(outcome.session, Ok(None)).await;
        }

        let session = outcome.session;
        let result = self.read_profile(session.as_ref()).await;
        finish(session, result).await
    }

    async fn read_profile(&self, session: &dyn BrowserSession) -> Result<Option<AccountProfile>> {
        self.reporter.progress("Loading profile info..");
        session.navigate(&self.api_url(PROFILE_PATH)).await?;
        let content = session.content().await?;
        match self.extractor.typed::<AccountProfile>(&content) {
            Ok(profile) => Ok(Some(profile)),
            Err(err) => {
                debug!(error = %err, "profile payload unavailable");
                Ok(None)
            }
        }
    }

    /// Points balance summary, cached for the life of the process.
    ///
    /// `None` means sign-in failed or the payload was unavailable.
    pub async fn points_balance(&self) -> Result<Option<PointsSummary>> {
        self.cache
            .points_balance
            .get_or_try_init(|| self.fetch_points_balance())
            .await
            .map(Clone::clone)
    }

    async fn fetch_points_balance(&self) -> Result<Option<PointsSummary>> {
        let outcome = self
            .sign_in(&self.session_profile(), &SignInTarget::account_update())
            .await?;
        if !outcome.signed_in {
            return finish(outcome.session, Ok(None)).await;
        }

        let session = outcome.session;
        let result = self.read_points(session.as_ref()).await;
        finish(session, result).await
    }

    async fn read_points(&self, session: &dyn BrowserSession) -> Result<Option<PointsSummary>> {
        self.reporter.progress("Loading points balance..");
        session.navigate(&self.api_url(POINTS_PATH)).await?;
        let content = session.content().await?;
        match self.extractor.typed::<PointsSummary>(&content) {
            Ok(summary) if summary.primary_balance().is_some() => Ok(Some(summary)),
            Ok(_) => {
                debug!("points summary carries no program balance");
                Ok(None)
            }
            Err(err) => {
                debug!(error = %err, "points payload unavailable");
                Ok(None)
            }
        }
    }

    /// Purchases summary, cached for the life of the process.
    ///
    /// `None` means sign-in failed or the payload was unavailable.
    pub async fn purchases_summary(&self) -> Result<Option<PurchasesSummary>> {
        self.cache
            .purchases_summary
            .get_or_try_init(|| self.fetch_purchases_summary())
            .await
            .map(Clone::clone)
    }

    async fn fetch_purchases_summary(&self) -> Result<Option<PurchasesSummary>> {
        let outcome = self
            .sign_in(&self.session_profile(), &SignInTarget::account_update())
            .await?;
        if !outcome.signed_in {
            return finish(outcome.session, Ok(None)).await;
        }

        let session = outcome.session;
        let result = self.read_purchases(session.as_ref()).await;
        finish(session, result).await
    }

    async fn read_purchases(
        &self,
        session: &dyn BrowserSession,
    ) -> Result<Option<PurchasesSummary>> {
        self.reporter.progress("Loading your purchases..");
        session.navigate(&self.api_url(PURCHASES_PATH)).await?;
        let content = session.content().await?;
        match self.extractor.typed::<PurchasesSummary>(&content) {
            Ok(summary) => Ok(Some(summary)),
            Err(err) => {
                debug!(error = %err, "purchases payload unavailable");
                Ok(None)
            }
        }
    }

    /// Clip every available coupon. `None` means sign-in failed.
    pub async fn clip_coupons(&self) -> Result<Option<()>> {
        let outcome = self
            .sign_in(&self.session_profile(), &SignInTarget::coupons())
            .await?;
        if !outcome.signed_in {
            return finish(outcome.session, Ok(None)).await;
        }

        let session = outcome.session;
        let result = coupons::clip_all(session.as_ref(), self.reporter.as_ref())
            .await
            .map(Some);
        let result = finish(session, result).await;
        if matches!(result, Ok(Some(()))) {
            self.reporter
                .progress("Coupons successfully clipped to your account!");
        }
        result
    }

    /// Complete the feedback survey for the most recent purchase.
    ///
    /// `None` means sign-in or receipt resolution failed; `Some(true)` is a
    /// completed survey; `Some(false)` means the step budget ran out before
    /// the completion page appeared.
    pub async fn complete_survey(&self) -> Result<Option<bool>> {
        // The feedback site drops headless sessions, so this always opens
        // a visible window.
        let outcome = self
            .sign_in(&self.visible_profile(), &SignInTarget::my_purchases())
            .await?;
        if !outcome.signed_in {
            return finish(outcome.session, Ok(None)).await;
        }

        let session = outcome.session;
        let result = self.drive_survey(session.as_ref()).await;
        finish(session, result).await
    }

    async fn drive_survey(&self, session: &dyn BrowserSession) -> Result<Option<bool>> {
        let target =
            match receipt::resolve_feedback_target(session, self.reporter.as_ref(), self.domain())
                .await?
            {
                Ok(target) => target,
                Err(err) => {
                    self.reporter.failure(&err.to_string());
                    return Ok(None);
                }
            };

        let engine = SurveyEngine::new(self.config.survey.injection_js());
        match engine.run(session, &target).await? {
            SurveyOutcome::Finished => Ok(Some(true)),
            SurveyOutcome::Stalled => Ok(Some(false)),
        }
    }
}

/// Tear the session down and fold any teardown failure into the result.
/// The operation's own error wins; a teardown failure after a success is
/// surfaced as the error.
async fn finish<T>(mut session: Box<dyn BrowserSession>, result: Result<T>) -> Result<T> {
    match session.close().await {
        Ok(()) => result,
        Err(close_err) => match result {
            Ok(_) => Err(close_err),
            Err(err) => {
                warn!(error = %close_err, "browser teardown also failed");
                Err(err)
            }
        },
    }
}
