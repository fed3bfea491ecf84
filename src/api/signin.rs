//! Sign-in flow.
//!
//! Signs in through the storefront form with a redirect to the page the
//! operation needs, then verifies the landing page by content markers. A
//! failed headless attempt is retried once in a visible window; headless
//! sign-in gets flagged often enough that the retry is routine.

use anyhow::Result;
use secrecy::ExposeSecret;
use tracing::debug;

use crate::browser::{BrowserSession, SessionFactory, SessionProfile};
use crate::credentials::Credentials;
use crate::report::Reporter;

pub const EMAIL_INPUT: &str = "#SignIn-emailInput";
pub const PASSWORD_INPUT: &str = "#SignIn-passwordInput";

pub fn sign_in_url(domain: &str, redirect_path: &str) -> String {
    format!("https://www.{domain}/signin?redirectUrl={redirect_path}")
}

/// Where sign-in lands and how success is recognized there.
#[derive(Debug, Clone, Copy)]
pub struct SignInTarget<'a> {
    pub redirect_path: &'a str,
    /// Success requires every marker to appear in the landing page content.
    pub required_markers: &'a [&'a str],
}

impl SignInTarget<'static> {
    /// The account update page, used by the plain data reads.
    pub fn account_update() -> Self {
        Self {
            redirect_path: "/account/update",
            required_markers: &["Profile Information"],
        }
    }

    /// The purchases listing, used by survey completion.
    pub fn my_purchases() -> Self {
        Self {
            redirect_path: "/mypurchases",
            required_markers: &["My Purchases"],
        }
    }

    /// The coupon gallery.
    pub fn coupons() -> Self {
        Self {
            redirect_path: "/cl/coupons/",
            required_markers: &["Coupons Clipped"],
        }
    }
}

/// A session joined with whether sign-in succeeded on it. The session is
/// live either way; the caller owns teardown.
pub struct SignInOutcome {
    pub session: Box<dyn BrowserSession>,
    pub signed_in: bool,
}

/// Drives the sign-in form and verifies the post-redirect page.
pub struct SignInFlow<'a> {
    pub factory: &'a dyn SessionFactory,
    pub reporter: &'a dyn Reporter,
    pub credentials: &'a Credentials,
    pub domain: &'a str,
}

impl SignInFlow<'_> {
    pub async fn run(
        &self,
        profile: &SessionProfile,
        target: &SignInTarget<'_>,
    ) -> Result<SignInOutcome> {
        self.reporter
            .progress("Signing in.. (please wait, it might take awhile)");

        let mut session = self.factory.open(profile).await?;
        let mut signed_in = match self.attempt(session.as_ref(), profile, target).await {
            Ok(signed_in) => signed_in,
            Err(err) => {
                let _ = session.close().await;
                return Err(err);
            }
        };

        if !signed_in && profile.is_headless() {
            self.reporter
                .failure("Sign in failed. Trying one more time..");
            session.close().await?;

            let visible = profile.to_visible();
            session = self.factory.open(&visible).await?;
            signed_in = match self.attempt(session.as_ref(), &visible, target).await {
                Ok(signed_in) => signed_in,
                Err(err) => {
                    let _ = session.close().await;
                    return Err(err);
                }
            };
        }

        if !signed_in {
            self.reporter
                .failure("Sign in failed. Please make sure the username/password is correct.");
        }

        Ok(SignInOutcome { session, signed_in })
    }

    async fn attempt(
        &self,
        session: &dyn BrowserSession,
        profile: &SessionProfile,
        target: &SignInTarget<'_>,
    ) -> Result<bool> {
        let url = sign_in_url(self.domain, target.redirect_path);
        session.navigate(&url).await?;

        session
            .type_text(EMAIL_INPUT, &self.credentials.username)
            .await?;
        session
            .type_text(PASSWORD_INPUT, self.credentials.password.expose_secret())
            .await?;
        // Enter on the password field submits the form.
        session.press_key(PASSWORD_INPUT, "Enter").await?;

        match session
            .wait_for_navigation(profile.navigation_timeout())
            .await
        {
            Ok(outcome) if outcome.is_present() => {}
            Ok(_) => return Ok(false),
            Err(err) => {
                debug!(error = %err, "post-submit navigation failed");
                return Ok(false);
            }
        }

        let html = session.content().await?;
        Ok(target
            .required_markers
            .iter()
            .all(|marker| html.contains(marker)))
    }
}
