use super::{first_match, Credentials, Snapshot, Strategy};
use crate::config::AuthConfig;
use crate::session::{Locator, RenderedPage, SessionHandle};
use crate::state::AuthStatus;
use crate::SessionResult;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Delay between evidence checks while confirming a login
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Result of one programmatic login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// An evidence check confirmed the login
    Confirmed { evidence: &'static str },

    /// No evidence either way before the deadline; assumed logged in
    ///
    /// Typical when the site asks for an extra step such as a one-time code.
    Incomplete,

    /// The sign-in page reported an error
    Rejected { message: String },

    /// The sign-in form could not be driven
    Failed { reason: String },

    /// No credentials are configured
    NoCredentials,
}

impl LoginOutcome {
    /// Authentication state a session is left in after this outcome
    pub fn auth_status(&self) -> AuthStatus {
        match self {
            Self::Confirmed { .. } => AuthStatus::Authenticated { confirmed: true },
            Self::Incomplete => AuthStatus::Authenticated { confirmed: false },
            Self::Rejected { .. } | Self::Failed { .. } | Self::NoCredentials => {
                AuthStatus::LoggedOut
            }
        }
    }
}

/// Drives the sign-in surface of the publication platform
#[derive(Debug, Clone)]
pub struct Authenticator {
    credentials: Option<Credentials>,
    sign_in_url: String,
    settle: Duration,
    confirm_timeout: Duration,
}

impl Authenticator {
    /// Creates an authenticator
    ///
    /// # Arguments
    ///
    /// * `credentials` - Account to log in with; `None` disables programmatic login
    /// * `sign_in_url` - Sign-in page of the platform
    /// * `settle` - Wait after each navigation or click for the page to render
    /// * `confirm_timeout` - How long to look for evidence of success after submitting
    pub fn new(
        credentials: Option<Credentials>,
        sign_in_url: impl Into<String>,
        settle: Duration,
        confirm_timeout: Duration,
    ) -> Self {
        Self {
            credentials,
            sign_in_url: sign_in_url.into(),
            settle,
            confirm_timeout,
        }
    }

    /// Builds an authenticator from the `[auth]` section
    pub fn from_config(config: &AuthConfig, settle: Duration) -> Self {
        Self::new(
            config.credentials(),
            config.sign_in_url.clone(),
            settle,
            Duration::from_secs(config.confirm_timeout_secs),
        )
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn sign_in_url(&self) -> &str {
        &self.sign_in_url
    }

    /// Logs in with the configured credentials
    ///
    /// # Login Flow
    ///
    /// 1. Open the sign-in page and switch to the password form if offered
    /// 2. Fill the email and password fields found by ordered fallback chains
    /// 3. Click a submit button, or press Enter in the password field
    /// 4. Poll the page until an error marker or a piece of success evidence
    ///    appears, or the confirmation deadline passes
    ///
    /// The handle's auth status is updated from the outcome. Form problems and
    /// rejected credentials are outcomes, not errors; only session failures
    /// are returned as `Err`.
    pub async fn login(&self, handle: &mut SessionHandle<'_>) -> SessionResult<LoginOutcome> {
        let outcome = self.attempt_login(handle).await?;
        match &outcome {
            LoginOutcome::Confirmed { evidence } => {
                tracing::info!("Login confirmed ({})", evidence)
            }
            LoginOutcome::Incomplete => tracing::warn!(
                "No login evidence within {:?}; continuing as if logged in (the site may require an extra step)",
                self.confirm_timeout
            ),
            LoginOutcome::Rejected { message } => {
                tracing::warn!("Login rejected: {}; continuing logged out", message)
            }
            LoginOutcome::Failed { reason } => {
                tracing::warn!("Login failed: {}; continuing logged out", reason)
            }
            LoginOutcome::NoCredentials => tracing::debug!("No credentials configured"),
        }
        handle.set_auth_status(outcome.auth_status());
        Ok(outcome)
    }

    async fn attempt_login(&self, handle: &mut SessionHandle<'_>) -> SessionResult<LoginOutcome> {
        let Some(credentials) = &self.credentials else {
            return Ok(LoginOutcome::NoCredentials);
        };

        tracing::info!("Logging in as {}", credentials.email());
        handle.navigate(&self.sign_in_url).await?;
        handle.settle(self.settle).await;

        let page = handle.page().await?;
        if let Some((name, locator)) = locate(&page, &password_option_links()) {
            tracing::debug!("Switching to password form via {}", name);
            if handle.click(&locator).await? {
                handle.settle(self.settle).await;
            }
        }

        let page = handle.page().await?;
        let Some((_, email_field)) = locate(&page, &email_fields()) else {
            return Ok(LoginOutcome::Failed {
                reason: "email field not found".to_string(),
            });
        };
        handle.fill(&email_field, credentials.email()).await?;

        let Some((_, password_field)) = locate(&page, &password_fields()) else {
            return Ok(LoginOutcome::Failed {
                reason: "password field not found".to_string(),
            });
        };
        handle.fill(&password_field, credentials.password()).await?;

        let submitted = match locate(&page, &submit_buttons()) {
            Some((_, button)) => handle.click(&button).await?,
            None => false,
        };
        if !submitted {
            tracing::debug!("No submit button; pressing Enter in the password field");
            handle.press_enter(&password_field).await?;
        }

        self.await_evidence(handle).await
    }

    async fn await_evidence(&self, handle: &mut SessionHandle<'_>) -> SessionResult<LoginOutcome> {
        let deadline = Instant::now() + self.confirm_timeout;
        loop {
            handle.settle(POLL_INTERVAL).await;
            let page = handle.page().await?;
            match assess_login(&page, &self.sign_in_url) {
                Some(outcome) => return Ok(outcome),
                None if Instant::now() >= deadline => return Ok(LoginOutcome::Incomplete),
                None => continue,
            }
        }
    }

    /// Lets the operator log in by hand in the visible browser
    ///
    /// Opens the sign-in page, waits for `operator_done` to resolve (typically
    /// the operator pressing Enter), then looks once for login evidence. The
    /// session is marked [`AuthStatus::Manual`] whether or not evidence is found.
    pub async fn manual_login<F>(
        &self,
        handle: &mut SessionHandle<'_>,
        operator_done: F,
    ) -> SessionResult<AuthStatus>
    where
        F: Future<Output = ()> + Send,
    {
        handle.navigate(&self.sign_in_url).await?;
        handle.settle(self.settle).await;

        tracing::info!("Waiting for manual login in the browser window");
        operator_done.await;

        let page = handle.page().await?;
        match locate(&page, &manual_login_evidence()) {
            Some((name, _)) => tracing::info!("Manual login verified ({})", name),
            None => tracing::warn!(
                "Could not verify manual login; continuing anyway. Paywalled posts will be skipped if it failed"
            ),
        }

        handle.set_auth_status(AuthStatus::Manual);
        Ok(AuthStatus::Manual)
    }
}

/// Runs a locator chain against a rendered page
fn locate(
    page: &RenderedPage,
    chain: &[Strategy<Snapshot, Locator>],
) -> Option<(&'static str, Locator)> {
    let snapshot = Snapshot::parse(&page.url, &page.html);
    first_match(chain, &snapshot)
}

/// Decides whether a login has visibly succeeded or failed yet
fn assess_login(page: &RenderedPage, sign_in_url: &str) -> Option<LoginOutcome> {
    let snapshot = Snapshot::parse(&page.url, &page.html);

    if let Some(message) = error_message(&snapshot) {
        return Some(LoginOutcome::Rejected { message });
    }

    let sign_in_path = sign_in_path(sign_in_url);
    let left_sign_in = !page.url.is_empty() && !page.url.contains(sign_in_path.as_str());
    if left_sign_in {
        return Some(LoginOutcome::Confirmed {
            evidence: "left-sign-in-page",
        });
    }

    first_match(&login_evidence(), &snapshot).map(|(name, _)| LoginOutcome::Confirmed { evidence: name })
}

/// Path component used to recognize the sign-in page
fn sign_in_path(sign_in_url: &str) -> String {
    url::Url::parse(sign_in_url)
        .map(|u| u.path().to_string())
        .ok()
        .filter(|p| p != "/")
        .unwrap_or_else(|| "sign-in".to_string())
}

fn error_message(snapshot: &Snapshot) -> Option<String> {
    let selector = scraper::Selector::parse("#error-container").ok()?;
    let text = snapshot
        .document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn present(snapshot: &Snapshot, locator: Locator) -> Option<Locator> {
    snapshot.has(&locator).then_some(locator)
}

fn password_option_links() -> Vec<Strategy<Snapshot, Locator>> {
    vec![
        Strategy::new("login-option-link", |s: &Snapshot| {
            present(s, Locator::css("a.login-option"))
        }),
        Strategy::new("password-link-text", |s: &Snapshot| {
            present(s, Locator::text("a", "Sign in with password"))
        }),
    ]
}

fn email_fields() -> Vec<Strategy<Snapshot, Locator>> {
    vec![
        Strategy::new("email-by-type", |s: &Snapshot| {
            present(s, Locator::css("input[type='email']"))
        }),
        Strategy::new("email-by-name", |s: &Snapshot| {
            present(s, Locator::css("input[name='email']"))
        }),
        Strategy::new("email-by-placeholder", |s: &Snapshot| {
            present(s, Locator::css("input[placeholder='Email']"))
        }),
    ]
}

fn password_fields() -> Vec<Strategy<Snapshot, Locator>> {
    vec![
        Strategy::new("password-by-type", |s: &Snapshot| {
            present(s, Locator::css("input[type='password']"))
        }),
        Strategy::new("password-by-name", |s: &Snapshot| {
            present(s, Locator::css("input[name='password']"))
        }),
        Strategy::new("password-by-placeholder", |s: &Snapshot| {
            present(s, Locator::css("input[placeholder='Password']"))
        }),
    ]
}

fn submit_buttons() -> Vec<Strategy<Snapshot, Locator>> {
    vec![
        Strategy::new("submit-by-type", |s: &Snapshot| {
            present(s, Locator::css("button[type='submit']"))
        }),
        Strategy::new("submit-continue", |s: &Snapshot| {
            present(s, Locator::text("button", "Continue"))
        }),
        Strategy::new("submit-sign-in", |s: &Snapshot| {
            present(s, Locator::text("button", "Sign in"))
        }),
    ]
}

fn login_evidence() -> Vec<Strategy<Snapshot, Locator>> {
    vec![
        Strategy::new("user-menu", |s: &Snapshot| present(s, Locator::css(".user-menu"))),
        Strategy::new("dashboard-link", |s: &Snapshot| {
            present(s, Locator::text("a, button", "Dashboard"))
        }),
        Strategy::new("home-title", |s: &Snapshot| present(s, Locator::text("h1", "Home"))),
    ]
}

fn manual_login_evidence() -> Vec<Strategy<Snapshot, Locator>> {
    vec![
        Strategy::new("user-menu", |s: &Snapshot| present(s, Locator::css(".user-menu"))),
        Strategy::new("avatar-button", |s: &Snapshot| {
            present(s, Locator::css("button[class*='avatarButton']"))
        }),
        Strategy::new("dashboard-link", |s: &Snapshot| {
            present(s, Locator::text("a, button", "Dashboard"))
        }),
        Strategy::new("reader-nav", |s: &Snapshot| present(s, Locator::css(".reader-nav-root"))),
        Strategy::new("home-title", |s: &Snapshot| present(s, Locator::text("h1", "Home"))),
        Strategy::new("subscriber-only", |s: &Snapshot| {
            present(s, Locator::css("[data-testid='subscriber-only']"))
        }),
        Strategy::new("sign-out", |s: &Snapshot| {
            present(s, Locator::text("a, button", "Sign out"))
        }),
    ]
}
