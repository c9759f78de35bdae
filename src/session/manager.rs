//! Browser session ownership and repair
//!
//! A [`SessionManager`] owns one browser driver and its authentication state.
//! Callers never hold the driver directly: [`SessionManager::ensure_healthy`]
//! probes the session, relaunches it if needed, and lends out a
//! [`SessionHandle`] that lives no longer than one fetch.

use super::driver::{BrowserDriver, BrowserLauncher, Locator};
use crate::auth::Authenticator;
use crate::state::{AuthStatus, SessionState};
use crate::{SessionError, SessionResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// The rendered page at one instant: where the browser is and what it shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
}

/// Owns one browser session and keeps it usable
pub struct SessionManager {
    slot: usize,
    launcher: Arc<dyn BrowserLauncher>,
    authenticator: Arc<Authenticator>,
    driver: Option<Box<dyn BrowserDriver>>,
    state: SessionState,
    auth: AuthStatus,
    op_timeout: Duration,
    max_attempts: u32,
}

impl SessionManager {
    /// Creates a manager; no browser is launched until first use
    ///
    /// # Arguments
    ///
    /// * `slot` - Index of this session within its pool, for logging
    /// * `launcher` - Starts new browser sessions
    /// * `authenticator` - Replays login after a relaunch
    /// * `op_timeout` - Upper bound on each browser operation
    /// * `max_attempts` - Consecutive relaunch attempts before the session is `Failed`
    pub fn new(
        slot: usize,
        launcher: Arc<dyn BrowserLauncher>,
        authenticator: Arc<Authenticator>,
        op_timeout: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            slot,
            launcher,
            authenticator,
            driver: None,
            state: SessionState::Uninitialized,
            auth: AuthStatus::LoggedOut,
            op_timeout,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn auth_status(&self) -> AuthStatus {
        self.auth
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Returns a usable handle, repairing the session first if necessary
    ///
    /// Launches the browser on first use. Otherwise probes the current
    /// location; if the probe fails the session goes `Degraded`, is torn down
    /// and relaunched, and the previous authentication is re-applied. When
    /// every relaunch attempt fails the session is `Failed` and
    /// `SessionError::Unrecoverable` is returned; a later call tries again.
    pub async fn ensure_healthy(&mut self) -> SessionResult<SessionHandle<'_>> {
        if self.driver.is_none() {
            self.recreate().await?;
        } else if !self.probe().await {
            tracing::warn!(slot = self.slot, "Browser session unresponsive, reconnecting");
            self.transition(SessionState::Degraded);
            self.teardown().await;
            self.recreate().await?;
        }
        self.handle()
    }

    /// Logs this session in with the configured credentials
    pub async fn login(&mut self) -> SessionResult<AuthStatus> {
        let authenticator = Arc::clone(&self.authenticator);
        let mut handle = self.ensure_healthy().await?;
        authenticator.login(&mut handle).await?;
        Ok(self.auth)
    }

    /// Lets the operator log this session in by hand
    pub async fn manual_login<F>(&mut self, operator_done: F) -> SessionResult<AuthStatus>
    where
        F: Future<Output = ()> + Send,
    {
        let authenticator = Arc::clone(&self.authenticator);
        let mut handle = self.ensure_healthy().await?;
        authenticator.manual_login(&mut handle, operator_done).await
    }

    /// Closes the browser; the manager can be reused and will relaunch on demand
    pub async fn shutdown(&mut self) {
        self.teardown().await;
        self.transition(SessionState::Uninitialized);
    }

    async fn probe(&mut self) -> bool {
        let Some(driver) = self.driver.as_mut() else {
            return false;
        };
        matches!(
            tokio::time::timeout(self.op_timeout, driver.current_url()).await,
            Ok(Ok(_))
        )
    }

    async fn teardown(&mut self) {
        if let Some(driver) = self.driver.take() {
            if tokio::time::timeout(self.op_timeout, driver.close())
                .await
                .is_err()
            {
                tracing::debug!(slot = self.slot, "Browser close timed out");
            }
        }
    }

    /// Launches a new driver and restores the previous authentication
    async fn recreate(&mut self) -> SessionResult<()> {
        if self.state != SessionState::Degraded {
            self.transition(SessionState::Starting);
        }

        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            match tokio::time::timeout(self.op_timeout, self.launcher.launch()).await {
                Ok(Ok(driver)) => {
                    self.driver = Some(driver);
                    self.transition(SessionState::Ready);
                    tracing::info!(slot = self.slot, attempt, "Browser session ready");
                    self.restore_auth().await;
                    return Ok(());
                }
                Ok(Err(e)) => {
                    tracing::warn!(slot = self.slot, attempt, "Browser launch failed: {}", e);
                    last_error = Some(e);
                }
                Err(_) => {
                    tracing::warn!(slot = self.slot, attempt, "Browser launch timed out");
                    last_error = Some(SessionError::Timeout {
                        operation: "launch",
                        after: self.op_timeout,
                    });
                }
            }
        }

        self.transition(SessionState::Failed);
        if let Some(e) = last_error {
            tracing::error!(slot = self.slot, "Giving up on browser session: {}", e);
        }
        Err(SessionError::Unrecoverable {
            attempts: self.max_attempts,
        })
    }

    /// Re-applies whichever authentication the session had before a relaunch
    async fn restore_auth(&mut self) {
        match self.auth {
            AuthStatus::LoggedOut => {}
            AuthStatus::Manual => {
                tracing::warn!(
                    slot = self.slot,
                    "Manual login cannot be replayed after a reconnect; assuming the session is still logged in"
                );
            }
            AuthStatus::Authenticated { .. } => {
                if !self.authenticator.has_credentials() {
                    self.auth = AuthStatus::LoggedOut;
                    return;
                }
                tracing::info!(slot = self.slot, "Re-establishing login after reconnect");
                let authenticator = Arc::clone(&self.authenticator);
                let result = match self.handle() {
                    Ok(mut handle) => authenticator.login(&mut handle).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    // Not fatal here: the next probe will catch a dead session
                    tracing::warn!(slot = self.slot, "Re-login failed: {}", e);
                    self.auth = AuthStatus::LoggedOut;
                }
            }
        }
    }

    fn handle(&mut self) -> SessionResult<SessionHandle<'_>> {
        let driver = self
            .driver
            .as_deref_mut()
            .ok_or_else(|| SessionError::Disconnected("no browser session".to_string()))?;
        Ok(SessionHandle {
            driver,
            auth: &mut self.auth,
            authenticator: &self.authenticator,
            op_timeout: self.op_timeout,
        })
    }

    fn transition(&mut self, to: SessionState) {
        if self.state != to && !self.state.can_transition_to(to) {
            tracing::debug!(
                slot = self.slot,
                "Unexpected session transition {} -> {}",
                self.state,
                to
            );
        }
        self.state = to;
    }
}

/// A borrowed, live browser session for the duration of one fetch
///
/// Every operation is bounded by the manager's operation timeout.
pub struct SessionHandle<'a> {
    driver: &'a mut dyn BrowserDriver,
    auth: &'a mut AuthStatus,
    authenticator: &'a Authenticator,
    op_timeout: Duration,
}

impl<'a> SessionHandle<'a> {
    pub fn auth_status(&self) -> AuthStatus {
        *self.auth
    }

    pub fn set_auth_status(&mut self, status: AuthStatus) {
        *self.auth = status;
    }

    pub fn authenticator(&self) -> &'a Authenticator {
        self.authenticator
    }

    pub async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        bounded("navigate", self.op_timeout, self.driver.navigate(url)).await
    }

    pub async fn current_url(&mut self) -> SessionResult<String> {
        bounded("current_url", self.op_timeout, self.driver.current_url()).await
    }

    pub async fn content(&mut self) -> SessionResult<String> {
        bounded("content", self.op_timeout, self.driver.content()).await
    }

    /// Reads the current location and rendered HTML together
    pub async fn page(&mut self) -> SessionResult<RenderedPage> {
        let url = self.current_url().await?;
        let html = self.content().await?;
        Ok(RenderedPage { url, html })
    }

    pub async fn click(&mut self, locator: &Locator) -> SessionResult<bool> {
        bounded("click", self.op_timeout, self.driver.click(locator)).await
    }

    pub async fn fill(&mut self, locator: &Locator, value: &str) -> SessionResult<bool> {
        bounded("fill", self.op_timeout, self.driver.fill(locator, value)).await
    }

    pub async fn press_enter(&mut self, locator: &Locator) -> SessionResult<bool> {
        bounded("press_enter", self.op_timeout, self.driver.press_enter(locator)).await
    }

    /// Waits for client-side rendering to settle
    pub async fn settle(&mut self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

async fn bounded<T>(
    operation: &'static str,
    after: Duration,
    fut: impl Future<Output = SessionResult<T>>,
) -> SessionResult<T> {
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(SessionError::Timeout { operation, after }),
    }
}
