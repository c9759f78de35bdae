//! A scripted publication site and browser for unit tests
//!
//! `FakeSite` is shared state behind a lock; every `FakeDriver` launched from
//! it renders pages out of that state, keeps its own login cookie, and can be
//! killed from the test to simulate a lost browser.

use super::driver::{BrowserDriver, BrowserLauncher, Locator};
use super::manager::SessionManager;
use super::pool::SessionPool;
use crate::auth::{Authenticator, Credentials};
use crate::{SessionError, SessionResult};
use async_trait::async_trait;
use scraper::Html;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub(crate) const SIGN_IN_PAGE: &str = "https://fake.test/sign-in";
pub(crate) const LANDING_PAGE: &str = "https://fake.test/home";

const SIGN_IN_FORM: &str = r#"<form>
  <input type="email" name="email">
  <input type="password" name="password">
  <button type="submit">Continue</button>
</form>"#;

const GATE_HTML: &str = r#"<article>
  <h1 class="post-title">Members only</h1>
  <div class="paywall"><h2 class="paywall-title">This post is for paid subscribers</h2></div>
</article>"#;

/// Renders a post page in the markup the extractor understands
pub(crate) fn post_html(title: &str, datetime: &str, body: &str) -> String {
    format!(
        r#"<html><body><article>
  <h1 class="post-title">{title}</h1>
  <h3 class="subtitle">A subtitle</h3>
  <div class="post-header"><time datetime="{datetime}">ignored</time></div>
  <a class="post-ufi-button"><span class="label">7</span></a>
  <div class="available-content"><div class="body markup"><p>{body}</p></div></div>
</article></body></html>"#
    )
}

#[derive(Default)]
struct SiteState {
    pages: HashMap<String, String>,
    member_pages: HashMap<String, String>,
    locked: HashSet<String>,
    credentials: Option<(String, String)>,
    silent_login: bool,
    op_delay: Duration,
    disconnect_on: HashMap<String, u32>,

    next_browser: u64,
    alive: HashSet<u64>,
    fail_launches: u32,

    launches: usize,
    navigations: Vec<String>,
    login_submissions: usize,
    active: usize,
    max_active: usize,
}

/// Handle to the scripted site; clones share state
#[derive(Clone, Default)]
pub(crate) struct FakeSite {
    inner: Arc<Mutex<SiteState>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SiteState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Account the sign-in form accepts
    pub fn with_credentials(self, email: &str, password: &str) -> Self {
        self.state().credentials = Some((email.to_string(), password.to_string()));
        self
    }

    /// Accepts logins without ever showing evidence of success
    pub fn with_silent_login(self) -> Self {
        self.state().silent_login = true;
        self
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.state().pages.insert(url.to_string(), html.to_string());
        self
    }

    /// An open post dated `datetime`
    pub fn with_post(self, url: &str, title: &str, datetime: &str) -> Self {
        let html = post_html(title, datetime, "Body text");
        self.with_page(url, &html)
    }

    /// A post readable only by logged-in browsers
    pub fn with_member_post(self, url: &str, title: &str) -> Self {
        let html = post_html(title, "2024-03-01T09:00:00.000Z", "Member body");
        self.state().member_pages.insert(url.to_string(), html);
        self
    }

    /// A post gated even for logged-in browsers
    pub fn with_locked_post(self, url: &str) -> Self {
        self.state().locked.insert(url.to_string());
        self
    }

    /// Navigation to `url` drops the browser the first `times` times
    pub fn with_disconnect_on(self, url: &str, times: u32) -> Self {
        self.state().disconnect_on.insert(url.to_string(), times);
        self
    }

    /// Every navigation takes at least this long
    pub fn with_op_delay(self, delay: Duration) -> Self {
        self.state().op_delay = delay;
        self
    }

    /// Kills every running browser
    pub fn kill_browser(&self) {
        self.state().alive.clear();
    }

    pub fn fail_next_launches(&self, n: u32) {
        self.state().fail_launches = n;
    }

    pub fn launches(&self) -> usize {
        self.state().launches
    }

    pub fn login_submissions(&self) -> usize {
        self.state().login_submissions
    }

    pub fn open_browsers(&self) -> usize {
        self.state().alive.len()
    }

    pub fn visited(&self, url: &str) -> bool {
        self.state().navigations.iter().any(|u| u == url)
    }

    pub fn navigations_to(&self, url: &str) -> usize {
        self.state().navigations.iter().filter(|u| *u == url).count()
    }

    /// Highest number of navigations that were in flight at once
    pub fn max_active(&self) -> usize {
        self.state().max_active
    }

    pub fn launcher(&self) -> Arc<dyn BrowserLauncher> {
        Arc::new(FakeLauncher { site: self.clone() })
    }

    fn authenticator(&self, credentials: Option<Credentials>) -> Arc<Authenticator> {
        Arc::new(Authenticator::new(
            credentials,
            SIGN_IN_PAGE,
            Duration::ZERO,
            Duration::from_secs(1),
        ))
    }

    fn site_credentials(&self) -> Option<Credentials> {
        self.state()
            .credentials
            .clone()
            .map(|(email, password)| Credentials::new(email, password))
    }

    fn build_manager(
        &self,
        slot: usize,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> SessionManager {
        SessionManager::new(
            slot,
            self.launcher(),
            self.authenticator(credentials),
            timeout,
            1,
        )
    }

    /// A manager that logs in with the site's own account
    pub fn manager(&self) -> SessionManager {
        self.build_manager(0, self.site_credentials(), Duration::from_secs(5))
    }

    pub fn manager_with_credentials(&self, email: &str, password: &str) -> SessionManager {
        let credentials = Credentials::new(email.to_string(), password.to_string());
        self.build_manager(0, Some(credentials), Duration::from_secs(5))
    }

    pub fn manager_with_timeout(&self, timeout: Duration) -> SessionManager {
        self.build_manager(0, self.site_credentials(), timeout)
    }

    pub fn pool(&self, size: usize) -> SessionPool {
        let managers = (0..size)
            .map(|slot| self.build_manager(slot, self.site_credentials(), Duration::from_secs(5)))
            .collect();
        SessionPool::new(managers)
    }

    /// Renders `url` for a browser with the given login cookie
    fn render(&self, url: &str, logged_in: bool, login_error: bool) -> String {
        let state = self.state();
        if url == SIGN_IN_PAGE {
            let error = if login_error {
                r#"<div id="error-container">Invalid email or password</div>"#
            } else {
                ""
            };
            return format!("<html><body>{error}{SIGN_IN_FORM}</body></html>");
        }
        if url == LANDING_PAGE {
            return r#"<html><body><nav class="user-menu">me</nav><h1>Home</h1></body></html>"#
                .to_string();
        }
        if state.locked.contains(url) {
            return GATE_HTML.to_string();
        }
        if let Some(html) = state.member_pages.get(url) {
            return if logged_in {
                html.clone()
            } else {
                GATE_HTML.to_string()
            };
        }
        state
            .pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| "<html><body><h1>Not found</h1></body></html>".to_string())
    }
}

struct FakeLauncher {
    site: FakeSite,
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> SessionResult<Box<dyn BrowserDriver>> {
        let mut state = self.site.state();
        if state.fail_launches > 0 {
            state.fail_launches -= 1;
            return Err(SessionError::Launch("scripted launch failure".to_string()));
        }
        state.launches += 1;
        state.next_browser += 1;
        let id = state.next_browser;
        state.alive.insert(id);
        Ok(Box::new(FakeDriver {
            site: self.site.clone(),
            id,
            url: "about:blank".to_string(),
            logged_in: false,
            login_error: false,
            email: None,
            password: None,
        }))
    }
}

struct FakeDriver {
    site: FakeSite,
    id: u64,
    url: String,
    logged_in: bool,
    login_error: bool,
    email: Option<String>,
    password: Option<String>,
}

impl FakeDriver {
    fn check_alive(&self) -> SessionResult<()> {
        if self.site.state().alive.contains(&self.id) {
            Ok(())
        } else {
            Err(SessionError::Disconnected("browser killed".to_string()))
        }
    }

    fn html(&self) -> String {
        self.site.render(&self.url, self.logged_in, self.login_error)
    }

    fn present(&self, locator: &Locator) -> bool {
        let document = Html::parse_document(&self.html());
        locator.is_present_in(&document)
    }

    fn submit(&mut self) {
        let mut state = self.site.state();
        state.login_submissions += 1;
        let accepted = match (&state.credentials, &self.email, &self.password) {
            (Some((email, password)), Some(e), Some(p)) => email == e && password == p,
            _ => false,
        };
        if !accepted {
            self.login_error = true;
            return;
        }
        self.logged_in = true;
        self.login_error = false;
        if !state.silent_login {
            self.url = LANDING_PAGE.to_string();
        }
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        self.check_alive()?;
        let delay = {
            let mut state = self.site.state();
            state.navigations.push(url.to_string());
            state.active += 1;
            state.max_active = state.max_active.max(state.active);
            state.op_delay
        };
        tokio::time::sleep(delay.max(Duration::from_millis(1))).await;

        let mut guard = self.site.state();
        let state = &mut *guard;
        state.active -= 1;
        if let Some(remaining) = state.disconnect_on.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                state.alive.remove(&self.id);
                return Err(SessionError::Disconnected(format!("dropped while loading {url}")));
            }
        }
        self.url = url.to_string();
        self.login_error = false;
        self.email = None;
        self.password = None;
        Ok(())
    }

    async fn current_url(&mut self) -> SessionResult<String> {
        self.check_alive()?;
        Ok(self.url.clone())
    }

    async fn content(&mut self) -> SessionResult<String> {
        self.check_alive()?;
        Ok(self.html())
    }

    async fn click(&mut self, locator: &Locator) -> SessionResult<bool> {
        self.check_alive()?;
        if !self.present(locator) {
            return Ok(false);
        }
        if self.url == SIGN_IN_PAGE && *locator == Locator::css("button[type='submit']") {
            self.submit();
        }
        Ok(true)
    }

    async fn fill(&mut self, locator: &Locator, value: &str) -> SessionResult<bool> {
        self.check_alive()?;
        if !self.present(locator) {
            return Ok(false);
        }
        let target = locator.to_string();
        if target.contains("email") {
            self.email = Some(value.to_string());
        } else if target.contains("password") {
            self.password = Some(value.to_string());
        }
        Ok(true)
    }

    async fn press_enter(&mut self, locator: &Locator) -> SessionResult<bool> {
        self.check_alive()?;
        if !self.present(locator) {
            return Ok(false);
        }
        if self.url == SIGN_IN_PAGE {
            self.submit();
        }
        Ok(true)
    }

    async fn close(self: Box<Self>) {
        self.site.state().alive.remove(&self.id);
    }
}
