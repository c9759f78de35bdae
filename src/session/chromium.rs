//! Chromium-based browser driver using chromiumoxide.

use super::driver::{BrowserDriver, BrowserLauncher, Locator};
use crate::config::SessionConfig;
use crate::{SessionError, SessionResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use tokio::task::JoinHandle;

/// Flags that keep the browser quiet and less obviously automated
const BROWSER_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-notifications",
    "--disable-extensions",
    "--disable-dev-shm-usage",
];

/// Launches Chromium instances configured from [`SessionConfig`]
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    headless: bool,
    executable: Option<PathBuf>,
    user_agent: Option<String>,
}

impl ChromiumLauncher {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            headless: config.headless,
            executable: config.browser_path.as_ref().map(PathBuf::from),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Command-line flags added on top of the builder's own; the headless
    /// mode is set on the builder and never appears here
    fn extra_args(&self) -> Vec<String> {
        let mut args: Vec<String> = BROWSER_ARGS.iter().map(|a| a.to_string()).collect();
        if let Some(agent) = &self.user_agent {
            args.push(format!("--user-agent={}", agent));
        }
        args
    }

    fn browser_config(&self) -> SessionResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder();
        builder = if self.headless {
            builder.headless_mode(HeadlessMode::New)
        } else {
            builder.with_head()
        };
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        for arg in self.extra_args() {
            builder = builder.arg(arg);
        }
        builder
            .build()
            .map_err(|e| SessionError::Launch(format!("invalid browser config: {e}")))
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> SessionResult<Box<dyn BrowserDriver>> {
        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        // The handler stream ends when the websocket to the browser closes
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("Browser handler event error: {}", e);
                }
            }
            tracing::debug!("Browser handler stream ended");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(SessionError::Launch(format!("failed to open page: {e}")));
            }
        };

        tracing::debug!(headless = self.headless, "Launched Chromium");
        Ok(Box::new(ChromiumDriver {
            browser,
            page,
            handler,
        }))
    }
}

/// A single Chromium page plus the browser that owns it
pub struct ChromiumDriver {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumDriver {
    /// Maps a CDP error to a session error
    ///
    /// The handler task exits once the browser connection closes, so a finished
    /// handler marks the error as a lost session rather than a page failure.
    fn classify(&self, err: CdpError) -> SessionError {
        if self.handler.is_finished() {
            SessionError::Disconnected(err.to_string())
        } else {
            SessionError::Navigation(err.to_string())
        }
    }

    async fn eval_bool(&mut self, script: String) -> SessionResult<bool> {
        let result = match self.page.evaluate(script).await {
            Ok(result) => result,
            Err(e) => return Err(self.classify(e)),
        };
        result
            .into_value::<bool>()
            .map_err(|e| SessionError::Script(e.to_string()))
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        match self.page.goto(url).await {
            Ok(_) => Ok(()),
            Err(e) => Err(self.classify(e)),
        }
    }

    async fn current_url(&mut self) -> SessionResult<String> {
        match self.page.url().await {
            Ok(url) => Ok(url.unwrap_or_default()),
            // Any failure of the probe means the session is unusable
            Err(e) => Err(SessionError::Disconnected(e.to_string())),
        }
    }

    async fn content(&mut self) -> SessionResult<String> {
        match self.page.content().await {
            Ok(html) => Ok(html),
            Err(e) => Err(self.classify(e)),
        }
    }

    async fn click(&mut self, locator: &Locator) -> SessionResult<bool> {
        let script = format!(
            "(() => {{ const el = {}; if (!el) return false; el.click(); return true; }})()",
            locator.to_js()
        );
        self.eval_bool(script).await
    }

    async fn fill(&mut self, locator: &Locator, value: &str) -> SessionResult<bool> {
        let value = serde_json::to_string(value).map_err(|e| SessionError::Script(e.to_string()))?;
        // Use the native setter so framework-controlled inputs see the change
        let script = format!(
            "(() => {{ const el = {}; if (!el) return false; el.focus(); \
             const proto = Object.getPrototypeOf(el); \
             const desc = Object.getOwnPropertyDescriptor(proto, 'value'); \
             if (desc && desc.set) {{ desc.set.call(el, {value}); }} else {{ el.value = {value}; }} \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true; }})()",
            locator.to_js()
        );
        self.eval_bool(script).await
    }

    async fn press_enter(&mut self, locator: &Locator) -> SessionResult<bool> {
        let script = format!(
            "(() => {{ const el = {}; if (!el) return false; \
             const opts = {{ key: 'Enter', code: 'Enter', keyCode: 13, bubbles: true }}; \
             el.dispatchEvent(new KeyboardEvent('keydown', opts)); \
             el.dispatchEvent(new KeyboardEvent('keyup', opts)); \
             if (el.form) {{ if (el.form.requestSubmit) el.form.requestSubmit(); else el.form.submit(); }} \
             return true; }})()",
            locator.to_js()
        );
        self.eval_bool(script).await
    }

    async fn close(self: Box<Self>) {
        let mut this = *self;
        if let Err(e) = this.browser.close().await {
            tracing::debug!("Browser close failed: {}", e);
        }
        if let Err(e) = this.browser.wait().await {
            tracing::debug!("Browser process did not exit cleanly: {}", e);
        }
        this.handler.abort();
    }
}
