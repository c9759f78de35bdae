//! Browser driver abstraction
//!
//! Defines the `BrowserLauncher` and `BrowserDriver` traits that abstract over
//! the browser engine (Chromium via chromiumoxide in production, a scripted
//! site in tests).

use crate::SessionResult;
use async_trait::async_trait;
use scraper::{Html, Selector};

/// Starts fresh browser sessions
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launch a browser and open one blank page.
    async fn launch(&self) -> SessionResult<Box<dyn BrowserDriver>>;
}

/// One live page in a browser
///
/// A driver is serially reentrant: callers must not issue a second operation
/// before the first completes. `&mut self` on every operation enforces this.
#[async_trait]
pub trait BrowserDriver: Send {
    /// Navigate the page to a URL and wait for the load event.
    async fn navigate(&mut self, url: &str) -> SessionResult<()>;
    /// Current location of the page; doubles as the liveness probe.
    async fn current_url(&mut self) -> SessionResult<String>;
    /// Full rendered HTML of the page.
    async fn content(&mut self) -> SessionResult<String>;
    /// Click the first element matching the locator. Returns false if none matched.
    async fn click(&mut self, locator: &Locator) -> SessionResult<bool>;
    /// Replace the value of the first matching input. Returns false if none matched.
    async fn fill(&mut self, locator: &Locator, value: &str) -> SessionResult<bool>;
    /// Press Enter in the first matching element, submitting its form.
    async fn press_enter(&mut self, locator: &Locator) -> SessionResult<bool>;
    /// Close the page and the browser.
    async fn close(self: Box<Self>);
}

/// Identifies an element on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// A CSS selector
    Css(String),
    /// The first `tag` element whose text contains `text`
    Text { tag: String, text: String },
}

impl Locator {
    pub fn css(selector: &str) -> Self {
        Self::Css(selector.to_string())
    }

    pub fn text(tag: &str, text: &str) -> Self {
        Self::Text {
            tag: tag.to_string(),
            text: text.to_string(),
        }
    }

    /// Returns true if the locator matches anything in a parsed document
    ///
    /// An invalid CSS selector matches nothing.
    pub fn is_present_in(&self, document: &Html) -> bool {
        match self {
            Self::Css(selector) => match Selector::parse(selector) {
                Ok(sel) => document.select(&sel).next().is_some(),
                Err(_) => false,
            },
            Self::Text { tag, text } => match Selector::parse(tag) {
                Ok(sel) => document
                    .select(&sel)
                    .any(|el| el.text().collect::<String>().contains(text.as_str())),
                Err(_) => false,
            },
        }
    }

    /// JavaScript expression evaluating to the first matching element or null
    pub(crate) fn to_js(&self) -> String {
        // serde_json string encoding is a valid JS string literal
        let quote = |s: &str| serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string());
        match self {
            Self::Css(selector) => format!("document.querySelector({})", quote(selector)),
            Self::Text { tag, text } => format!(
                "Array.from(document.querySelectorAll({})).find(e => (e.textContent || '').includes({})) || null",
                quote(tag),
                quote(text)
            ),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(selector) => write!(f, "{}", selector),
            Self::Text { tag, text } => write!(f, "{}:contains({:?})", tag, text),
        }
    }
}
