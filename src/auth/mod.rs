//! Authentication and paywall protocol
//!
//! This module runs against a borrowed [`SessionHandle`](crate::session::SessionHandle):
//! - Programmatic login with ordered evidence checks (`login`)
//! - Manual login, where the operator signs in by hand
//! - Per-item paywall detection and bypass (`paywall`)
//!
//! Every ordered fallback (which element to fill, which evidence proves a
//! login, which marker reveals a gate) is a list of [`Strategy`] values
//! evaluated in order; the first to produce a value wins.

mod login;
pub mod paywall;

pub use login::{Authenticator, LoginOutcome};
pub use paywall::{resolve_access, AccessVerdict};

use crate::session::Locator;
use scraper::Html;
use std::fmt;

/// One named, pure probe in an ordered fallback chain
pub struct Strategy<I: ?Sized, O> {
    pub name: &'static str,
    pub probe: fn(&I) -> Option<O>,
}

impl<I: ?Sized, O> Strategy<I, O> {
    pub const fn new(name: &'static str, probe: fn(&I) -> Option<O>) -> Self {
        Self { name, probe }
    }
}

/// Evaluates strategies in order and returns the first hit with its name
pub fn first_match<I: ?Sized, O>(
    strategies: &[Strategy<I, O>],
    input: &I,
) -> Option<(&'static str, O)> {
    strategies
        .iter()
        .find_map(|strategy| (strategy.probe)(input).map(|out| (strategy.name, out)))
}

/// A parsed view of the page at one instant
///
/// Holds a `scraper::Html`, which is not `Send`; build it, probe it, and drop
/// it without crossing an `.await`.
pub struct Snapshot {
    pub url: String,
    pub document: Html,
}

impl Snapshot {
    pub fn parse(url: &str, html: &str) -> Self {
        Self {
            url: url.to_string(),
            document: Html::parse_document(html),
        }
    }

    /// Returns true if the locator matches this page
    pub fn has(&self, locator: &Locator) -> bool {
        locator.is_present_in(&self.document)
    }
}

/// Account credentials for programmatic login
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    pub fn new(email: String, password: String) -> Self {
        Self { email, password }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
