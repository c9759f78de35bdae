//! Per-item paywall detection and bypass
//!
//! Gate detectors run in order: structural markers, then attribute markers,
//! then content heuristics. A gated page is given one chance to clear, either
//! by re-probing after a settle delay (already logged in) or by logging in and
//! reloading (credentials available).

use super::{first_match, Snapshot, Strategy};
use crate::session::{Locator, RenderedPage, SessionHandle};
use crate::state::AuthPhase;
use crate::SessionResult;
use std::time::Duration;

/// Phrases shown in place of the body of member-only posts
const GATE_PHRASES: &[&str] = &[
    "This post is for paid subscribers",
    "This post is for paying subscribers",
    "Keep reading with a 7-day free trial",
    "Subscribe to keep reading",
];

/// Whether a post can be read in the current session
///
/// Both variants carry the phases the item passed through, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessVerdict {
    /// No gate (or the gate cleared); `page` is the readable page
    Open {
        trail: Vec<AuthPhase>,
        page: RenderedPage,
    },

    /// The gate persisted after every available bypass
    Unbypassable {
        detector: &'static str,
        trail: Vec<AuthPhase>,
    },
}

impl AccessVerdict {
    pub fn trail(&self) -> &[AuthPhase] {
        match self {
            Self::Open { trail, .. } | Self::Unbypassable { trail, .. } => trail,
        }
    }
}

/// Returns the name of the first detector that sees a gate on the page
pub fn detect_gate(page: &RenderedPage) -> Option<&'static str> {
    let snapshot = Snapshot::parse(&page.url, &page.html);
    first_match(&gate_detectors(), &snapshot).map(|(name, _)| name)
}

/// Decides whether the post at `url` is readable, attempting a bypass if gated
///
/// The handle must already be on `url`. Only session failures are errors; a
/// persistent gate is reported as [`AccessVerdict::Unbypassable`].
///
/// # Arguments
///
/// * `handle` - Session positioned on the post
/// * `url` - The post being fetched, for reloading after a login
/// * `settle` - Wait before re-probing, to let client rendering finish
pub async fn resolve_access(
    handle: &mut SessionHandle<'_>,
    url: &str,
    settle: Duration,
) -> SessionResult<AccessVerdict> {
    let mut trail = vec![AuthPhase::inherited(handle.auth_status())];
    let page = handle.page().await?;
    let Some(detector) = detect_gate(&page) else {
        return Ok(AccessVerdict::Open { trail, page });
    };
    tracing::debug!(url, detector, "Paywall detected");
    trail.push(AuthPhase::PaywallDetected);

    if handle.auth_status().is_authenticated() {
        // Gate markers sometimes linger while the member view renders
        trail.push(AuthPhase::BypassAttempted);
        handle.settle(settle).await;
    } else {
        let authenticator = handle.authenticator();
        if !authenticator.has_credentials() {
            tracing::info!(url, "Paywalled post skipped (no credentials configured)");
            trail.push(AuthPhase::Unbypassable);
            return Ok(AccessVerdict::Unbypassable { detector, trail });
        }
        tracing::info!(url, "Paywalled post, attempting login");
        trail.push(AuthPhase::Authenticating);
        authenticator.login(handle).await?;
        trail.push(AuthPhase::inherited(handle.auth_status()));
        trail.push(AuthPhase::BypassAttempted);
        handle.navigate(url).await?;
        handle.settle(settle).await;
    }

    let page = handle.page().await?;
    match detect_gate(&page) {
        None => {
            tracing::debug!(url, "Paywall cleared");
            Ok(AccessVerdict::Open { trail, page })
        }
        Some(detector) => {
            tracing::info!(url, detector, "Paywall could not be bypassed, skipping");
            trail.push(AuthPhase::Unbypassable);
            Ok(AccessVerdict::Unbypassable { detector, trail })
        }
    }
}

fn marker(snapshot: &Snapshot, selector: &str) -> Option<()> {
    snapshot.has(&Locator::css(selector)).then_some(())
}

fn gate_detectors() -> Vec<Strategy<Snapshot, ()>> {
    vec![
        Strategy::new("paywall-title", |s: &Snapshot| marker(s, "h2.paywall-title")),
        Strategy::new("paywall-block", |s: &Snapshot| marker(s, ".paywall")),
        Strategy::new("paywall-testid", |s: &Snapshot| {
            marker(s, "[data-testid='paywall']")
        }),
        Strategy::new("gate-phrase", |s: &Snapshot| {
            let text = s.document.root_element().text().collect::<String>();
            GATE_PHRASES
                .iter()
                .any(|phrase| text.contains(phrase))
                .then_some(())
        }),
    ]
}
