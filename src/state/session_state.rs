//! Session and authentication state machines
//!
//! Session lifecycle:
//!
//! ```text
//! Uninitialized -> Starting -> Ready -> Degraded -> Ready
//!                                               \-> Failed
//! ```
//!
//! `Failed` is left again only by an explicit recreation attempt on a later
//! operation; it never loops on its own.

use std::fmt;

/// Lifecycle state of one browser session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No browser has been launched yet
    Uninitialized,

    /// A browser launch is in progress
    Starting,

    /// The last liveness probe succeeded
    Ready,

    /// A probe failed; the browser is being torn down and relaunched
    Degraded,

    /// Recreation exhausted its attempts
    Failed,
}

impl SessionState {
    /// Returns true if the session may be used without a relaunch
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns true if moving from `self` to `to` is a legal transition
    pub fn can_transition_to(&self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (Uninitialized, Starting)
                | (Starting, Ready)
                | (Starting, Failed)
                | (Ready, Degraded)
                | (Degraded, Ready)
                | (Degraded, Failed)
                | (Failed, Starting)
                | (_, Uninitialized)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Authentication state carried by a session across reconnects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthStatus {
    LoggedOut,

    /// Logged in programmatically; replayable after a reconnect
    ///
    /// `confirmed` is false when no evidence of success was seen before the
    /// deadline and the login was assumed to have worked.
    Authenticated { confirmed: bool },

    /// Logged in by hand; cannot be replayed after a reconnect
    Manual,
}

impl AuthStatus {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::LoggedOut)
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoggedOut => write!(f, "logged out"),
            Self::Authenticated { confirmed: true } => write!(f, "authenticated"),
            Self::Authenticated { confirmed: false } => write!(f, "authenticated (unconfirmed)"),
            Self::Manual => write!(f, "manually authenticated"),
        }
    }
}

/// Per-item phase of the auth/paywall protocol
///
/// An item starts in the phase inherited from its session and moves through
/// `PaywallDetected`, then optionally `Authenticating`, then `BypassAttempted`,
/// ending readable or `Unbypassable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthPhase {
    LoggedOut,
    Authenticating,
    Authenticated,
    PaywallDetected,
    BypassAttempted,
    Unbypassable,
}

impl AuthPhase {
    /// Starting phase for an item, inherited from the session
    pub fn inherited(status: AuthStatus) -> Self {
        if status.is_authenticated() {
            Self::Authenticated
        } else {
            Self::LoggedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_transitions() {
        use SessionState::*;
        assert!(Uninitialized.can_transition_to(Starting));
        assert!(Ready.can_transition_to(Degraded));
        assert!(Degraded.can_transition_to(Ready));
        assert!(Degraded.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Starting));

        assert!(!Uninitialized.can_transition_to(Ready));
        assert!(!Ready.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Ready));
    }

    #[test]
    fn test_only_ready_is_usable() {
        assert!(SessionState::Ready.is_usable());
        assert!(!SessionState::Degraded.is_usable());
        assert!(!SessionState::Failed.is_usable());
    }

    #[test]
    fn test_auth_status() {
        assert!(!AuthStatus::LoggedOut.is_authenticated());
        assert!(AuthStatus::Authenticated { confirmed: false }.is_authenticated());
        assert!(AuthStatus::Manual.is_authenticated());
        assert_eq!(
            AuthPhase::inherited(AuthStatus::Manual),
            AuthPhase::Authenticated
        );
        assert_eq!(
            AuthPhase::inherited(AuthStatus::LoggedOut),
            AuthPhase::LoggedOut
        );
    }
}
