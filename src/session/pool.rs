//! A fixed set of independently owned browser sessions
//!
//! Each slot is a `tokio::sync::Mutex<SessionManager>`. A worker holds its
//! slot's lock for its whole navigate/probe/extract sequence, so no two
//! workers ever drive the same browser at once. With one slot every fetch is
//! serialized through a single session.

use super::manager::SessionManager;
use super::BrowserLauncher;
use crate::auth::Authenticator;
use crate::config::SessionConfig;
use crate::state::AuthStatus;
use crate::{SessionError, SessionResult};
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, OwnedSemaphorePermit, Semaphore};

/// Pool of browser sessions, one per concurrency slot
pub struct SessionPool {
    slots: Vec<Arc<Mutex<SessionManager>>>,
    permits: Arc<Semaphore>,
}

impl SessionPool {
    /// Creates a pool from already-constructed managers
    ///
    /// An empty list yields a closed pool.
    pub fn new(managers: Vec<SessionManager>) -> Self {
        let permits = Arc::new(Semaphore::new(managers.len()));
        if managers.is_empty() {
            permits.close();
        }
        Self {
            slots: managers
                .into_iter()
                .map(|m| Arc::new(Mutex::new(m)))
                .collect(),
            permits,
        }
    }

    /// Creates `config.pool_size` sessions sharing one launcher and authenticator
    pub fn from_config(
        config: &SessionConfig,
        launcher: Arc<dyn BrowserLauncher>,
        authenticator: Arc<Authenticator>,
    ) -> Self {
        let op_timeout = Duration::from_secs(config.operation_timeout_secs);
        let managers = (0..config.pool_size.max(1))
            .map(|slot| {
                SessionManager::new(
                    slot,
                    Arc::clone(&launcher),
                    Arc::clone(&authenticator),
                    op_timeout,
                    config.max_reconnect_attempts,
                )
            })
            .collect();
        Self::new(managers)
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Waits for a free session and leases it exclusively
    pub async fn checkout(&self) -> SessionResult<SessionLease> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| SessionError::PoolClosed)?;

        for slot in &self.slots {
            if let Ok(guard) = Arc::clone(slot).try_lock_owned() {
                return Ok(SessionLease {
                    guard,
                    _permit: permit,
                });
            }
        }

        // A slot can still be held outside a lease (login_all, shutdown)
        let slot = self.slots.first().ok_or(SessionError::PoolClosed)?;
        let guard = Arc::clone(slot).lock_owned().await;
        Ok(SessionLease {
            guard,
            _permit: permit,
        })
    }

    /// Logs every session in with the configured credentials
    ///
    /// A session that cannot be started is logged and left for the first
    /// fetch to repair.
    pub async fn login_all(&self) -> Vec<AuthStatus> {
        let mut statuses = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let mut manager = slot.lock().await;
            match manager.login().await {
                Ok(status) => statuses.push(status),
                Err(e) => {
                    tracing::warn!(slot = manager.slot(), "Login skipped: {}", e);
                    statuses.push(AuthStatus::LoggedOut);
                }
            }
        }
        statuses
    }

    /// Runs a manual login on the first session
    pub async fn manual_login<F>(&self, operator_done: F) -> SessionResult<AuthStatus>
    where
        F: Future<Output = ()> + Send,
    {
        let slot = self.slots.first().ok_or(SessionError::PoolClosed)?;
        let mut manager = slot.lock().await;
        manager.manual_login(operator_done).await
    }

    /// Refuses new checkouts and closes every browser
    pub async fn shutdown(&self) {
        self.permits.close();
        for slot in &self.slots {
            slot.lock().await.shutdown().await;
        }
        tracing::debug!(sessions = self.slots.len(), "Session pool shut down");
    }
}

/// Exclusive use of one pooled session, released on drop
pub struct SessionLease {
    // Field order matters: the slot lock is released before the permit
    guard: OwnedMutexGuard<SessionManager>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for SessionLease {
    type Target = SessionManager;

    fn deref(&self) -> &SessionManager {
        &self.guard
    }
}

impl DerefMut for SessionLease {
    fn deref_mut(&mut self) -> &mut SessionManager {
        &mut self.guard
    }
}
