//! Single-flight coordination of access-token refreshes.
//!
//! The first request that hits an expired token becomes the leader and runs
//! the refresh exchange. Requests that fail while it is in flight wait in a
//! FIFO queue and receive the leader's outcome once it completes.

use crate::utils::error::RefreshFailure;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::oneshot;

pub type RefreshOutcome = Result<String, RefreshFailure>;

#[derive(Debug, Default)]
struct RefreshState {
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

enum Role {
    Leader,
    Follower(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().in_flight
    }

    pub fn queued(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Returns a fresh access token for a request that was rejected while
    /// carrying `stale`.
    ///
    /// `current` reads the stored token. It is consulted under the lock: if
    /// the stored token already differs from `stale` and no refresh is
    /// running, a previous refresh has finished and its token is reused
    /// without calling `refresh` again.
    pub async fn token_after_refresh<C, F, Fut>(
        &self,
        stale: Option<&str>,
        current: C,
        refresh: F,
    ) -> RefreshOutcome
    where
        C: FnOnce() -> Option<String>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome>,
    {
        let role = {
            let mut state = self.lock();
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                Role::Follower(rx)
            } else {
                if let Some(token) = current().filter(|token| Some(token.as_str()) != stale) {
                    tracing::debug!("Access token already refreshed, reusing it");
                    return Ok(token);
                }
                state.in_flight = true;
                Role::Leader
            }
        };

        match role {
            Role::Follower(rx) => {
                tracing::debug!("Refresh in flight, queueing request");
                rx.await.unwrap_or_else(|_| Err(RefreshFailure::abandoned()))
            }
            Role::Leader => {
                let mut guard = InFlightGuard {
                    coordinator: self,
                    armed: true,
                };
                let outcome = refresh().await;
                guard.complete(&outcome);
                outcome
            }
        }
    }
}

/// Clears the in-flight flag even when the leader's future is dropped,
/// so queued requests are released instead of waiting forever.
struct InFlightGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    armed: bool,
}

impl InFlightGuard<'_> {
    fn complete(&mut self, outcome: &RefreshOutcome) {
        let waiters = {
            let mut state = self.coordinator.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        self.armed = false;

        tracing::debug!("Releasing {} queued request(s)", waiters.len());
        for waiter in waiters {
            // A waiter whose request was dropped has nothing left to replay.
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.coordinator.lock();
            state.in_flight = false;
            // Dropping the senders wakes every follower with an abandoned refresh.
            state.waiters.clear();
        }
    }
}
