//! Single-flight refresh gate
//!
//! One `tokio::sync::Mutex` slot decides who refreshes. The first caller to
//! see a 401 with the slot free takes it and runs the refresh; callers that
//! find it taken wait for release and then re-read the token store. The
//! refresh itself and every replay happen outside the slot, so only the
//! refresh negotiation is serialized.
//!
//! Each request carries the store epoch it was sent under. If the epoch has
//! moved by the time the caller gets into the gate, the token was already
//! rotated (or cleared) since that request left, and the caller uses the
//! current store state instead of refreshing again.
//!
//! The refresh runs on its own task holding an owned guard: dropping the
//! caller that started it does not abandon the waiters.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use erp_auth::{AccessToken, TokenStore};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::error::ExpiredReason;
use crate::metrics::record_refresh;
use crate::refresher::Refresher;
use crate::teardown::SessionTeardown;

/// Default bound on a single refresh call.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// Observable gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Open,
    Refreshing,
}

/// What a caller that hit a 401 should do next.
#[derive(Debug)]
pub enum Recovery {
    /// Replay the original request once with this token
    Replay(AccessToken),
    /// Give up; the session is over
    Expired(ExpiredReason),
}

struct Inner {
    slot: Arc<Mutex<()>>,
    refreshing: AtomicBool,
    store: Arc<TokenStore>,
    refresher: Arc<dyn Refresher>,
    teardown: Arc<dyn SessionTeardown>,
    refresh_timeout: Duration,
}

/// Shared refresh gate, one per application session. Cheap to clone.
#[derive(Clone)]
pub struct RefreshGate {
    inner: Arc<Inner>,
}

/// Clears the refreshing flag however the refresh task ends.
struct RefreshingFlag<'a>(&'a AtomicBool);

impl<'a> RefreshingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for RefreshingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RefreshGate {
    pub fn new(
        store: Arc<TokenStore>,
        refresher: Arc<dyn Refresher>,
        teardown: Arc<dyn SessionTeardown>,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                slot: Arc::new(Mutex::new(())),
                refreshing: AtomicBool::new(false),
                store,
                refresher,
                teardown,
                refresh_timeout,
            }),
        }
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.inner.store
    }

    pub fn state(&self) -> GateState {
        if self.inner.refreshing.load(Ordering::Acquire) {
            GateState::Refreshing
        } else {
            GateState::Open
        }
    }

    /// Wait until no refresh holds the slot, without keeping it.
    pub async fn wait_until_open(&self) {
        drop(self.inner.slot.lock().await);
    }

    /// Resolve a 401 received for a request sent under `sent_epoch`.
    ///
    /// Runs at most one refresh per failure episode. Never returns while a
    /// refresh this caller depends on is still in flight.
    #[instrument(skip(self))]
    pub async fn recover(&self, sent_epoch: u64) -> Recovery {
        loop {
            match self.inner.slot.clone().try_lock_owned() {
                Ok(slot) => {
                    let snapshot = self.inner.store.snapshot().await;
                    if snapshot.epoch != sent_epoch {
                        debug!(
                            current_epoch = snapshot.epoch,
                            "token changed since request was sent, skipping refresh"
                        );
                        return settled(snapshot.token);
                    }

                    let inner = self.inner.clone();
                    let task = tokio::spawn(async move { inner.refresh(slot).await });
                    return match task.await {
                        Ok(recovery) => recovery,
                        Err(e) => {
                            warn!(error = %e, "refresh task did not complete");
                            Recovery::Expired(ExpiredReason::RefreshFailed)
                        }
                    };
                }
                Err(_) => {
                    debug!("refresh in flight, waiting for gate");
                    self.wait_until_open().await;
                    let snapshot = self.inner.store.snapshot().await;
                    if snapshot.epoch != sent_epoch {
                        return settled(snapshot.token);
                    }
                    // The slot was only briefly held by a caller checking it
                    // was open; nothing changed, so contend for it again.
                }
            }
        }
    }
}

/// Outcome for a caller that did not run the refresh itself.
fn settled(token: Option<AccessToken>) -> Recovery {
    match token {
        Some(token) => Recovery::Replay(token),
        None => Recovery::Expired(ExpiredReason::SessionEnded),
    }
}

/// How a refresh run ended, decided while holding the slot.
enum Outcome {
    Refreshed(AccessToken),
    /// Store already cleared; teardown still owed
    Ended(ExpiredReason),
}

impl Inner {
    /// Runs on a dedicated task. The slot and the refreshing flag are
    /// released before teardown, so waiters never wait on the logout call.
    async fn refresh(&self, slot: OwnedMutexGuard<()>) -> Recovery {
        let outcome = {
            let _slot = slot;
            let _flag = RefreshingFlag::raise(&self.refreshing);
            self.refresh_locked().await
        };

        match outcome {
            Outcome::Refreshed(token) => Recovery::Replay(token),
            Outcome::Ended(reason) => {
                self.teardown.end_session().await;
                Recovery::Expired(reason)
            }
        }
    }

    async fn refresh_locked(&self) -> Outcome {
        let started = Instant::now();

        if !self.store.is_logged_in().await {
            warn!("unauthorized with no access token, ending session");
            record_refresh("no_token", started.elapsed().as_secs_f64());
            self.clear_store().await;
            return Outcome::Ended(ExpiredReason::NoToken);
        }

        debug!(timeout_secs = self.refresh_timeout.as_secs_f64(), "refreshing access token");
        match tokio::time::timeout(self.refresh_timeout, self.refresher.refresh()).await {
            Ok(Ok(token)) => {
                match self.store.set(token.clone()).await {
                    Ok(epoch) => info!(epoch, "access token refreshed"),
                    Err(e) => warn!(error = %e, "refreshed token kept in memory but not persisted"),
                }
                record_refresh("success", started.elapsed().as_secs_f64());
                Outcome::Refreshed(token)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "token refresh failed, ending session");
                record_refresh("failure", started.elapsed().as_secs_f64());
                self.clear_store().await;
                Outcome::Ended(ExpiredReason::RefreshFailed)
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.refresh_timeout.as_secs_f64(),
                    "token refresh timed out, ending session"
                );
                record_refresh("timeout", started.elapsed().as_secs_f64());
                self.clear_store().await;
                Outcome::Ended(ExpiredReason::RefreshFailed)
            }
        }
    }

    /// Waiters re-read the store on release, so it must be empty by then.
    async fn clear_store(&self) {
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "failed to persist cleared session");
        }
    }
}
