//! Session coordinator for the login → callback → API-call lifecycle.
//!
//! One process-wide session moves through
//! `Unauthenticated → AwaitingCallback → Authenticated ⇄ Expired`, and every
//! failure lands back in `Unauthenticated` so the flow can always restart.
//!
//! Code exchange and token refresh share one async lock, so at most one
//! token-endpoint call is in flight. The call and its commit run in a spawned
//! task that owns the lock guard. A caller that is cancelled only stops
//! waiting; the task still finishes and commits its result.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration as StdDuration, Instant};

use chrono::{Duration, Utc};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use super::authorize::{build_authorization_url, generate_state};
use super::callback::parse_callback;
use super::client::TokenClient;
use super::persist::TokenFile;
use super::store::{TokenStore, default_skew};
use super::OAuthError;
use crate::config::OAuthConfig;
use crate::models::{AuthorizationCode, TokenRecord};

/// Default time a started login waits for its callback (10 minutes).
pub const LOGIN_TTL: StdDuration = StdDuration::from_secs(600);

/// Externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Unauthenticated,
    AwaitingCallback,
    Authenticated,
    Expired,
}

struct PendingLogin {
    state: String,
    created_at: Instant,
}

enum Phase {
    Unauthenticated,
    AwaitingCallback(PendingLogin),
    Authenticated,
    Expired,
}

/// Orchestrates URL building, callback handling, exchange and refresh for a
/// single-tenant session.
pub struct SessionCoordinator {
    config: Arc<OAuthConfig>,
    client: TokenClient,
    store: Arc<TokenStore>,
    token_file: Option<TokenFile>,
    phase: Mutex<Phase>,
    grant_lock: Arc<AsyncMutex<()>>,
    skew: Duration,
    login_ttl: StdDuration,
}

impl SessionCoordinator {
    /// Create a coordinator over `store`.
    ///
    /// A store already holding a record (e.g. reloaded from disk) starts the
    /// session as authenticated, or expired if the record is past its skew.
    pub fn new(config: Arc<OAuthConfig>, client: TokenClient, store: Arc<TokenStore>) -> Self {
        let skew = default_skew();
        let phase = match store.get() {
            None => Phase::Unauthenticated,
            Some(record) if record.is_expired_at(Utc::now(), skew) => Phase::Expired,
            Some(_) => Phase::Authenticated,
        };
        Self {
            config,
            client,
            store,
            token_file: None,
            phase: Mutex::new(phase),
            grant_lock: Arc::new(AsyncMutex::new(())),
            skew,
            login_ttl: LOGIN_TTL,
        }
    }

    /// Mirror every committed record to `file`.
    pub fn with_token_file(mut self, file: TokenFile) -> Self {
        self.token_file = Some(file);
        self
    }

    /// Override the expiry safety margin.
    pub fn with_skew(mut self, skew: Duration) -> Self {
        self.skew = skew;
        self
    }

    /// Override how long a started login stays valid.
    pub fn with_login_ttl(mut self, ttl: StdDuration) -> Self {
        self.login_ttl = ttl;
        self
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    /// Current session state. Between `Authenticated` and `Expired` the
    /// stored record decides, so a token that ran out since the last call
    /// reports `Expired`.
    pub fn state(&self) -> SessionState {
        match &*self.phase() {
            Phase::Unauthenticated => SessionState::Unauthenticated,
            Phase::AwaitingCallback(_) => SessionState::AwaitingCallback,
            Phase::Authenticated | Phase::Expired => {
                if self.store.is_expired(Utc::now(), self.skew) {
                    SessionState::Expired
                } else {
                    SessionState::Authenticated
                }
            }
        }
    }

    /// Begin a login and return the provider authorization URL.
    ///
    /// Allowed from any state; a newer login replaces a pending one. A refresh
    /// or exchange already in flight stores its record but leaves this login
    /// pending.
    pub fn start_login(&self) -> Result<String, OAuthError> {
        let state = generate_state();
        let url = build_authorization_url(&self.config, &self.config.scopes, &state)?;
        *self.phase() = Phase::AwaitingCallback(PendingLogin {
            state,
            created_at: Instant::now(),
        });
        info!("login started, awaiting callback");
        Ok(url)
    }

    /// Complete a login from the provider's redirect callback URL.
    ///
    /// On any failure the session is reset to `Unauthenticated` with an empty
    /// store, and the error is returned.
    pub async fn handle_callback(
        self: &Arc<Self>,
        callback_url: &str,
    ) -> Result<TokenRecord, OAuthError> {
        let guard = Arc::clone(&self.grant_lock).lock_owned().await;
        let this = Arc::clone(self);
        let callback_url = callback_url.to_owned();

        tokio::spawn(async move {
            let _guard = guard;
            this.run_callback(&callback_url).await
        })
        .await
        .map_err(|e| OAuthError::Internal(format!("token exchange task failed: {e}")))?
    }

    /// Return a usable access token, refreshing it first if it has expired.
    ///
    /// Concurrent callers during a refresh wait for it and share its result
    /// instead of issuing their own.
    pub async fn ensure_valid_token(self: &Arc<Self>) -> Result<TokenRecord, OAuthError> {
        if let Some(record) = self.usable_record()? {
            return Ok(record);
        }

        let guard = Arc::clone(&self.grant_lock).lock_owned().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(record) = self.usable_record()? {
            return Ok(record);
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = guard;
            this.run_refresh().await
        })
        .await
        .map_err(|e| OAuthError::Internal(format!("token refresh task failed: {e}")))?
    }

    /// Drop the current token and return to `Unauthenticated`.
    pub async fn logout(&self) {
        let _guard = self.grant_lock.lock().await;
        self.reset().await;
        *self.phase() = Phase::Unauthenticated;
        info!("session logged out");
    }

    async fn run_callback(&self, callback_url: &str) -> Result<TokenRecord, OAuthError> {
        let pending = self.take_pending();
        let outcome = match self.accept_callback(pending, callback_url) {
            Ok(code) => self.client.exchange_code(&self.config, code).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(record) => {
                self.commit(&record).await;
                info!(expires_at = %record.expires_at, "login completed");
                Ok(record)
            }
            Err(err) => {
                warn!(error = %err, "login callback failed");
                self.reset().await;
                Err(err)
            }
        }
    }

    async fn run_refresh(&self) -> Result<TokenRecord, OAuthError> {
        let Some(current) = self.store.get() else {
            self.reset().await;
            return Err(OAuthError::NotAuthenticated);
        };

        debug!(expires_at = %current.expires_at, "access token expired, refreshing");
        match self.client.refresh(&self.config, &current).await {
            Ok(record) => {
                self.commit(&record).await;
                info!(expires_at = %record.expires_at, "access token refreshed");
                Ok(record)
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed, login required");
                self.reset().await;
                Err(err)
            }
        }
    }

    /// Validate the callback against the pending login and pull out the code.
    fn accept_callback(
        &self,
        pending: Option<PendingLogin>,
        callback_url: &str,
    ) -> Result<AuthorizationCode, OAuthError> {
        let pending = pending.ok_or(OAuthError::NoPendingLogin)?;
        if pending.created_at.elapsed() > self.login_ttl {
            return Err(OAuthError::LoginExpired);
        }

        let callback = parse_callback(callback_url)?;
        if callback.state.as_deref() != Some(pending.state.as_str()) {
            return Err(OAuthError::StateMismatch);
        }
        Ok(callback.code)
    }

    /// Take the pending login, leaving the session `Unauthenticated` until
    /// the exchange commits.
    fn take_pending(&self) -> Option<PendingLogin> {
        match std::mem::replace(&mut *self.phase(), Phase::Unauthenticated) {
            Phase::AwaitingCallback(pending) => Some(pending),
            _ => None,
        }
    }

    /// The stored record if the session is authenticated and it is fresh;
    /// `None` if it needs a refresh.
    fn usable_record(&self) -> Result<Option<TokenRecord>, OAuthError> {
        let mut phase = self.phase();
        if matches!(*phase, Phase::Unauthenticated | Phase::AwaitingCallback(_)) {
            return Err(OAuthError::NotAuthenticated);
        }

        let Some(record) = self.store.get() else {
            *phase = Phase::Unauthenticated;
            return Err(OAuthError::NotAuthenticated);
        };

        if record.is_expired_at(Utc::now(), self.skew) {
            *phase = Phase::Expired;
            Ok(None)
        } else {
            *phase = Phase::Authenticated;
            Ok(Some(record))
        }
    }

    async fn commit(&self, record: &TokenRecord) {
        self.store.set(record.clone());
        self.settle(Phase::Authenticated);

        if let Some(file) = &self.token_file
            && let Err(e) = file.save(record).await
        {
            warn!(path = %file.path().display(), error = %e, "failed to persist token record");
        }
    }

    async fn reset(&self) {
        self.store.clear();
        self.settle(Phase::Unauthenticated);

        if let Some(file) = &self.token_file
            && let Err(e) = file.remove().await
        {
            warn!(path = %file.path().display(), error = %e, "failed to remove token file");
        }
    }

    /// Move to `next` unless a login started since the grant began is still
    /// waiting for its callback.
    fn settle(&self, next: Phase) {
        let mut phase = self.phase();
        if !matches!(*phase, Phase::AwaitingCallback(_)) {
            *phase = next;
        }
    }

    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
