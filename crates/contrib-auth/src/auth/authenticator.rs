/*
[INPUT]:  Wallet address + signer, backend auth client, session store
[OUTPUT]: Authenticated session kept fresh across expiry and wallet switches
[POS]:    Auth layer - orchestrates the session lifecycle
[UPDATE]: When handshake steps, refresh policy, or supersession rules change
*/

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::auth::{
    AttemptState, AttemptStatus, FailureReason, Session, SessionStore, WalletSigner,
    normalize_address, parse_address, session_from_slots,
};
use crate::config::AuthConfig;
use crate::http::{AuthBackend, ContribError, Result};

type SharedOutcome = Shared<BoxFuture<'static, Result<Session>>>;

/// What the caller should do after the connected wallet changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Current session already belongs to the connected wallet
    Keep,
    /// Run a handshake for this (normalized) address
    Authenticate(String),
    /// Wallet went away; the session has been cleared
    Logout,
}

/// Decide how to react to the connected wallet, given the current session
pub fn plan_reconcile(session: Option<&Session>, connected: Option<&str>) -> ReconcileAction {
    match connected {
        None => ReconcileAction::Logout,
        Some(address) => match session {
            Some(session) if session.belongs_to(address) => ReconcileAction::Keep,
            _ => ReconcileAction::Authenticate(normalize_address(address)),
        },
    }
}

/// Owns the wallet-to-session binding.
///
/// Exactly one session is active at a time. Handshakes and refreshes are
/// tagged with sequence numbers; a result is committed only if its tag is
/// still current when it completes.
#[derive(Clone)]
pub struct SessionAuthenticator {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn SessionStore>,
    config: AuthConfig,
    state: Mutex<State>,
    session_tx: watch::Sender<Option<Session>>,
}

#[derive(Default)]
struct State {
    session: Option<Session>,
    status: AttemptStatus,
    last_failure: Option<FailureReason>,
    attempt_seq: u64,
    attempt: Option<InFlight>,
    refresh_seq: u64,
    refresh: Option<PendingRefresh>,
}

struct InFlight {
    id: u64,
    address: String,
    outcome: SharedOutcome,
}

/// Refresh in flight for the session holding `refresh_token`
struct PendingRefresh {
    id: u64,
    refresh_token: String,
    outcome: SharedOutcome,
}

impl SessionAuthenticator {
    /// Create an authenticator, restoring any complete persisted session.
    ///
    /// Incomplete persisted slots are cleared.
    pub fn init(
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn SessionStore>,
        config: AuthConfig,
    ) -> Result<Self> {
        let slots = store.read_slots()?;
        let session = session_from_slots(&slots);
        if session.is_none() && !slots.is_empty() {
            warn!("discarding incomplete persisted session");
            store.clear()?;
        }

        let mut state = State::default();
        if let Some(session) = &session {
            info!(wallet = %session.wallet_address, "restored persisted session");
            state.status = AttemptStatus {
                address: Some(session.wallet_address.clone()),
                state: AttemptState::Authenticated,
            };
        }
        state.session = session.clone();
        let (session_tx, _) = watch::channel(session);

        Ok(Self {
            inner: Arc::new(Inner {
                backend,
                store,
                config,
                state: Mutex::new(state),
                session_tx,
            }),
        })
    }

    /// Abandon in-flight handshakes and refreshes. The persisted session is
    /// left untouched for the next `init`.
    pub fn teardown(&self) {
        let mut state = self.inner.lock_state();
        state.attempt = None;
        state.refresh = None;
        if state.status.state.is_in_progress() {
            state.status.advance(AttemptState::Idle);
        }
        debug!("session authenticator torn down");
    }

    pub fn config(&self) -> &AuthConfig {
        &self.inner.config
    }

    /// Current session, if any
    pub fn session(&self) -> Option<Session> {
        self.inner.lock_state().session.clone()
    }

    /// Watch the current session; receivers see `None` after logout or a
    /// failed refresh
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.session_tx.subscribe()
    }

    pub fn attempt_status(&self) -> AttemptStatus {
        self.inner.lock_state().status.clone()
    }

    /// Reason the most recent attempt failed, cleared by the next success
    pub fn last_failure(&self) -> Option<FailureReason> {
        self.inner.lock_state().last_failure.clone()
    }

    /// Run the nonce-challenge handshake for `address`.
    ///
    /// 1. Fetch a fresh nonce
    /// 2. Have the signer sign it
    /// 3. Verify the signature with the backend
    /// 4. Build the session from the backend-confirmed wallet
    /// 5. Persist, then publish
    ///
    /// A call for an address whose handshake is already in flight joins that
    /// handshake. A call for a different address supersedes it.
    pub async fn authenticate(
        &self,
        address: &str,
        signer: Arc<dyn WalletSigner>,
    ) -> Result<Session> {
        let address = parse_address(address)?;

        let outcome = {
            let mut state = self.inner.lock_state();
            let joined = state
                .attempt
                .as_ref()
                .filter(|attempt| attempt.address == address)
                .map(|attempt| {
                    debug!(wallet = %address, attempt = attempt.id, "joining in-flight authentication");
                    attempt.outcome.clone()
                });
            match joined {
                Some(outcome) => outcome,
                None => self.start_attempt(&mut state, address, signer),
            }
        };

        outcome.await
    }

    fn start_attempt(
        &self,
        state: &mut State,
        address: String,
        signer: Arc<dyn WalletSigner>,
    ) -> SharedOutcome {
        if let Some(previous) = &state.attempt {
            debug!(
                superseded = %previous.address,
                attempt = previous.id,
                wallet = %address,
                "superseding in-flight authentication"
            );
        }

        state.attempt_seq += 1;
        let id = state.attempt_seq;
        let outcome = run_handshake(self.inner.clone(), id, address.clone(), signer)
            .boxed()
            .shared();

        state.status.begin(&address);
        state.attempt = Some(InFlight {
            id,
            address,
            outcome: outcome.clone(),
        });
        outcome
    }

    /// Mint a new token pair from the stored refresh token
    pub async fn refresh_access_token(&self) -> Result<Session> {
        self.refresh(None).await
    }

    /// Refresh on behalf of a request rejected while presenting
    /// `access_token`.
    ///
    /// When the session already carries a different access token, someone
    /// else refreshed in the meantime and the current session is returned
    /// without a network call.
    pub async fn refresh_after_unauthorized(&self, access_token: &str) -> Result<Session> {
        self.refresh(Some(access_token)).await
    }

    /// Session whose access token is not known to be expired, refreshing
    /// first when needed
    pub async fn usable_session(&self) -> Result<Session> {
        let session = self.session().ok_or(ContribError::NoSession)?;
        if session.needs_refresh(self.inner.config.refresh_skew()) {
            debug!(wallet = %session.wallet_address, "access token near expiry; refreshing");
            return self.refresh_after_unauthorized(&session.access_token).await;
        }
        Ok(session)
    }

    async fn refresh(&self, rejected: Option<&str>) -> Result<Session> {
        let outcome = {
            let mut state = self.inner.lock_state();
            let current_refresh_token = state.session.as_ref().map(|s| s.refresh_token.as_str());
            let pending = state
                .refresh
                .as_ref()
                .filter(|refresh| Some(refresh.refresh_token.as_str()) == current_refresh_token)
                .map(|refresh| {
                    debug!(refresh = refresh.id, "joining in-flight token refresh");
                    refresh.outcome.clone()
                });
            match pending {
                Some(outcome) => outcome,
                None => {
                    let session = state.session.clone().ok_or(ContribError::NoSession)?;
                    if rejected.is_some_and(|token| token != session.access_token) {
                        return Ok(session);
                    }

                    state.refresh_seq += 1;
                    let id = state.refresh_seq;
                    let refresh_token = session.refresh_token.clone();
                    let outcome = run_refresh(self.inner.clone(), id, session)
                        .boxed()
                        .shared();
                    state.refresh = Some(PendingRefresh {
                        id,
                        refresh_token,
                        outcome: outcome.clone(),
                    });
                    outcome
                }
            }
        };

        outcome.await
    }

    /// React to the wallet provider reporting `connected` as the active
    /// account (`None` when disconnected).
    ///
    /// Disconnect logs out immediately. Reconnecting the session's own wallet
    /// abandons any handshake started for another wallet. For a different
    /// wallet the old session stays current until the caller's new handshake
    /// succeeds.
    pub fn reconcile_wallet_change(&self, connected: Option<&str>) -> ReconcileAction {
        let mut state = self.inner.lock_state();
        let action = plan_reconcile(state.session.as_ref(), connected);

        match &action {
            ReconcileAction::Logout => {
                debug!("wallet disconnected");
                self.inner.logout(&mut state);
            }
            ReconcileAction::Keep => {
                let wallet = state
                    .session
                    .as_ref()
                    .map(|session| session.wallet_address.clone())
                    .unwrap_or_default();
                let stale = state
                    .attempt
                    .as_ref()
                    .is_some_and(|attempt| attempt.address != wallet);
                if stale {
                    if let Some(attempt) = state.attempt.take() {
                        debug!(
                            abandoned = %attempt.address,
                            wallet = %wallet,
                            "wallet switched back; abandoning handshake"
                        );
                    }
                    state.status = AttemptStatus {
                        address: Some(wallet),
                        state: AttemptState::Authenticated,
                    };
                }
            }
            ReconcileAction::Authenticate(address) => {
                debug!(wallet = %address, "wallet requires authentication");
            }
        }

        action
    }

    /// Clear the session everywhere. Idempotent, never fails.
    pub fn logout(&self) {
        let mut state = self.inner.lock_state();
        self.inner.logout(&mut state);
    }
}

impl fmt::Debug for SessionAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("SessionAuthenticator")
            .field(
                "wallet",
                &state.session.as_ref().map(|s| s.wallet_address.as_str()),
            )
            .field("status", &state.status)
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Advance the attempt state, or report that attempt `id` lost its slot
    fn advance_attempt(&self, id: u64, next: AttemptState) -> Result<()> {
        let mut state = self.lock_state();
        if !state.attempt.as_ref().is_some_and(|attempt| attempt.id == id) {
            return Err(ContribError::Superseded);
        }
        state.status.advance(next);
        Ok(())
    }

    fn publish(&self, state: &mut State, session: Option<Session>) {
        state.session = session.clone();
        self.session_tx.send_replace(session);
    }

    fn clear_session(&self, state: &mut State) {
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "failed to clear persisted session");
        }
        self.publish(state, None);
    }

    fn logout(&self, state: &mut State) {
        if let Some(attempt) = state.attempt.take() {
            debug!(wallet = %attempt.address, attempt = attempt.id, "abandoning in-flight authentication");
        }
        state.refresh = None;
        state.status.reset();

        let wallet = state.session.as_ref().map(|s| s.wallet_address.clone());
        self.clear_session(state);
        if let Some(wallet) = wallet {
            info!(wallet = %wallet, "logged out");
        }
    }

    /// Commit or discard the outcome of attempt `id`
    fn finish_attempt(&self, id: u64, address: &str, result: Result<Session>) -> Result<Session> {
        let mut state = self.lock_state();
        if !state.attempt.as_ref().is_some_and(|attempt| attempt.id == id) {
            debug!(wallet = %address, attempt = id, "discarding superseded authentication result");
            return Err(ContribError::Superseded);
        }
        state.attempt = None;

        let result = result.and_then(|session| {
            self.store.save(&session)?;
            Ok(session)
        });

        match result {
            Ok(session) => {
                // a refresh started for the replaced session must not be joined
                state.refresh = None;
                state.status.advance(AttemptState::Authenticated);
                state.last_failure = None;
                self.publish(&mut state, Some(session.clone()));
                info!(wallet = %session.wallet_address, "session established");
                Ok(session)
            }
            Err(err) => {
                if matches!(err, ContribError::UserRejectedSignature) {
                    info!(wallet = %address, "signature request rejected by user");
                } else {
                    warn!(wallet = %address, error = %err, "authentication failed");
                }
                let reason = FailureReason::from_error(&err);
                state.status.advance(AttemptState::Failed(reason.clone()));
                state.status.advance(AttemptState::Idle);
                state.last_failure = Some(reason);
                Err(err)
            }
        }
    }
}

async fn run_handshake(
    inner: Arc<Inner>,
    id: u64,
    address: String,
    signer: Arc<dyn WalletSigner>,
) -> Result<Session> {
    let result = handshake(&inner, id, &address, signer.as_ref()).await;
    inner.finish_attempt(id, &address, result)
}

async fn handshake(
    inner: &Inner,
    id: u64,
    address: &str,
    signer: &dyn WalletSigner,
) -> Result<Session> {
    let challenge = inner
        .backend
        .request_nonce(address)
        .await
        .map_err(|e| ContribError::ChallengeUnavailable(e.to_string()))?;
    if challenge.nonce.is_empty() {
        return Err(ContribError::ChallengeUnavailable(
            "backend returned an empty nonce".to_string(),
        ));
    }

    inner.advance_attempt(id, AttemptState::AwaitingSignature)?;
    let signature = signer.sign_message(&challenge.nonce).await?;

    inner.advance_attempt(id, AttemptState::Verifying)?;
    let verified = inner
        .backend
        .verify_signature(address, &signature)
        .await
        .map_err(verification_error)?;

    if normalize_address(&verified.wallet) != address {
        return Err(ContribError::AddressMismatch {
            requested: address.to_string(),
            confirmed: verified.wallet,
        });
    }

    Session::new(
        verified.wallet,
        verified.access_token,
        verified.refresh_token,
    )
    .ok_or_else(|| ContribError::InvalidResponse("verify response missing tokens".to_string()))
}

fn verification_error(err: ContribError) -> ContribError {
    match err {
        ContribError::Unauthorized { message } => ContribError::InvalidSignature(message),
        ContribError::Api { code, message } if matches!(code, 400 | 401 | 403) => {
            ContribError::InvalidSignature(message)
        }
        other => other,
    }
}

async fn run_refresh(inner: Arc<Inner>, id: u64, stale: Session) -> Result<Session> {
    let result = inner.backend.refresh_tokens(&stale.refresh_token).await;

    let mut state = inner.lock_state();
    if state.refresh.as_ref().is_some_and(|refresh| refresh.id == id) {
        state.refresh = None;
    }
    let unchanged = state.session.as_ref() == Some(&stale);

    match result {
        Ok(tokens) => {
            if !unchanged {
                debug!(wallet = %stale.wallet_address, "session replaced during refresh; keeping newer session");
                return state.session.clone().ok_or(ContribError::NoSession);
            }
            let refreshed = stale
                .with_tokens(&tokens.access_token, &tokens.refresh_token)
                .ok_or_else(|| {
                    ContribError::InvalidResponse("refresh response missing tokens".to_string())
                })?;
            if let Err(err) = inner.store.save(&refreshed) {
                warn!(wallet = %refreshed.wallet_address, error = %err, "failed to persist refreshed session");
                return Err(err);
            }
            inner.publish(&mut state, Some(refreshed.clone()));
            info!(wallet = %refreshed.wallet_address, "access token refreshed");
            Ok(refreshed)
        }
        Err(err) if is_refresh_rejection(&err) => {
            if !unchanged {
                debug!(wallet = %stale.wallet_address, error = %err, "refresh rejected for replaced session; keeping newer session");
                return state.session.clone().ok_or(ContribError::NoSession);
            }
            warn!(wallet = %stale.wallet_address, error = %err, "refresh token rejected; clearing session");
            if state.attempt.is_none() {
                state.status.reset();
            }
            inner.clear_session(&mut state);
            Err(ContribError::SessionExpired)
        }
        Err(err) => {
            warn!(wallet = %stale.wallet_address, error = %err, "token refresh failed");
            Err(err)
        }
    }
}

fn is_refresh_rejection(err: &ContribError) -> bool {
    match err {
        ContribError::Unauthorized { .. } => true,
        ContribError::Api { code, .. } => matches!(code, 400 | 401 | 403),
        _ => false,
    }
}
