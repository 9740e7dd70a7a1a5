/*
[INPUT]:  Wallet connector events
[OUTPUT]: Debounced authenticate/logout calls keeping session and wallet aligned
[POS]:    Auth layer - wallet change watcher
[UPDATE]: When wallet event handling or debounce policy changes
*/

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::{
    ConnectedSigner, ReconcileAction, SessionAuthenticator, WalletConnector, WalletEvent,
    normalize_address,
};

/// Watches a wallet connector and keeps the authenticator's session bound
/// to the connected account.
///
/// Connects and account switches are debounced so the wallet provider can
/// settle before a signature prompt is shown. Disconnects log out at once.
pub struct WalletReconciler {
    authenticator: SessionAuthenticator,
    connector: Arc<dyn WalletConnector>,
    debounce: Duration,
}

impl WalletReconciler {
    pub fn new(authenticator: SessionAuthenticator, connector: Arc<dyn WalletConnector>) -> Self {
        let debounce = authenticator.config().reconcile_debounce();
        Self {
            authenticator,
            connector,
            debounce,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Process wallet events until `shutdown` is cancelled or the connector
    /// goes away
    pub async fn run(self, shutdown: CancellationToken) {
        let mut events = self.connector.subscribe();
        let mut pending: Option<JoinHandle<()>> = None;

        self.on_wallet(self.connector.connected_address(), &mut pending);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("wallet reconciler shutdown requested");
                    break;
                }
                event = events.recv() => {
                    match event {
                        Ok(WalletEvent::AccountsChanged(address)) => {
                            self.on_wallet(address, &mut pending);
                        }
                        Ok(WalletEvent::Disconnected) => {
                            self.on_wallet(None, &mut pending);
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "wallet events lagged; resyncing with connector");
                            self.on_wallet(self.connector.connected_address(), &mut pending);
                        }
                        Err(RecvError::Closed) => {
                            debug!("wallet connector closed");
                            break;
                        }
                    }
                }
            }
        }

        if let Some(task) = pending.take() {
            task.abort();
        }
    }

    fn on_wallet(&self, connected: Option<String>, pending: &mut Option<JoinHandle<()>>) {
        if let Some(task) = pending.take() {
            task.abort();
        }

        match self
            .authenticator
            .reconcile_wallet_change(connected.as_deref())
        {
            ReconcileAction::Authenticate(address) => {
                *pending = Some(tokio::spawn(authenticate_after(
                    self.authenticator.clone(),
                    self.connector.clone(),
                    address,
                    self.debounce,
                )));
            }
            ReconcileAction::Keep | ReconcileAction::Logout => {}
        }
    }
}

async fn authenticate_after(
    authenticator: SessionAuthenticator,
    connector: Arc<dyn WalletConnector>,
    address: String,
    debounce: Duration,
) {
    tokio::time::sleep(debounce).await;

    let still_connected = connector
        .connected_address()
        .is_some_and(|connected| normalize_address(&connected) == address);
    if !still_connected {
        debug!(wallet = %address, "wallet changed during debounce; skipping");
        return;
    }

    let signer = Arc::new(ConnectedSigner::new(connector, address.clone()));
    match authenticator.authenticate(&address, signer).await {
        Ok(session) => info!(wallet = %session.wallet_address, "wallet reconciled"),
        Err(err) if err.is_silent() => {
            debug!(wallet = %address, error = %err, "automatic authentication stopped");
        }
        Err(err) => warn!(wallet = %address, error = %err, "automatic authentication failed"),
    }
}
