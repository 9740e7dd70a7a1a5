/*
[INPUT]:  Message to sign and connected wallet state
[OUTPUT]: Signature strings and wallet connection events
[POS]:    Auth layer - wallet integration abstraction
[UPDATE]: When adding new wallet types or changing signature format
*/

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::http::{ContribError, Result};

/// Trait for wallet signing operations
///
/// The trait is async because signing may wait on a user prompt for an
/// unbounded time. A declined prompt must surface as
/// [`ContribError::UserRejectedSignature`].
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Get the wallet address
    fn address(&self) -> &str;

    /// Sign a message and return the hex-encoded signature (0x...)
    async fn sign_message(&self, message: &str) -> Result<String>;
}

/// Connection events emitted by a wallet provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// Active account changed; `None` means no account is exposed anymore
    AccountsChanged(Option<String>),
    Disconnected,
}

/// External wallet provider (browser extension, WalletConnect session, ...)
#[async_trait]
pub trait WalletConnector: Send + Sync {
    fn connected_address(&self) -> Option<String>;

    /// Subscribe to account-change and disconnect events
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;

    /// Prompt the wallet owner to sign a message with the active account
    async fn request_signature(&self, message: &str) -> Result<String>;
}

/// Signer bound to one account of a connector
pub struct ConnectedSigner {
    connector: Arc<dyn WalletConnector>,
    address: String,
}

impl ConnectedSigner {
    pub fn new(connector: Arc<dyn WalletConnector>, address: impl Into<String>) -> Self {
        Self {
            connector,
            address: address.into(),
        }
    }
}

impl fmt::Debug for ConnectedSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectedSigner")
            .field("address", &self.address)
            .finish()
    }
}

#[async_trait]
impl WalletSigner for ConnectedSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign_message(&self, message: &str) -> Result<String> {
        self.connector.request_signature(message).await
    }
}

/// Mock wallet signer for testing
#[derive(Debug, Clone)]
pub struct MockWalletSigner {
    address: String,
    signature: String,
    reject: bool,
    signed: Arc<Mutex<Vec<String>>>,
}

impl MockWalletSigner {
    /// Create a new mock signer with predetermined signature
    pub fn new(address: &str, signature: &str) -> Self {
        Self {
            address: address.to_string(),
            signature: signature.to_string(),
            reject: false,
            signed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Mock signer whose owner declines every prompt
    pub fn rejecting(address: &str) -> Self {
        Self {
            reject: true,
            ..Self::new(address, "")
        }
    }

    /// Messages this signer was asked to sign, in order
    pub fn signed_messages(&self) -> Vec<String> {
        self.signed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl WalletSigner for MockWalletSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign_message(&self, message: &str) -> Result<String> {
        self.signed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
        if self.reject {
            return Err(ContribError::UserRejectedSignature);
        }
        Ok(self.signature.clone())
    }
}

/// In-process wallet provider for testing reconciliation flows
#[derive(Debug)]
pub struct MockWalletConnector {
    address: Mutex<Option<String>>,
    reject: AtomicBool,
    events: broadcast::Sender<WalletEvent>,
}

impl MockWalletConnector {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            address: Mutex::new(None),
            reject: AtomicBool::new(false),
            events,
        }
    }

    /// Connect (or switch to) an account and notify subscribers
    pub fn connect(&self, address: &str) {
        *self.address.lock().unwrap_or_else(|e| e.into_inner()) = Some(address.to_string());
        let _ = self
            .events
            .send(WalletEvent::AccountsChanged(Some(address.to_string())));
    }

    pub fn disconnect(&self) {
        *self.address.lock().unwrap_or_else(|e| e.into_inner()) = None;
        let _ = self.events.send(WalletEvent::Disconnected);
    }

    /// Number of live event subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Make subsequent signature prompts fail as user rejections
    pub fn set_reject_signatures(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }
}

impl Default for MockWalletConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletConnector for MockWalletConnector {
    fn connected_address(&self) -> Option<String> {
        self.address.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }

    async fn request_signature(&self, message: &str) -> Result<String> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(ContribError::UserRejectedSignature);
        }
        let address = self
            .connected_address()
            .ok_or_else(|| ContribError::Wallet("no account connected".to_string()))?;
        Ok(format!("sig:{}:{message}", address.to_ascii_lowercase()))
    }
}
