/*
[INPUT]:  Wallet addresses, signers, and connector events
[OUTPUT]: Authenticated sessions and their lifecycle transitions
[POS]:    Auth layer - wallet sign-in and session management
[UPDATE]: When auth flow, persistence, or wallet integration changes
*/

pub mod attempt;
pub mod authenticator;
pub mod evm_wallet;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod wallet;

pub use attempt::{AttemptState, AttemptStatus, FailureReason};
pub use authenticator::{ReconcileAction, SessionAuthenticator, plan_reconcile};
pub use evm_wallet::EvmWalletSigner;
pub use reconcile::WalletReconciler;
pub use session::{Session, normalize_address, parse_address};
pub use store::{
    ACCESS_TOKEN_KEY, FileSessionStore, MemorySessionStore, REFRESH_TOKEN_KEY, SessionSlots,
    SessionStore, WALLET_ADDRESS_KEY, session_from_slots, slots_from_session,
};
pub use wallet::{
    ConnectedSigner, MockWalletConnector, MockWalletSigner, WalletConnector, WalletEvent,
    WalletSigner,
};
