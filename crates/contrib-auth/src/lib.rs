/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public contribution-rewards auth crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod config;
pub mod contract;
pub mod http;
pub mod types;

// Re-export commonly used types from auth
pub use auth::{
    AttemptState,
    AttemptStatus,
    EvmWalletSigner,
    FailureReason,
    FileSessionStore,
    MemorySessionStore,
    MockWalletConnector,
    MockWalletSigner,
    ReconcileAction,
    Session,
    SessionAuthenticator,
    SessionStore,
    WalletConnector,
    WalletEvent,
    WalletReconciler,
    WalletSigner,
};

pub use config::AuthConfig;

pub use contract::{ContributionContract, SubmissionReceipt};

// Re-export commonly used types from http
pub use http::{
    AuthBackend,
    AuthorizedClient,
    ClientConfig,
    ContribClient,
    ContribError,
    Result,
};

// Re-export all types
pub use types::*;
