/*
[INPUT]:  Handshake progress events and failures
[OUTPUT]: Guarded authentication attempt state
[POS]:    Auth layer - per-attempt state machine
[UPDATE]: When handshake steps or allowed transitions change
*/

use std::fmt;

use tracing::debug;

use crate::http::ContribError;

/// Why an authentication attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    ChallengeUnavailable,
    UserRejectedSignature,
    InvalidSignature,
    AddressMismatch,
    Other(String),
}

impl FailureReason {
    pub fn from_error(err: &ContribError) -> Self {
        match err {
            ContribError::ChallengeUnavailable(_) => FailureReason::ChallengeUnavailable,
            ContribError::UserRejectedSignature => FailureReason::UserRejectedSignature,
            ContribError::InvalidSignature(_) => FailureReason::InvalidSignature,
            ContribError::AddressMismatch { .. } => FailureReason::AddressMismatch,
            other => FailureReason::Other(other.to_string()),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ChallengeUnavailable => f.write_str("challenge unavailable"),
            FailureReason::UserRejectedSignature => f.write_str("user rejected signature"),
            FailureReason::InvalidSignature => f.write_str("invalid signature"),
            FailureReason::AddressMismatch => f.write_str("address mismatch"),
            FailureReason::Other(message) => f.write_str(message),
        }
    }
}

/// Progress of one challenge-response handshake
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttemptState {
    #[default]
    Idle,
    FetchingNonce,
    AwaitingSignature,
    Verifying,
    Authenticated,
    Failed(FailureReason),
}

impl AttemptState {
    pub fn can_transition_to(&self, next: &AttemptState) -> bool {
        use AttemptState::*;

        match (self, next) {
            (Idle, FetchingNonce)
            | (FetchingNonce, AwaitingSignature)
            | (AwaitingSignature, Verifying)
            | (Verifying, Authenticated) => true,
            (FetchingNonce | AwaitingSignature | Verifying, Failed(_)) => true,
            // retry, logout, refresh failure, wallet change, supersession
            (_, Idle) => true,
            _ => false,
        }
    }

    /// A handshake step is waiting on the network or the wallet owner
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            AttemptState::FetchingNonce | AttemptState::AwaitingSignature | AttemptState::Verifying
        )
    }
}

/// State of the current attempt together with the wallet it targets
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttemptStatus {
    pub address: Option<String>,
    pub state: AttemptState,
}

impl AttemptStatus {
    /// Start a fresh attempt for `address`, whatever the previous state was
    pub(crate) fn begin(&mut self, address: &str) {
        self.address = Some(address.to_string());
        self.state = AttemptState::Idle;
        self.advance(AttemptState::FetchingNonce);
    }

    /// Apply a transition if the state machine allows it
    pub(crate) fn advance(&mut self, next: AttemptState) -> bool {
        if !self.state.can_transition_to(&next) {
            debug!(from = ?self.state, to = ?next, "ignored invalid attempt transition");
            return false;
        }
        debug!(
            address = self.address.as_deref().unwrap_or("-"),
            from = ?self.state,
            to = ?next,
            "attempt transition"
        );
        self.state = next;
        true
    }

    pub(crate) fn reset(&mut self) {
        self.address = None;
        self.state = AttemptState::Idle;
    }
}
