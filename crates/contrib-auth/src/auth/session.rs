/*
[INPUT]:  Token pair and backend-confirmed wallet address
[OUTPUT]: Validated session value with derived expiry
[POS]:    Auth layer - session data model
[UPDATE]: When session fields or validity rules change
*/

use base64::{
    Engine as _,
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::http::{ContribError, Result};

/// An authenticated wallet session.
///
/// Always replaced as a whole; never mutated field by field once published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub wallet_address: String,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Build a session, deriving `expires_at` from the access token when possible.
    ///
    /// Returns `None` when any field is empty.
    pub fn new(
        wallet_address: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Option<Self> {
        let session = Self {
            wallet_address: normalize_address(&wallet_address.into()),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: None,
        };
        if !session.is_valid() {
            return None;
        }
        let expires_at = token_expiry(&session.access_token);
        Some(Self {
            expires_at,
            ..session
        })
    }

    /// Same identity, new token pair
    pub fn with_tokens(&self, access_token: &str, refresh_token: &str) -> Option<Self> {
        Self::new(self.wallet_address.as_str(), access_token, refresh_token)
    }

    pub fn is_valid(&self) -> bool {
        !self.wallet_address.is_empty()
            && !self.access_token.is_empty()
            && !self.refresh_token.is_empty()
    }

    /// Whether the access token should be refreshed before use.
    ///
    /// Sessions without a known expiry are treated as fresh; the backend's 401
    /// drives refresh for those.
    pub fn needs_refresh(&self, skew: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now()
                .checked_add_signed(skew)
                .is_none_or(|deadline| deadline >= expires_at),
            None => false,
        }
    }

    /// Case-insensitive identity check
    pub fn belongs_to(&self, address: &str) -> bool {
        self.wallet_address == normalize_address(address)
    }
}

/// Lowercase, trimmed form used for every address comparison and request
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// Validate a `0x`-prefixed 20-byte hex account identifier and normalize it
pub fn parse_address(address: &str) -> Result<String> {
    let normalized = normalize_address(address);
    let well_formed = normalized
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()));
    if well_formed {
        Ok(normalized)
    } else {
        Err(ContribError::InvalidAddress(address.to_string()))
    }
}

/// Read the `exp` claim of a JWT access token, if it is one
fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload_b64 = token.trim().split('.').nth(1)?;
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .or_else(|_| URL_SAFE.decode(payload_b64))
        .ok()?;
    let payload: serde_json::Value = serde_json::from_slice(&payload_bytes).ok()?;
    let exp = payload.get("exp")?.as_i64()?;
    Utc.timestamp_opt(exp, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_jwt(exp: i64) -> String {
        let header = serde_json::json!({"alg": "none", "typ": "JWT"});
        let payload = serde_json::json!({"sub": "0xabc", "exp": exp});

        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap());
        let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());

        format!("{header_b64}.{payload_b64}.signature")
    }

    #[test]
    fn test_session_requires_all_fields() {
        assert!(Session::new("0xabc", "at1", "rt1").is_some());
        assert!(Session::new("", "at1", "rt1").is_none());
        assert!(Session::new("0xabc", "", "rt1").is_none());
        assert!(Session::new("0xabc", "at1", "").is_none());
    }

    #[test]
    fn test_session_lowercases_address() {
        let session = Session::new("0xABCdef", "at1", "rt1").unwrap();
        assert_eq!(session.wallet_address, "0xabcdef");
        assert!(session.belongs_to("0xAbCDEF"));
        assert!(!session.belongs_to("0xabcdee"));
    }

    #[test]
    fn test_opaque_token_has_no_expiry() {
        let session = Session::new("0xabc", "opaque", "rt1").unwrap();
        assert!(session.expires_at.is_none());
        assert!(!session.needs_refresh(Duration::seconds(30)));
    }

    #[test]
    fn test_jwt_expiry_drives_refresh() {
        let expired = make_test_jwt(Utc::now().timestamp() - 10);
        let session = Session::new("0xabc", expired, "rt1").unwrap();
        assert!(session.expires_at.is_some());
        assert!(session.needs_refresh(Duration::zero()));

        let fresh = make_test_jwt(Utc::now().timestamp() + 3600);
        let session = Session::new("0xabc", fresh, "rt1").unwrap();
        assert!(!session.needs_refresh(Duration::seconds(30)));
        assert!(session.needs_refresh(Duration::seconds(7200)));
    }

    #[test]
    fn test_parse_address() {
        let parsed = parse_address(" 0xF39Fd6e51aad88F6F4ce6aB8827279cffFb92266 ").unwrap();
        assert_eq!(parsed, "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");

        for bad in ["", "0x", "0xabc", "f39fd6e51aad88f6f4ce6ab8827279cfffb92266", "0xg39fd6e51aad88f6f4ce6ab8827279cfffb92266"] {
            assert!(matches!(
                parse_address(bad),
                Err(ContribError::InvalidAddress(_))
            ));
        }
    }

    #[test]
    fn test_huge_skew_forces_refresh() {
        let fresh = make_test_jwt(Utc::now().timestamp() + 3600);
        let session = Session::new("0xabc", fresh, "rt1").unwrap();
        assert!(session.needs_refresh(Duration::MAX));
    }

    #[test]
    fn test_with_tokens_keeps_identity() {
        let session = Session::new("0xabc", "at1", "rt1").unwrap();
        let rotated = session.with_tokens("at2", "rt2").unwrap();
        assert_eq!(rotated.wallet_address, "0xabc");
        assert_eq!(rotated.access_token, "at2");
        assert_eq!(rotated.refresh_token, "rt2");
        assert!(session.with_tokens("", "rt2").is_none());
    }
}
