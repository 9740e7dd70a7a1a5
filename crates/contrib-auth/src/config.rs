/*
[INPUT]:  Authenticator tuning values
[OUTPUT]: Session lifecycle configuration with defaults
[POS]:    Configuration layer - authenticator behavior
[UPDATE]: When adding new authenticator options
*/

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session authenticator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Delay before auto-authenticating after a wallet connects or switches,
    /// letting the wallet provider finish initializing
    #[serde(default = "default_reconcile_debounce_ms")]
    pub reconcile_debounce_ms: u64,
    /// Refresh the access token this long before its known expiry
    #[serde(default = "default_refresh_skew_secs")]
    pub refresh_skew_secs: u64,
}

impl AuthConfig {
    pub fn reconcile_debounce(&self) -> Duration {
        Duration::from_millis(self.reconcile_debounce_ms)
    }

    /// Refresh skew; values beyond chrono's range saturate
    pub fn refresh_skew(&self) -> chrono::Duration {
        i64::try_from(self.refresh_skew_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            reconcile_debounce_ms: default_reconcile_debounce_ms(),
            refresh_skew_secs: default_refresh_skew_secs(),
        }
    }
}

fn default_reconcile_debounce_ms() -> u64 {
    500
}

fn default_refresh_skew_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: AuthConfig = serde_json::from_str(r#"{"refresh_skew_secs": 5}"#).unwrap();
        assert_eq!(config.reconcile_debounce(), Duration::from_millis(500));
        assert_eq!(config.refresh_skew(), chrono::Duration::seconds(5));
    }

    #[test]
    fn test_oversized_refresh_skew_saturates() {
        for secs in [100_000_000_000_000_000, u64::MAX] {
            let config = AuthConfig {
                refresh_skew_secs: secs,
                ..AuthConfig::default()
            };
            assert_eq!(config.refresh_skew(), chrono::Duration::MAX);
        }
    }
}
