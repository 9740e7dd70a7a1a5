/*
[INPUT]:  Wallet address, signature, refresh token
[OUTPUT]: Nonce challenges and token pairs from the backend
[POS]:    HTTP layer - authentication endpoints (no bearer required)
[UPDATE]: When auth endpoints or payload shapes change
*/

use async_trait::async_trait;
use reqwest::Method;

use crate::auth::normalize_address;
use crate::http::{ContribClient, Result};
use crate::types::{
    NonceRequest, NonceResponse, RefreshRequest, RefreshResponse, VerifyRequest, VerifyResponse,
};

/// Backend operations the session authenticator depends on
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Issue a single-use nonce for the wallet
    async fn request_nonce(&self, wallet_address: &str) -> Result<NonceResponse>;

    /// Verify a signature over the last nonce issued to the wallet
    async fn verify_signature(&self, wallet_address: &str, signature: &str)
    -> Result<VerifyResponse>;

    /// Exchange a refresh token for a new token pair
    async fn refresh_tokens(&self, refresh_token: &str) -> Result<RefreshResponse>;
}

#[async_trait]
impl AuthBackend for ContribClient {
    /// POST /auth/nonce
    async fn request_nonce(&self, wallet_address: &str) -> Result<NonceResponse> {
        let body = NonceRequest {
            wallet_address: normalize_address(wallet_address),
        };
        let builder = self.request(Method::POST, "/auth/nonce")?.json(&body);
        self.send_json(builder).await
    }

    /// POST /auth/verify
    async fn verify_signature(
        &self,
        wallet_address: &str,
        signature: &str,
    ) -> Result<VerifyResponse> {
        let body = VerifyRequest {
            wallet_address: normalize_address(wallet_address),
            signature: signature.to_string(),
        };
        let builder = self.request(Method::POST, "/auth/verify")?.json(&body);
        self.send_json(builder).await
    }

    /// POST /auth/refresh
    async fn refresh_tokens(&self, refresh_token: &str) -> Result<RefreshResponse> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        let builder = self.request(Method::POST, "/auth/refresh")?.json(&body);
        self.send_json(builder).await
    }
}
