/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for contrib-auth tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use contrib_auth::{
    AuthConfig, ClientConfig, ContribClient, MemorySessionStore, Session, SessionAuthenticator,
};
use tokio::sync::watch;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const WALLET_A: &str = "0xABC0000000000000000000000000000000000abc";
pub const WALLET_B: &str = "0xBEEF00000000000000000000000000000000beef";

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

pub fn client_for(server: &MockServer) -> ContribClient {
    ContribClient::with_config_and_base_url(ClientConfig::default(), &server.uri())
        .expect("client init")
}

/// Authenticator over a mock backend and an in-memory store
pub fn authenticator_for(
    server: &MockServer,
    session: Option<&Session>,
) -> (SessionAuthenticator, Arc<MemorySessionStore>) {
    let store = Arc::new(match session {
        Some(session) => MemorySessionStore::with_session(session),
        None => MemorySessionStore::new(),
    });
    let auth = SessionAuthenticator::init(
        Arc::new(client_for(server)),
        store.clone(),
        AuthConfig::default(),
    )
    .expect("authenticator init");
    (auth, store)
}

/// Unsigned JWT carrying only `sub` and `exp`
pub fn mock_jwt_token(exp: i64) -> String {
    let header = serde_json::json!({"alg": "none", "typ": "JWT"});
    let payload = serde_json::json!({"sub": "0xabc", "exp": exp});
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap()),
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap()),
    )
}

/// Mount nonce and verify handlers that complete a handshake for `wallet`
pub async fn mount_handshake(server: &MockServer, wallet: &str, nonce: &str, tokens: (&str, &str)) {
    let wallet = wallet.to_ascii_lowercase();
    Mock::given(method("POST"))
        .and(path("/auth/nonce"))
        .and(body_partial_json(serde_json::json!({"wallet_address": wallet})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "nonce": nonce,
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/verify"))
        .and(body_partial_json(serde_json::json!({"wallet_address": wallet})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": tokens.0,
            "refresh_token": tokens.1,
            "wallet": wallet,
        })))
        .mount(server)
        .await;
}

/// Wait until the published session satisfies `predicate`
pub async fn wait_for_session<F>(rx: &mut watch::Receiver<Option<Session>>, predicate: F) -> Option<Session>
where
    F: FnMut(&Option<Session>) -> bool,
{
    let session = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
        .await
        .expect("session never reached expected value")
        .expect("authenticator dropped");
    session.clone()
}
