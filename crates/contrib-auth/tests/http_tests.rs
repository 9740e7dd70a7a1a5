/*
[INPUT]:  Mock HTTP responses
[OUTPUT]: Test results for the authorized HTTP client
[POS]:    Integration tests - HTTP endpoints
[UPDATE]: When HTTP endpoints or retry policy change
*/

mod common;

use std::time::Duration;

use chrono::Utc;
use common::{WALLET_A, authenticator_for, client_for, mock_jwt_token, setup_mock_server};
use contrib_auth::{
    AuthorizedClient, ClientConfig, ContribClient, ContribError, ContributionStatus,
    ContributionType, Session,
};
use rust_decimal::Decimal;
use tokio_test::assert_ok;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn profile_body() -> serde_json::Value {
    serde_json::json!({
        "wallet_address": WALLET_A.to_ascii_lowercase(),
        "username": "alice",
        "total_points": 1200,
        "token_balance": "300.5",
        "contribution_count": 4,
    })
}

fn dashboard_body() -> serde_json::Value {
    serde_json::json!({
        "total_points": 1200,
        "pending_points": 100,
        "redeemable_tokens": "300",
        "rank": 7,
        "recent_contributions": [{
            "id": "c1",
            "contribution_type": "bounty",
            "points": 200,
            "status": "verified",
            "proof_url": "https://github.com/org/repo/pull/1",
        }],
    })
}

fn authorized_for(server: &MockServer, session: Option<&Session>) -> AuthorizedClient {
    let (auth, _store) = authenticator_for(server, session);
    AuthorizedClient::new(client_for(server), auth)
}

async fn mount_refresh(server: &MockServer, delay: Duration, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(serde_json::json!({"refresh_token": "rt1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({
                    "access_token": "at2",
                    "refresh_token": "rt2",
                }))
                .set_delay(delay),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[test]
fn test_client_creation() {
    let client = assert_ok!(ContribClient::new());
    assert_eq!(client.base_url().as_str(), "https://api.contrib.rewards/");
}

#[test]
fn test_client_rejects_invalid_base_url() {
    let err = ContribClient::with_config_and_base_url(ClientConfig::default(), "not a url")
        .unwrap_err();
    assert!(matches!(err, ContribError::UrlParse(_)));
}

#[tokio::test]
async fn test_profile_sends_bearer_token() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .and(header("authorization", "Bearer at1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body()))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::new(WALLET_A, "at1", "rt1").unwrap();
    let client = authorized_for(&server, Some(&session));

    let profile = assert_ok!(client.get_profile().await);
    assert_eq!(profile.username.as_deref(), Some("alice"));
    assert_eq!(profile.total_points, 1200);
    assert_eq!(profile.token_balance, "300.5".parse::<Decimal>().unwrap());
    assert_eq!(profile.contribution_count, 4);
}

#[tokio::test]
async fn test_dashboard_decodes_contributions() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/user/dashboard"))
        .and(header("authorization", "Bearer at1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dashboard_body()))
        .mount(&server)
        .await;

    let session = Session::new(WALLET_A, "at1", "rt1").unwrap();
    let client = authorized_for(&server, Some(&session));

    let dashboard = assert_ok!(client.get_dashboard().await);
    assert_eq!(dashboard.rank, Some(7));
    assert_eq!(dashboard.redeemable_tokens, Decimal::from(300));
    let contribution = &dashboard.recent_contributions[0];
    assert_eq!(contribution.contribution_type, ContributionType::Bounty);
    assert_eq!(contribution.status, ContributionStatus::Verified);
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/user/dashboard"))
        .and(header("authorization", "Bearer at1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "message": "token expired",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/dashboard"))
        .and(header("authorization", "Bearer at2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dashboard_body()))
        .expect(5)
        .mount(&server)
        .await;
    mount_refresh(&server, Duration::from_millis(200), 1).await;

    let session = Session::new(WALLET_A, "at1", "rt1").unwrap();
    let client = authorized_for(&server, Some(&session));

    let requests: Vec<_> = (0..5)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.get_dashboard().await })
        })
        .collect();

    for request in requests {
        let dashboard = assert_ok!(request.await.unwrap());
        assert_eq!(dashboard.total_points, 1200);
    }

    let session = client.authenticator().session().unwrap();
    assert_eq!(session.access_token, "at2");
    assert_eq!(session.refresh_token, "rt2");
}

#[tokio::test]
async fn test_second_401_is_authentication_failed() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "message": "account suspended",
        })))
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(&server, Duration::ZERO, 1).await;

    let session = Session::new(WALLET_A, "at1", "rt1").unwrap();
    let client = authorized_for(&server, Some(&session));

    match client.get_profile().await.unwrap_err() {
        ContribError::AuthenticationFailed { message } => {
            assert_eq!(message, "account suspended");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_rejected_refresh_during_request_expires_session() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::new(WALLET_A, "at1", "rt1").unwrap();
    let client = authorized_for(&server, Some(&session));

    let err = client.get_profile().await.unwrap_err();
    assert!(matches!(err, ContribError::SessionExpired));
    assert!(client.authenticator().session().is_none());

    let err = client.get_profile().await.unwrap_err();
    assert!(matches!(err, ContribError::NoSession));
}

#[tokio::test]
async fn test_no_session_skips_network() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body()))
        .expect(0)
        .mount(&server)
        .await;

    let client = authorized_for(&server, None);
    let err = client.get_profile().await.unwrap_err();
    assert!(matches!(err, ContribError::NoSession));
    assert!(err.is_auth_error());
}

#[tokio::test]
async fn test_expired_access_token_refreshed_before_request() {
    let server = setup_mock_server().await;
    let expired = mock_jwt_token(Utc::now().timestamp() - 60);
    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .and(header("authorization", format!("Bearer {expired}").as_str()))
        .respond_with(ResponseTemplate::new(401))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .and(header("authorization", "Bearer at2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body()))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, Duration::ZERO, 1).await;

    let session = Session::new(WALLET_A, expired, "rt1").unwrap();
    assert!(session.expires_at.is_some());
    let client = authorized_for(&server, Some(&session));

    assert_ok!(client.get_profile().await);
    assert_eq!(
        client.authenticator().session().unwrap().access_token,
        "at2"
    );
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/user/dashboard"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": "database unavailable",
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, Duration::ZERO, 0).await;

    let session = Session::new(WALLET_A, "at1", "rt1").unwrap();
    let client = authorized_for(&server, Some(&session));

    match client.get_dashboard().await.unwrap_err() {
        ContribError::Api { code, message } => {
            assert_eq!(code, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(client.authenticator().session().is_some());
}
