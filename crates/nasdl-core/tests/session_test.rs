#![allow(clippy::unwrap_used)]
// Integration tests for `SessionManager` using wiremock.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header_exists, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

use nasdl_api::{
    ConnectionFailure, MissingField, RpcOutcome, SessionName, TransportConfig,
};
use nasdl_core::{
    ConnectionSettings, LogoutOutcome, NasClient, RequestOptions, SettingsUpdate,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn settings_for(server: &MockServer) -> ConnectionSettings {
    ConnectionSettings {
        base_url: Some(server.uri()),
        username: Some("admin".into()),
        password: Some(SecretString::from("openmediavault".to_owned())),
        session: Some(SessionName::DownloaderPlugin),
    }
}

async fn setup() -> (MockServer, NasClient) {
    let server = MockServer::start().await;
    let client = NasClient::new(&TransportConfig::default(), settings_for(&server)).unwrap();
    (server, client)
}

fn rpc(service: &str, rpc_method: &str) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path("/rpc.php"))
        .and(body_partial_json(json!({ "service": service, "method": rpc_method })))
}

fn login_ok(authenticated: bool) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "response": {
            "authenticated": authenticated,
            "username": "admin",
            "permissions": { "role": "admin" }
        },
        "error": null
    }))
}

fn empty_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "response": null, "error": null }))
}

/// Number of requests the server has seen for `service.method`.
async fn count_calls(server: &MockServer, service: &str, rpc_method: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|req| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap_or_default();
            body["service"] == service && body["method"] == rpc_method
        })
        .count()
}

// ── Validation ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_password_short_circuits_login() {
    let (server, client) = setup().await;
    client.update_settings(SettingsUpdate::new().clear_password());

    let outcome = client.login(RequestOptions::default()).await;

    assert!(
        matches!(
            outcome,
            RpcOutcome::ConnectionFailure(ConnectionFailure::MissingConfig {
                which: MissingField::Password
            })
        ),
        "expected MissingConfig(password), got: {outcome:?}"
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_base_url_and_password_is_other() {
    let (_server, client) = setup().await;
    client.update_settings(SettingsUpdate::new().clear_base_url().clear_password());

    match client.session().validate() {
        Err(ConnectionFailure::MissingConfig { which }) => assert_eq!(which, MissingField::Other),
        other => panic!("expected MissingConfig(other), got: {other:?}"),
    }
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_logins_share_one_request() {
    let (server, client) = setup().await;

    rpc("session", "login")
        .respond_with(login_ok(true).set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&server)
        .await;

    let logins = (0..8).map(|_| client.login(RequestOptions::default()));
    let outcomes = futures_util::future::join_all(logins).await;

    assert!(outcomes.iter().all(|o| o.data().unwrap().authenticated));
    assert!(client.session().has_session());
}

#[tokio::test]
async fn test_login_transport_error_becomes_connection_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = NasClient::new(
        &TransportConfig::default(),
        ConnectionSettings {
            base_url: Some(format!("http://{addr}")),
            username: Some("admin".into()),
            password: Some(SecretString::from("openmediavault".to_owned())),
            session: Some(SessionName::DownloaderPlugin),
        },
    )
    .unwrap();

    let outcome = client.login(RequestOptions::default()).await;
    assert!(
        matches!(
            outcome,
            RpcOutcome::ConnectionFailure(
                ConnectionFailure::ProbableWrongHostOrNoConnectionOrCert { .. }
            )
        ),
        "got: {outcome:?}"
    );
}

// ── Logout ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_logout_without_login_is_not_logged_in() {
    let (server, client) = setup().await;

    let outcome = client.logout(RequestOptions::default()).await;

    assert!(matches!(outcome, LogoutOutcome::NotLoggedIn));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_second_logout_is_not_logged_in() {
    let (server, client) = setup().await;

    rpc("session", "login")
        .respond_with(login_ok(true))
        .expect(1)
        .mount(&server)
        .await;
    rpc("session", "logout")
        .respond_with(empty_ok())
        .expect(1)
        .mount(&server)
        .await;

    client.login(RequestOptions::default()).await;

    let first = client.logout(RequestOptions::default()).await;
    assert!(
        matches!(first, LogoutOutcome::Completed(ref o) if o.is_success()),
        "got: {first:?}"
    );

    let second = client.logout(RequestOptions::default()).await;
    assert!(matches!(second, LogoutOutcome::NotLoggedIn));
}

#[tokio::test]
async fn test_logout_skips_network_when_never_authenticated() {
    let (server, client) = setup().await;

    rpc("session", "login")
        .respond_with(login_ok(false))
        .mount(&server)
        .await;
    rpc("session", "logout")
        .respond_with(empty_ok())
        .expect(0)
        .mount(&server)
        .await;

    client.login(RequestOptions::default()).await;
    let outcome = client.logout(RequestOptions::default()).await;

    assert!(matches!(outcome, LogoutOutcome::Completed(_)));
    assert!(!client.session().has_session());
}

#[tokio::test]
async fn test_logout_propagates_failed_login() {
    let (server, client) = setup().await;

    rpc("session", "login")
        .respond_with(ResponseTemplate::new(400).set_body_string("Bad Request"))
        .mount(&server)
        .await;

    client.login(RequestOptions::default()).await;
    let outcome = client.logout(RequestOptions::default()).await;

    assert!(
        matches!(
            outcome,
            LogoutOutcome::Completed(RpcOutcome::ConnectionFailure(
                ConnectionFailure::ProbableWrongProtocol { .. }
            ))
        ),
        "got: {outcome:?}"
    );
    assert_eq!(count_calls(&server, "session", "logout").await, 0);
}

// ── Settings changes ────────────────────────────────────────────────

#[tokio::test]
async fn test_unchanged_settings_do_not_bump_version() {
    let (_server, client) = setup().await;
    let before = client.session().settings_version();

    let changed = client.update_settings(SettingsUpdate::new().username("admin"));

    assert!(!changed);
    assert_eq!(client.session().settings_version(), before);
}

#[tokio::test]
async fn test_settings_change_logs_out_previous_session_in_background() {
    let (server, client) = setup().await;

    rpc("session", "login")
        .respond_with(login_ok(true))
        .mount(&server)
        .await;
    rpc("session", "logout")
        .respond_with(empty_ok())
        .mount(&server)
        .await;

    client.login(RequestOptions::default()).await;
    let before = client.session().settings_version();

    let changed = client.update_settings(
        SettingsUpdate::new().password(SecretString::from("hunter2".to_owned())),
    );

    assert!(changed);
    assert!(client.session().settings_version() > before);
    assert!(!client.session().has_session());

    let mut logouts = 0;
    for _ in 0..50 {
        logouts = count_calls(&server, "session", "logout").await;
        if logouts > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(logouts, 1);
}

#[tokio::test]
async fn test_late_background_logout_keeps_newer_session_cookie() {
    let (server, client) = setup().await;

    rpc("session", "login")
        .respond_with(
            login_ok(true).insert_header("set-cookie", "X-OPENMEDIAVAULT-SESSIONID=abc123; Path=/"),
        )
        .mount(&server)
        .await;
    rpc("session", "logout")
        .respond_with(empty_ok().set_delay(Duration::from_millis(150)))
        .mount(&server)
        .await;
    rpc("Downloader", "getDownloadList")
        .and(header_exists("cookie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "total": 0, "data": [] },
            "error": null
        })))
        .mount(&server)
        .await;
    rpc("Downloader", "getDownloadList")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": null,
            "error": { "code": 5001, "message": "Session not authenticated." }
        })))
        .mount(&server)
        .await;

    assert!(client.list_tasks(RequestOptions::default()).await.is_success());
    client.update_settings(
        SettingsUpdate::new().password(SecretString::from("hunter2".to_owned())),
    );
    assert!(client.list_tasks(RequestOptions::default()).await.is_success());

    // Let the delayed logout of the first session come back.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(count_calls(&server, "session", "logout").await, 1);

    assert!(client.list_tasks(RequestOptions::default()).await.is_success());

    assert_eq!(count_calls(&server, "session", "login").await, 2);
    let without_cookie = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|req| !req.headers.contains_key("cookie"))
        .filter(|req| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap_or_default();
            body["method"] == "getDownloadList"
        })
        .count();
    assert_eq!(without_cookie, 0);
}
