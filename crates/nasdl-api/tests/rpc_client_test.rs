#![allow(clippy::unwrap_used)]
// Integration tests for `RpcClient` using wiremock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

use nasdl_api::{ConnectionFailure, Error, RpcClient, RpcOutcome, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RpcClient) {
    let server = MockServer::start().await;
    let client = RpcClient::new(&TransportConfig::default()).unwrap();
    (server, client)
}

fn rpc(service: &str, rpc_method: &str) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path("/rpc.php"))
        .and(body_partial_json(json!({ "service": service, "method": rpc_method })))
}

// ── Envelope decoding ───────────────────────────────────────────────

#[tokio::test]
async fn test_list_tasks_success() {
    let (server, client) = setup().await;

    rpc("Downloader", "getDownloadList")
        .and(body_partial_json(json!({ "params": { "start": 0, "limit": -1 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {
                "total": 1,
                "data": [{
                    "uuid": "6c1f-77aa",
                    "filename": "debian.iso",
                    "url": "https://cdimage.debian.org/debian.iso",
                    "dltype": "aria2",
                    "downloading": true,
                    "filesize": 661_651_456_u64,
                    "sharedfolderref": "b2f0-11aa"
                }]
            },
            "error": null
        })))
        .mount(&server)
        .await;

    let outcome = client.list_tasks(&server.uri(), None).await.unwrap();

    match outcome {
        RpcOutcome::Success { data, meta } => {
            assert_eq!(data.total, 1);
            assert_eq!(data.data[0].filename, "debian.iso");
            assert!(data.data[0].downloading);
            assert_eq!(meta.service, "Downloader");
            assert_eq!(meta.method, "getDownloadList");
        }
        other => panic!("expected success, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_error_envelope_is_failure_with_meta() {
    let (server, client) = setup().await;

    rpc("Downloader", "getDownloadList")
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "response": null,
            "error": { "code": 5001, "message": "Session not authenticated." }
        })))
        .mount(&server)
        .await;

    let outcome = client.list_tasks(&server.uri(), None).await.unwrap();

    match outcome {
        RpcOutcome::Failure {
            code,
            message,
            meta,
        } => {
            assert_eq!(code, 5001);
            assert_eq!(message.as_deref(), Some("Session not authenticated."));
            assert_eq!(meta.service, "Downloader");
        }
        other => panic!("expected Failure, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_bare_server_error_is_failure() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let outcome = client.list_shared_folders(&server.uri(), None).await.unwrap();

    assert!(
        matches!(outcome, RpcOutcome::Failure { code: 503, .. }),
        "expected Failure 503, got: {outcome:?}"
    );
}

// ── Transport faults ────────────────────────────────────────────────

#[tokio::test]
async fn test_http_400_classifies_as_wrong_protocol() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string("The plain HTTP request was sent to HTTPS port"),
        )
        .mount(&server)
        .await;

    let err = client.list_tasks(&server.uri(), None).await.unwrap_err();
    assert!(matches!(err, Error::BadResponse { status: 400, .. }));

    let failure = ConnectionFailure::from_error(err);
    assert!(
        matches!(failure, ConnectionFailure::ProbableWrongProtocol { .. }),
        "expected ProbableWrongProtocol, got: {failure:?}"
    );
}

#[tokio::test]
async fn test_deadline_classifies_as_timeout() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": [], "error": null }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let err = client
        .list_shared_folders(&server.uri(), Some(Duration::from_millis(50)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout_ms: 50 }), "got: {err:?}");

    let failure = ConnectionFailure::from_error(err);
    assert!(matches!(failure, ConnectionFailure::Timeout { .. }));
}

#[tokio::test]
async fn test_refused_connection_classifies_as_wrong_host() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = RpcClient::new(&TransportConfig::default()).unwrap();
    let err = client
        .list_tasks(&format!("http://{addr}"), Some(Duration::from_secs(5)))
        .await
        .unwrap_err();

    let failure = ConnectionFailure::from_error(err);
    assert!(
        matches!(
            failure,
            ConnectionFailure::ProbableWrongHostOrNoConnectionOrCert { .. }
        ),
        "expected ProbableWrongHostOrNoConnectionOrCert, got: {failure:?}"
    );
}

#[tokio::test]
async fn test_non_json_body_classifies_as_unknown() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = client.list_tasks(&server.uri(), None).await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }));
    assert!(matches!(
        ConnectionFailure::from_error(err),
        ConnectionFailure::Unknown { .. }
    ));
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_login_sends_credentials_and_logout_clears_cookies() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rpc.php"))
        .and(body_json(json!({
            "service": "session",
            "method": "login",
            "params": { "username": "admin", "password": "openmediavault" }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "X-OPENMEDIAVAULT-SESSIONID=abc123; Path=/")
                .set_body_json(json!({
                    "response": {
                        "authenticated": true,
                        "username": "admin",
                        "permissions": { "role": "admin" }
                    },
                    "error": null
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    rpc("session", "logout")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": null,
            "error": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let password: secrecy::SecretString = "openmediavault".to_string().into();
    let outcome = client
        .login(&server.uri(), "admin", &password, None)
        .await
        .unwrap();
    assert!(outcome.data().unwrap().authenticated);

    let endpoint = Url::parse(&format!("{}/rpc.php", server.uri())).unwrap();
    assert!(client.cookies().header_for(&endpoint).is_some());

    let logout = client.logout(&server.uri(), None).await.unwrap();
    assert!(logout.is_success());
    assert_eq!(client.cookies().header_for(&endpoint), None);
}

#[tokio::test]
async fn test_logout_clears_cookies_even_on_transport_error() {
    let (server, client) = setup().await;

    let endpoint = Url::parse(&format!("{}/rpc.php", server.uri())).unwrap();
    let header = reqwest::header::HeaderValue::from_static("X-OPENMEDIAVAULT-SESSIONID=abc; Path=/");
    reqwest::cookie::CookieStore::set_cookies(
        client.cookies(),
        &mut std::iter::once(&header),
        &endpoint,
    );

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    assert!(client.logout(&server.uri(), None).await.is_err());
    assert_eq!(client.cookies().header_for(&endpoint), None);
}
