mod common;

use axum::http::StatusCode;
use client_lib::{
    adapters::FileCredentialStore,
    config::Config,
    state::ClientState,
};
use common::{unreachable_url, StubBackend};
use serde_json::json;
use tempfile::TempDir;
use trustme_core::{
    AnalysisRequest, BearerToken, CredentialStore, Language, SessionState, SubmitOutcome, Verdict,
    PLACEHOLDER_COMMENT,
};

fn client_for(backend_url: &str, dir: &TempDir) -> ClientState {
    let credentials = dir.path().join("credentials.json");
    let vars = [
        ("TRUSTME_BACKEND_URL", backend_url.to_string()),
        ("TRUSTME_SETTLE_DELAY_MS", "20".to_string()),
        ("TRUSTME_REVEAL_DELAY_MS", "0".to_string()),
        ("TRUSTME_CREDENTIALS_PATH", credentials.display().to_string()),
    ];
    let config = Config::from_lookup(None, |key| {
        vars.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
    })
    .unwrap();
    ClientState::build(config, None).unwrap()
}

fn request() -> AnalysisRequest {
    AnalysisRequest::builder("ACME Corp")
        .context("supplier due diligence")
        .language(Language::Italian)
        .build()
        .unwrap()
}

#[tokio::test]
async fn scored_response_is_posted_and_normalized() {
    let backend = StubBackend::json(
        StatusCode::OK,
        json!({"trust_score": 40, "details": {"comment": "ok"}}),
    )
    .await;
    let dir = TempDir::new().unwrap();
    let client = client_for(&backend.base_url, &dir);

    let outcome = client.session.submit(request()).await;

    assert_eq!(
        outcome,
        SubmitOutcome::Completed(SessionState::Succeeded(Verdict::Scored {
            score: 40.0,
            comment: "ok".to_string(),
            details: None,
        }))
    );

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].body,
        json!({"subject": "ACME Corp", "context": "supplier due diligence", "language": "it-IT"})
    );
    assert_eq!(requests[0].authorization, None);
    assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));
    assert!(client.session.snapshot().revealed);
}

#[tokio::test]
async fn stored_token_is_sent_as_bearer_header() {
    let backend = StubBackend::json(StatusCode::OK, json!({"score": 72})).await;
    let dir = TempDir::new().unwrap();
    FileCredentialStore::new(dir.path().join("credentials.json"))
        .store(BearerToken::new("abc123"))
        .await
        .unwrap();
    let client = client_for(&backend.base_url, &dir);

    let outcome = client.session.submit(request()).await;

    assert_eq!(
        outcome,
        SubmitOutcome::Completed(SessionState::Succeeded(Verdict::Scored {
            score: 72.0,
            comment: PLACEHOLDER_COMMENT.to_string(),
            details: None,
        }))
    );
    assert_eq!(
        backend.requests()[0].authorization.as_deref(),
        Some("Bearer abc123")
    );
}

#[tokio::test]
async fn server_error_fails_with_status_code() {
    let backend = StubBackend::spawn(StatusCode::INTERNAL_SERVER_ERROR, r#"{"detail":"boom"}"#).await;
    let dir = TempDir::new().unwrap();
    let client = client_for(&backend.base_url, &dir);

    let outcome = client.session.submit(request()).await;

    let SubmitOutcome::Completed(SessionState::Failed(message)) = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert!(message.contains("500"));
    assert!(!message.contains("boom"));
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let dir = TempDir::new().unwrap();
    let client = client_for(&unreachable_url().await, &dir);

    let outcome = client.session.submit(request()).await;

    assert!(matches!(
        outcome,
        SubmitOutcome::Completed(SessionState::Failed(message)) if message.starts_with("Network error")
    ));
}

#[tokio::test]
async fn non_json_success_body_is_shown_raw() {
    let backend = StubBackend::spawn(StatusCode::OK, "plain text verdict").await;
    let dir = TempDir::new().unwrap();
    let client = client_for(&backend.base_url, &dir);

    let outcome = client.session.submit(request()).await;

    assert_eq!(
        outcome,
        SubmitOutcome::Completed(SessionState::Succeeded(Verdict::Raw {
            json: "\"plain text verdict\"".to_string(),
        }))
    );
}

#[tokio::test]
async fn health_reports_version() {
    let backend = StubBackend::json(StatusCode::OK, json!({})).await;
    let dir = TempDir::new().unwrap();
    let client = client_for(&backend.base_url, &dir);

    let health = client.backend.health().await.unwrap();

    assert_eq!(health.status, "ok");
    assert_eq!(health.version.as_deref(), Some("1.2.3"));
}
