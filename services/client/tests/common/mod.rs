//! Stub servers for the integration tests: a fake `/analyze` backend and a
//! fake device-code identity provider, both bound to an ephemeral port.

#![allow(dead_code)]

use axum::{
    extract::{Form, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub server");
    let addr = listener.local_addr().expect("stub server address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server crashed");
    });
    format!("http://{}", addr)
}

/// A base URL nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind placeholder port");
    let addr = listener.local_addr().expect("placeholder address");
    drop(listener);
    format!("http://{}", addr)
}

//=========================================================================================
// Analysis Backend
//=========================================================================================

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub body: Value,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
}

struct BackendState {
    status: StatusCode,
    body: String,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct StubBackend {
    pub base_url: String,
    state: Arc<BackendState>,
}

impl StubBackend {
    /// Answers every `/analyze` call with `status` and the raw `body`.
    pub async fn spawn(status: StatusCode, body: impl Into<String>) -> Self {
        let state = Arc::new(BackendState {
            status,
            body: body.into(),
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/analyze", post(analyze))
            .route("/health", get(health))
            .with_state(state.clone());
        Self {
            base_url: serve(app).await,
            state,
        }
    }

    pub async fn json(status: StatusCode, body: Value) -> Self {
        Self::spawn(status, body.to_string()).await
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn analyze(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let header_text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.requests.lock().unwrap().push(RecordedRequest {
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
        authorization: header_text(header::AUTHORIZATION),
        content_type: header_text(header::CONTENT_TYPE),
    });
    (
        state.status,
        [(header::CONTENT_TYPE, "application/json")],
        state.body.clone(),
    )
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "version": "1.2.3"}))
}

//=========================================================================================
// Identity Provider
//=========================================================================================

pub const USER_CODE: &str = "ABCD-EFGH";

/// How the stub identity provider behaves.
#[derive(Debug, Clone)]
pub struct IdpOptions {
    /// `authorization_pending` answers before the device grant succeeds.
    pub pending_polls: usize,
    /// Refuse the device grant with `access_denied`.
    pub deny: bool,
    /// Answer refresh grants with a plain-text 503.
    pub refresh_unavailable: bool,
    pub device_expires_in: u64,
    pub device_interval: u64,
}

impl Default for IdpOptions {
    fn default() -> Self {
        Self {
            pending_polls: 0,
            deny: false,
            refresh_unavailable: false,
            device_expires_in: 60,
            device_interval: 5,
        }
    }
}

struct IdpState {
    options: IdpOptions,
    polls: Mutex<usize>,
    token_calls: Mutex<Vec<HashMap<String, String>>>,
    device_calls: Mutex<Vec<HashMap<String, String>>>,
}

pub struct StubIdentityProvider {
    pub issuer: String,
    state: Arc<IdpState>,
}

impl StubIdentityProvider {
    /// Reports `authorization_pending` `pending_polls` times, then grants
    /// (or denies, when `deny` is set).
    pub async fn spawn(pending_polls: usize, deny: bool) -> Self {
        Self::spawn_with(IdpOptions {
            pending_polls,
            deny,
            ..IdpOptions::default()
        })
        .await
    }

    pub async fn spawn_with(options: IdpOptions) -> Self {
        let state = Arc::new(IdpState {
            options,
            polls: Mutex::new(0),
            token_calls: Mutex::new(Vec::new()),
            device_calls: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/oauth/device/code", post(device_code))
            .route("/oauth/token", post(token))
            .with_state(state.clone());
        Self {
            issuer: serve(app).await,
            state,
        }
    }

    pub fn token_calls(&self) -> Vec<HashMap<String, String>> {
        self.state.token_calls.lock().unwrap().clone()
    }

    pub fn device_calls(&self) -> Vec<HashMap<String, String>> {
        self.state.device_calls.lock().unwrap().clone()
    }
}

pub fn id_token(name: &str) -> String {
    encode(
        &Header::default(),
        &json!({"sub": "auth0|42", "name": name}),
        &EncodingKey::from_secret(b"stub"),
    )
    .expect("encode id token")
}

async fn device_code(
    State(state): State<Arc<IdpState>>,
    Form(params): Form<HashMap<String, String>>,
) -> Json<Value> {
    state.device_calls.lock().unwrap().push(params);
    Json(json!({
        "device_code": "device-1",
        "user_code": USER_CODE,
        "verification_uri": "https://idp.example.com/activate",
        "expires_in": state.options.device_expires_in,
        "interval": state.options.device_interval
    }))
}

async fn token(
    State(state): State<Arc<IdpState>>,
    Form(params): Form<HashMap<String, String>>,
) -> axum::response::Response {
    state.token_calls.lock().unwrap().push(params.clone());
    let grant_type = params.get("grant_type").map(String::as_str);

    if grant_type == Some("refresh_token") && state.options.refresh_unavailable {
        return (StatusCode::SERVICE_UNAVAILABLE, "upstream down").into_response();
    }
    token_grant(&state, grant_type, &params).into_response()
}

fn token_grant(
    state: &IdpState,
    grant_type: Option<&str>,
    params: &HashMap<String, String>,
) -> (StatusCode, Json<Value>) {
    match grant_type {
        Some("refresh_token") if params.get("refresh_token").map(String::as_str) == Some("refresh-1") => (
            StatusCode::OK,
            Json(json!({
                "access_token": "access-2",
                "id_token": id_token("Ada Lovelace"),
                "token_type": "Bearer"
            })),
        ),
        Some("refresh_token") => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "unknown refresh token"})),
        ),
        Some("urn:ietf:params:oauth:grant-type:device_code") => {
            if state.options.deny {
                return (
                    StatusCode::FORBIDDEN,
                    Json(json!({"error": "access_denied", "error_description": "User refused"})),
                );
            }
            let mut polls = state.polls.lock().unwrap();
            if *polls < state.options.pending_polls {
                *polls += 1;
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "authorization_pending"})),
                );
            }
            (
                StatusCode::OK,
                Json(json!({
                    "access_token": "access-1",
                    "refresh_token": "refresh-1",
                    "id_token": id_token("Ada Lovelace"),
                    "token_type": "Bearer",
                    "expires_in": 86400
                })),
            )
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "unsupported_grant_type"})),
        ),
    }
}
