//! Web front end: chat page, optional form login, and the chat endpoints.
//!
//! Sessions live in memory. A session is an opaque random cookie token whose
//! only meaning is "this browser logged in". Tokens expire, the store is
//! capped, and restarting the server logs everyone out.

use anyhow::Context;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
        HeaderMap, HeaderName, StatusCode,
    },
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use futures::StreamExt;
use modus_core::{
    config::WebConfig,
    context::{build_prompt, Turn},
    mode::ModeSelector,
};
use modus_providers::Dispatcher;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

const SESSION_COOKIE: &str = "modus_session";

/// Logged-in browsers, keyed by cookie token.
#[derive(Debug)]
struct Sessions {
    ttl: Duration,
    capacity: usize,
    issued: HashMap<String, Instant>,
}

impl Sessions {
    fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            issued: HashMap::new(),
        }
    }

    /// Start a session. Expired tokens are pruned first; at capacity the
    /// oldest token is evicted.
    fn issue(&mut self) -> String {
        let now = Instant::now();
        let ttl = self.ttl;
        self.issued.retain(|_, at| now.duration_since(*at) < ttl);

        if self.issued.len() >= self.capacity {
            let oldest = self
                .issued
                .iter()
                .min_by_key(|(_, at)| **at)
                .map(|(token, _)| token.clone());
            if let Some(token) = oldest {
                self.issued.remove(&token);
            }
        }

        let token = Uuid::new_v4().to_string();
        self.issued.insert(token.clone(), now);
        token
    }

    fn is_valid(&self, token: &str) -> bool {
        self.issued
            .get(token)
            .is_some_and(|at| at.elapsed() < self.ttl)
    }

    fn revoke(&mut self, token: &str) {
        self.issued.remove(token);
    }
}

/// Shared state for web handlers.
#[derive(Clone)]
pub struct ApiState {
    dispatcher: Dispatcher,
    web: Arc<WebConfig>,
    sessions: Arc<RwLock<Sessions>>,
}

impl ApiState {
    pub fn new(dispatcher: Dispatcher, web: WebConfig) -> Self {
        let sessions = Sessions::new(web.session_ttl(), web.max_sessions);
        Self {
            dispatcher,
            web: Arc::new(web),
            sessions: Arc::new(RwLock::new(sessions)),
        }
    }
}

/// Chat request body. Every field is optional on the wire.
#[derive(Debug, Default, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    prompt: Value,
    #[serde(default)]
    mode: Value,
    #[serde(default)]
    history: Value,
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({"ok": false, "error": message.into()})))
}

/// Constant-time string comparison to prevent timing attacks on credentials.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// The session token carried in the request cookies, if any.
fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            pair.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .map(str::to_string)
        })
        .filter(|t| !t.is_empty())
}

async fn is_authenticated(state: &ApiState, headers: &HeaderMap) -> bool {
    if !state.web.auth_enabled {
        return true;
    }
    match session_token(headers) {
        Some(token) => state.sessions.read().await.is_valid(&token),
        None => false,
    }
}

/// Text of a loosely typed JSON field. Missing and null read as empty.
fn field_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Conversation turns from a request's `history`. Anything other than an
/// array is ignored, as are entries that are not turn objects.
fn history_turns(history: &Value) -> Vec<Turn> {
    match history {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| serde_json::from_value::<Turn>(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// Validate a chat request. Returns the folded prompt and the mode token.
///
/// Checks run in a fixed order: session, prompt, mode, backend readiness.
async fn prepare_chat(
    state: &ApiState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(String, String), ApiError> {
    if !is_authenticated(state, headers).await {
        return Err(api_error(StatusCode::UNAUTHORIZED, "Authentication required."));
    }

    // Unparseable bodies read as an empty request.
    let request: ChatRequest = serde_json::from_slice(body).unwrap_or_default();

    let prompt = field_text(&request.prompt).trim().to_string();
    if prompt.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Prompt is required."));
    }

    let mut mode = field_text(&request.mode).trim().to_lowercase();
    if mode.is_empty() {
        mode = "auto".to_string();
    }
    if let Err(e) = ModeSelector::parse(&mode) {
        return Err(api_error(StatusCode::BAD_REQUEST, e.to_string()));
    }

    let ready = state.dispatcher.check_ready().await;
    if !ready.ok {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Startup check failed: {}", ready.message),
        ));
    }

    let history = history_turns(&request.history);
    Ok((build_prompt(&prompt, &history), mode))
}

/// `GET /`: the chat page.
async fn index(headers: HeaderMap, State(state): State<ApiState>) -> Response {
    if !is_authenticated(&state, &headers).await {
        return Redirect::to("/login").into_response();
    }
    let ready = state.dispatcher.check_ready().await;
    Html(crate::pages::index(&ready, state.web.auth_enabled)).into_response()
}

/// `GET /login`
async fn login_page(State(state): State<ApiState>) -> Response {
    if !state.web.auth_enabled {
        return Redirect::to("/").into_response();
    }
    Html(crate::pages::login("")).into_response()
}

/// `POST /login`
async fn login_submit(State(state): State<ApiState>, Form(form): Form<LoginForm>) -> Response {
    if !state.web.auth_enabled {
        return Redirect::to("/").into_response();
    }

    let user_ok = constant_time_eq(form.username.trim(), &state.web.username);
    let pass_ok = constant_time_eq(form.password.trim(), &state.web.password);
    if !(user_ok & pass_ok) {
        info!("web: rejected login attempt");
        return Html(crate::pages::login("Invalid username or password.")).into_response();
    }

    let token = state.sessions.write().await.issue();
    let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    ([(SET_COOKIE, cookie)], Redirect::to("/")).into_response()
}

/// `GET /logout`
async fn logout(headers: HeaderMap, State(state): State<ApiState>) -> Response {
    if let Some(token) = session_token(&headers) {
        state.sessions.write().await.revoke(&token);
    }
    let target = if state.web.auth_enabled { "/login" } else { "/" };
    let cookie = format!("{SESSION_COOKIE}=; Path=/; Max-Age=0");
    ([(SET_COOKIE, cookie)], Redirect::to(target)).into_response()
}

/// `POST /api/chat`: one complete answer as JSON.
async fn chat(
    headers: HeaderMap,
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let (prompt, mode) = prepare_chat(&state, &headers, &body).await?;

    match state.dispatcher.generate(&prompt, &mode).await {
        Ok(g) => Ok(Json(json!({
            "ok": true,
            "mode_used": g.mode.as_str(),
            "response": g.text,
        }))),
        Err(e) => {
            error!("web: generation failed: {e}");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// `POST /api/chat-stream`: fragments as plain text, mode in `X-Mode-Used`.
async fn chat_stream(
    headers: HeaderMap,
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let (prompt, mode) = prepare_chat(&state, &headers, &body).await?;

    let generation = state
        .dispatcher
        .generate_stream(&prompt, &mode)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let mode_used = generation.mode.as_str();
    let body = Body::from_stream(generation.into_text().map(Ok::<_, Infallible>));

    Ok((
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8"),
            (HeaderName::from_static("x-mode-used"), mode_used),
        ],
        body,
    )
        .into_response())
}

/// Build the axum router with shared state.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", get(logout))
        .route("/api/chat", post(chat))
        .route("/api/chat-stream", post(chat_stream))
        .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024)) // 1 MB max request body
        .with_state(state)
}

/// Serve the web front end until the process is stopped.
pub async fn serve(dispatcher: Dispatcher, web: WebConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", web.host, web.port);
    let auth_enabled = web.auth_enabled;
    let app = build_router(ApiState::new(dispatcher, web));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind web server to {addr}"))?;

    info!("web server listening on {addr} (auth_enabled={auth_enabled})");
    println!("Serving on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
