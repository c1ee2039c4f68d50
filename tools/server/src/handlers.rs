//! Request handlers.
//!
//! Handlers only translate between JSON and [`Vault`] calls; all security
//! decisions are made in the vault.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;
use passweb_common::{MasterPassword, SessionToken};
use passweb_vault::{Entry, NewEntry};

/// Header carrying the session token.
pub const SESSION_HEADER: &str = "X-Session-ID";

#[derive(Deserialize)]
pub struct PasswordRequest {
    password: MasterPassword,
}

#[derive(Deserialize)]
pub struct CreateEntryRequest {
    password: MasterPassword,
    #[serde(default)]
    entry: NewEntry,
}

#[derive(Serialize)]
struct LoginResponse {
    success: bool,
    session_id: SessionToken,
    /// Session lifetime in seconds.
    expire: u64,
}

#[derive(Serialize)]
struct EntriesResponse {
    entries: Vec<Entry>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// A session token that was checked against the vault.
pub struct AuthSession(pub SessionToken);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_header(&parts.headers).ok_or(ApiError::MissingSession)?;
        state.vault.authorize(&token).await?;
        Ok(Self(token))
    }
}

fn session_header(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(SessionToken::from)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(inner)| inner).map_err(|e| {
        debug!(error = %e, "Rejected request body");
        ApiError::BadRequest
    })
}

pub async fn setup(
    State(state): State<AppState>,
    payload: Result<Json<PasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body(payload)?;
    state.vault.setup(&request.password).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<PasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body(payload)?;
    let grant = state.vault.login(&request.password).await?;

    Ok(Json(LoginResponse {
        success: true,
        session_id: grant.token,
        expire: grant.expires_in.as_secs(),
    }))
}

/// Ends the session named in the header. Unknown tokens are accepted.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = session_header(&headers).ok_or(ApiError::MissingSession)?;
    state.vault.logout(&token).await;
    Ok(Json(json!({ "success": true })))
}

pub async fn list_entries(
    State(state): State<AppState>,
    AuthSession(token): AuthSession,
    payload: Result<Json<PasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body(payload)?;
    let entries = state.vault.list_entries(&token, &request.password).await?;
    Ok(Json(EntriesResponse { entries }))
}

pub async fn create_entry(
    State(state): State<AppState>,
    AuthSession(token): AuthSession,
    payload: Result<Json<CreateEntryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body(payload)?;
    let entry = state
        .vault
        .add_entry(&token, &request.password, request.entry)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "id": entry.id })),
    ))
}

pub async fn health() -> impl IntoResponse {
    (
        [
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(HealthResponse {
            status: "up",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
