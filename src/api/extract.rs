//! Request extractors: typed inputs, client metadata and the authenticated
//! caller
//!
//! Sessions are bearer JWTs. The user row is reloaded on every request, so
//! role changes and deletions take effect immediately.
//!
//! [`Json`], [`Query`] and [`Path`] wrap the axum extractors so a malformed
//! body, query string or path segment is reported as `VALIDATION_ERROR`.

use super::AppState;
use crate::{
    auth::token,
    core::{RequestMeta, security_log, user},
    entities::UserModel,
    errors::{Error, Result},
};
use axum::{
    extract::{FromRequest, FromRequestParts},
    http::{header, request::Parts},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;

/// JSON request body, also usable as a JSON response
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Query string parameters
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct Query<T>(pub T);

/// Path parameters
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct Path<T>(pub T);

const LOGIN_REQUIRED: &str = "User must be logged in.";
const ADMIN_REQUIRED: &str = "User must be logged in and be an admin.";

/// Client IP (first `x-forwarded-for` entry) and user agent
#[derive(Debug, Clone)]
pub struct ClientMeta(pub RequestMeta);

fn request_meta(parts: &Parts) -> RequestMeta {
    let header_str = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    RequestMeta {
        ip: header_str("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(|ip| ip.trim().to_string()),
        user_agent: header_str(header::USER_AGENT.as_str()).map(str::to_string),
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ClientMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Infallible> {
        Ok(Self(request_meta(parts)))
    }
}

fn bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolves the session user; `Ok(None)` when no valid session is present.
async fn session_user(parts: &Parts, state: &AppState) -> Result<Option<UserModel>> {
    let Some(token) = bearer(parts) else {
        return Ok(None);
    };
    let claims = match token::verify_token(token, &state.config.secrets.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Session token rejected: {e}");
            return Ok(None);
        }
    };
    match user::get_user(&state.db, &claims.sub).await {
        Ok(found) => Ok(Some(found)),
        Err(Error::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// The authenticated caller. Rejects with `UNAUTHORIZED` without a valid
/// session.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserModel);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        session_user(parts, state)
            .await?
            .map(Self)
            .ok_or_else(|| Error::unauthorized(LOGIN_REQUIRED))
    }
}

/// The caller when a valid session is present
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<UserModel>);

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        Ok(Self(session_user(parts, state).await?))
    }
}

/// An authenticated administrator. Any other caller is rejected with
/// `UNAUTHORIZED` and an `UNAUTHORIZED_ACCESS` event is recorded.
#[derive(Debug, Clone)]
pub struct AdminUser(pub UserModel);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let caller = session_user(parts, state).await?;
        if let Some(admin) = caller.as_ref().filter(|u| u.is_admin()) {
            return Ok(Self(admin.clone()));
        }

        let caller_id = caller.map_or_else(|| security_log::ANONYMOUS.to_string(), |u| u.id);
        tracing::warn!(user_id = %caller_id, path = %parts.uri.path(), "Unauthorized admin access");
        security_log::record(
            &state.db,
            security_log::events::UNAUTHORIZED_ACCESS,
            &caller_id,
            json!({ "path": parts.uri.path(), "method": parts.method.as_str() }),
            &request_meta(parts),
        )
        .await;
        Err(Error::unauthorized(ADMIN_REQUIRED))
    }
}
