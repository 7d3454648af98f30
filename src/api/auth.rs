//! Registration, login and the current session

use super::{AppState, ClientMeta, CurrentUser, Json};
use crate::{
    auth::{self, Session},
    entities::UserModel,
    errors::Result,
};
use axum::extract::State;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<Session>> {
    let session = auth::register(
        &state.db,
        &state.config,
        &body.email,
        &body.password,
        body.name.as_deref(),
        &meta,
    )
    .await?;
    Ok(Json(session))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Session>> {
    let session = auth::login(&state.db, &state.config, &body.email, &body.password, &meta).await?;
    Ok(Json(session))
}

/// GET /api/auth/me
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserModel> {
    Json(user)
}
