//! Registration and login.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use emporium_core::UserId;

use crate::error::Result;
use crate::models::User;
use crate::response::ApiResponse;
use crate::routes::ApiJson;
use crate::services::auth::{AuthError, AuthService, IssuedToken, Registration};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user_id: UserId,
    #[serde(flatten)]
    pub token: IssuedToken,
}

/// `POST /users/register`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<Registration>,
) -> Result<ApiResponse<User>> {
    let user = AuthService::new(state.store(), state.tokens())
        .register(form)
        .await?;
    Ok(ApiResponse::created("User registered successfully!", user))
}

/// `POST /users/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<LoginForm>,
) -> Result<ApiResponse<LoginData>> {
    let email = form
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or(AuthError::MissingField("Email"))?;
    let password = form
        .password
        .filter(|p| !p.is_empty())
        .ok_or(AuthError::MissingField("Password"))?;

    let (user, token) = AuthService::new(state.store(), state.tokens())
        .login(&email, &password)
        .await?;
    tracing::info!(user_id = %user.id, "user logged in");
    Ok(ApiResponse::ok(
        "Login successful!",
        LoginData {
            user_id: user.id,
            token,
        },
    ))
}
