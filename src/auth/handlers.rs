use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, instrument, warn};

use super::{
    claims::Identity,
    dto::{AuthResponse, Credentials},
    repo_types::PublicUser,
    services,
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

fn issue_token(state: &AppState, user: &PublicUser) -> AppResult<String> {
    let identity = Identity {
        id: user.id,
        email: user.email.clone(),
    };
    state
        .jwt
        .issue(&identity)
        .map_err(|e| AppError::Internal(e.into()))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let user =
        services::create_account(state.users.as_ref(), &payload.email, &payload.password).await?;
    let token = issue_token(&state, &user)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: "User created successfully",
            user,
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> AppResult<Json<AuthResponse>> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Email and password are required".into(),
        ));
    }

    let Some(user) =
        services::verify_credentials(state.users.as_ref(), &payload.email, &payload.password)
            .await?
    else {
        warn!("login rejected");
        return Err(AppError::InvalidCredentials);
    };

    let token = issue_token(&state, &user)?;
    info!(user_id = user.id, "user logged in");
    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful",
        user,
        token,
    }))
}
