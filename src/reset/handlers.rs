use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{NewPasswordRequest, ResetRequest, VerifyCodeRequest, VerifyCodeResponse};
use super::services;
use crate::{
    auth::dto::MessageResponse,
    error::AppError,
    extract::{AppJson, AppPath},
    state::AppState,
};

pub fn reset_routes() -> Router<AppState> {
    Router::new()
        .route("/users/resetpassword", post(request_reset))
        .route("/users/verifycode", post(verify_code))
        .route("/users/updatepassword/:id/:code", post(update_password))
}

#[instrument(skip(state, payload))]
pub async fn request_reset(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResetRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    services::request_reset(&state, &payload.email).await?;
    Ok(Json(MessageResponse::new(
        "A verification code has been sent to your email",
    )))
}

#[instrument(skip(state, payload))]
pub async fn verify_code(
    State(state): State<AppState>,
    AppJson(payload): AppJson<VerifyCodeRequest>,
) -> Result<Json<VerifyCodeResponse>, AppError> {
    let user_id = services::verify_code(&state, &payload.email, &payload.code).await?;
    Ok(Json(VerifyCodeResponse { user_id }))
}

#[instrument(skip(state, code, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    AppPath((user_id, code)): AppPath<(String, String)>,
    AppJson(payload): AppJson<NewPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    // a link with a mangled user id cannot match any code
    let user_id: Uuid = user_id.parse().map_err(|_| AppError::InvalidCode)?;
    services::consume_and_set_password(
        &state,
        user_id,
        &code,
        &payload.password,
        &payload.confirm_password,
    )
    .await?;
    Ok(Json(MessageResponse::new("Password successfully updated")))
}
