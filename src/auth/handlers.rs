use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, MessageResponse, RegisterRequest, UpdatePasswordRequest,
            UpdateProfileRequest,
        },
        extractors::{AdminUser, CurrentUser},
        repo_types::{Identity, User},
        services,
    },
    error::AppError,
    extract::{AppJson, AppPath},
    state::AppState,
    store::SearchQuery,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register).get(list_users))
        .route("/users/auth", post(login))
        .route("/users/logout", post(logout))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/users/profile", get(get_profile).put(update_profile))
        .route("/users/password", put(update_password))
        .route("/users/:id", get(get_user))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let (token, user) = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (token, user) = services::login(&state, &payload.email, &payload.password).await?;
    Ok(Json(AuthResponse { token, user }))
}

/// Tokens are stateless; the client discards its copy.
pub async fn logout() -> Json<MessageResponse> {
    info!("logout acknowledged");
    Json(MessageResponse::new("Logged out successfully"))
}

#[instrument(skip(identity), fields(user_id = %identity.id))]
pub async fn get_profile(CurrentUser(identity): CurrentUser) -> Json<Identity> {
    Json(identity)
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<Identity>, AppError> {
    let updated = services::update_profile(&state, &identity, payload).await?;
    Ok(Json(updated))
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id))]
pub async fn update_password(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppJson(payload): AppJson<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    services::update_password(&state, &identity, payload).await?;
    Ok(Json(MessageResponse::new("Password successfully updated")))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let keyword = q.keyword();
    let users = services::list_users(&state, keyword.as_deref()).await?;
    Ok(Json(users))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn get_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<User>, AppError> {
    Ok(Json(services::get_user(&state, id).await?))
}
