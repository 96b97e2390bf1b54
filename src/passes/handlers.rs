use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::CreatePassRequest;
use super::repo_types::{Pass, PassStatus};
use super::services;
use crate::{
    auth::extractors::{AdminUser, CurrentUser},
    error::AppError,
    extract::{AppJson, AppPath},
    state::AppState,
    store::SearchQuery,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/passes", post(create_pass).get(list_passes))
        .route("/passes/mine", get(list_mine))
        .route("/passes/approvedPasses", get(list_approved))
        .route("/passes/rejectedPasses", get(list_rejected))
        .route("/passes/pendingPasses", get(list_pending))
        .route("/passes/admin/userpasses/:id", get(list_user_passes))
        .route("/passes/:id", get(get_pass))
        .route("/passes/:id/approve", put(approve_pass))
        .route("/passes/:id/reject", put(reject_pass))
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id))]
pub async fn create_pass(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppJson(payload): AppJson<CreatePassRequest>,
) -> Result<(StatusCode, HeaderMap, Json<Pass>), AppError> {
    let pass = services::create_pass(&state, &identity, payload).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/passes/{}", pass.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(pass)))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn list_passes(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<Pass>>, AppError> {
    Ok(Json(services::list_all(&state, q.keyword()).await?))
}

#[instrument(skip(state, identity), fields(user_id = %identity.id))]
pub async fn list_mine(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<Pass>>, AppError> {
    Ok(Json(services::list_mine(&state, &identity, q.keyword()).await?))
}

#[instrument(skip(state, _admin))]
pub async fn list_user_passes(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppPath(user_id): AppPath<Uuid>,
) -> Result<Json<Vec<Pass>>, AppError> {
    Ok(Json(services::list_by_user(&state, user_id).await?))
}

async fn by_status(
    state: &AppState,
    status: PassStatus,
    q: SearchQuery,
) -> Result<Json<Vec<Pass>>, AppError> {
    Ok(Json(services::list_by_status(state, status, q.keyword()).await?))
}

#[instrument(skip(state, _admin))]
pub async fn list_approved(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<Pass>>, AppError> {
    by_status(&state, PassStatus::Approved, q).await
}

#[instrument(skip(state, _admin))]
pub async fn list_rejected(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<Pass>>, AppError> {
    by_status(&state, PassStatus::Rejected, q).await
}

#[instrument(skip(state, _admin))]
pub async fn list_pending(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<Pass>>, AppError> {
    by_status(&state, PassStatus::Pending, q).await
}

#[instrument(skip(state, _identity))]
pub async fn get_pass(
    State(state): State<AppState>,
    CurrentUser(_identity): CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Pass>, AppError> {
    Ok(Json(services::get_by_id(&state, id).await?))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn approve_pass(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Pass>, AppError> {
    Ok(Json(services::approve(&state, id).await?))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn reject_pass(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Pass>, AppError> {
    Ok(Json(services::reject(&state, id).await?))
}
