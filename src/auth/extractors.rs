use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::repo_types::Identity;
use super::services::{authenticate, require_admin};
use crate::error::AppError;
use crate::state::AppState;

/// Any caller holding a valid bearer token for an existing user.
pub struct CurrentUser(pub Identity);

/// A [`CurrentUser`] whose admin flag is set.
pub struct AdminUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        authenticate(state, header).await.map(CurrentUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        require_admin(&identity)?;
        Ok(AdminUser(identity))
    }
}
