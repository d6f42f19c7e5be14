use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use super::session::credential_from_headers;
use crate::{error::AppError, state::AppState, users::User};

/// Logged-in user; rejects anonymous requests with 401.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = state
            .sessions
            .current_session(credential_from_headers(&parts.headers).as_deref())
            .ok_or(AppError::Unauthorized)?;

        // a valid session for a user that no longer resolves is anonymous
        let user = state
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok(CurrentUser(user))
    }
}

/// Session owner if there is one; never rejects.
pub struct MaybeUser(pub Option<Uuid>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            state
                .sessions
                .current_session(credential_from_headers(&parts.headers).as_deref()),
        ))
    }
}
