use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{
            LoginRequest, MessageResponse, NextQuery, RegisterRequest, ResetPasswordRequest,
            ResetRequest,
        },
        extractors::{CurrentUser, MaybeUser},
        services::{self, AccountUpdate},
    },
    error::{AppError, AppResult},
    state::AppState,
};

const MAX_PICTURE_BYTES: usize = 5 * 1024 * 1024;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/reset_password", post(reset_request))
        .route("/reset_password/:token", get(check_reset_token).post(reset_token))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/account", get(get_account).post(update_account))
        .layer(DefaultBodyLimit::max(MAX_PICTURE_BYTES))
}

fn home() -> Response {
    Redirect::to("/home").into_response()
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    MaybeUser(current): MaybeUser,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Response> {
    if current.is_some() {
        return Ok(home());
    }
    let user = services::register(&state, payload).await?;
    let body = services::public_user(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// With a local `?next=` path the client is redirected there once the
/// cookie is set; otherwise the user is returned as JSON.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    MaybeUser(current): MaybeUser,
    Query(query): Query<NextQuery>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Response> {
    if current.is_some() {
        return Ok(home());
    }
    let user = services::authenticate(&state, &payload.email, &payload.password).await?;
    let session = state.sessions.login(&user, payload.remember)?;
    let cookie = state.sessions.cookie(&session).to_string();
    info!(user_id = %user.id, remember = payload.remember, "user logged in");

    if let Some(next) = services::safe_next(query.next.as_deref()) {
        return Ok(([(header::SET_COOKIE, cookie)], Redirect::to(next)).into_response());
    }
    let body = services::public_user(&state, &user).await?;
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, state.sessions.logout().to_string())],
        Json(MessageResponse::new("You have been logged out")),
    )
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Response> {
    let body = services::public_user(&state, &user).await?;
    Ok(Json(body).into_response())
}

/// Multipart fields: `username`, `email`, optional file `picture`.
#[instrument(skip(state, user, mp), fields(user_id = %user.id))]
pub async fn update_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut mp: Multipart,
) -> AppResult<Response> {
    let mut update = AccountUpdate {
        username: user.username.clone(),
        email: user.email.clone(),
        picture: None,
    };
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation(e.body_text()))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("username") => {
                update.username = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(e.body_text()))?;
            }
            Some("email") => {
                update.email = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(e.body_text()))?;
            }
            Some("picture") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(e.body_text()))?;
                // browsers send an empty part when no file was chosen
                if !data.is_empty() {
                    update.picture = Some((data, filename));
                }
            }
            _ => {}
        }
    }

    let updated = services::update_account(&state, &user, update).await?;
    let body = services::public_user(&state, &updated).await?;
    Ok(Json(body).into_response())
}

#[instrument(skip(state, payload))]
pub async fn reset_request(
    State(state): State<AppState>,
    MaybeUser(current): MaybeUser,
    Json(payload): Json<ResetRequest>,
) -> AppResult<Response> {
    if current.is_some() {
        return Ok(home());
    }
    services::request_password_reset(&state, &payload.email).await?;
    Ok(Json(MessageResponse::new(
        "An email has been sent with instructions on how to reset your password.",
    ))
    .into_response())
}

#[instrument(skip_all)]
pub async fn check_reset_token(
    State(state): State<AppState>,
    MaybeUser(current): MaybeUser,
    Path(token): Path<String>,
) -> AppResult<Response> {
    if current.is_some() {
        return Ok(home());
    }
    services::user_for_reset_token(&state, &token).await?;
    Ok(Json(MessageResponse::new("Token is valid")).into_response())
}

#[instrument(skip_all)]
pub async fn reset_token(
    State(state): State<AppState>,
    MaybeUser(current): MaybeUser,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Response> {
    if current.is_some() {
        return Ok(home());
    }
    services::reset_password(&state, &token, &payload.password, &payload.confirm_password).await?;
    Ok(Json(MessageResponse::new(
        "Your password has been reset. You are now able to log in.",
    ))
    .into_response())
}
