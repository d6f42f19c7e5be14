use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{dto::MessageResponse, extractors::CurrentUser},
    error::AppResult,
    pagination::PageQuery,
    posts::{
        dto::{PostForm, UserPostsResponse},
        services,
    },
    state::AppState,
};

pub fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/home", get(home))
        .route("/user/:username", get(user_posts))
        .route("/home/user/:username", get(user_posts))
        .route("/post/new", post(new_post))
        .route("/post/:id", get(show_post))
        .route("/post/:id/update", post(update_post))
        .route("/post/:id/delete", post(delete_post))
}

#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>, Query(q): Query<PageQuery>) -> AppResult<Response> {
    let page = services::home_page(&state, q.page).await?;
    Ok(Json(services::view_page(&state, page).await?).into_response())
}

#[instrument(skip(state))]
pub async fn user_posts(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(q): Query<PageQuery>,
) -> AppResult<Response> {
    let (user, page) = services::user_page(&state, &username, q.page).await?;
    let body = UserPostsResponse {
        user: services::author_view(&state, &user).await?,
        posts: services::view_page(&state, page).await?,
    };
    Ok(Json(body).into_response())
}

#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn new_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(form): Json<PostForm>,
) -> AppResult<Response> {
    let post = services::create_post(&state, &user, form).await?;
    let view = services::view_one(&state, post).await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

#[instrument(skip(state))]
pub async fn show_post(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Response> {
    let post = services::get_post(&state, id).await?;
    Ok(Json(services::view_one(&state, post).await?).into_response())
}

#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(form): Json<PostForm>,
) -> AppResult<Response> {
    let post = services::update_post(&state, &user, id, form).await?;
    Ok(Json(services::view_one(&state, post).await?).into_response())
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    services::delete_post(&state, &user, id).await?;
    Ok(Json(MessageResponse::new("Your post has been deleted!")).into_response())
}
