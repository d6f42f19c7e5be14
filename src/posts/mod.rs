use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod memory;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use memory::MemoryPostStore;
pub use repo::{PgPostStore, PostStore};
pub use repo_types::Post;

pub fn router() -> Router<AppState> {
    handlers::post_routes()
}
