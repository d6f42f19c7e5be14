use std::collections::HashMap;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    images::services::profile_image_url,
    pagination::{ensure_in_range, offset_for, Page},
    posts::{
        dto::{AuthorView, PostForm, PostView},
        repo_types::Post,
    },
    state::AppState,
    users::User,
};

fn validate(form: &PostForm) -> AppResult<(String, String)> {
    let title = form.title.trim();
    let len = title.chars().count();
    if len == 0 || len > 100 {
        return Err(AppError::validation("Title must be between 1 and 100 characters long"));
    }
    if form.content.trim().is_empty() {
        return Err(AppError::validation("Content is required"));
    }
    Ok((title.to_string(), form.content.clone()))
}

pub async fn create_post(state: &AppState, author: &User, form: PostForm) -> AppResult<Post> {
    let (title, content) = validate(&form)?;
    let post = state.posts.create_post(author.id, &title, &content).await?;
    info!(post_id = %post.id, user_id = %author.id, "post created");
    Ok(post)
}

pub async fn get_post(state: &AppState, id: Uuid) -> AppResult<Post> {
    state
        .posts
        .find_post(id)
        .await?
        .ok_or(AppError::NotFound("post"))
}

async fn owned_post(state: &AppState, user: &User, id: Uuid) -> AppResult<Post> {
    let post = get_post(state, id).await?;
    if !post.is_authored_by(user.id) {
        warn!(post_id = %id, user_id = %user.id, "not the author");
        return Err(AppError::Forbidden);
    }
    Ok(post)
}

pub async fn update_post(state: &AppState, user: &User, id: Uuid, form: PostForm) -> AppResult<Post> {
    owned_post(state, user, id).await?;
    let (title, content) = validate(&form)?;
    let post = state.posts.update_post(id, &title, &content).await?;
    info!(post_id = %id, "post updated");
    Ok(post)
}

pub async fn delete_post(state: &AppState, user: &User, id: Uuid) -> AppResult<()> {
    owned_post(state, user, id).await?;
    state.posts.delete_post(id).await?;
    info!(post_id = %id, "post deleted");
    Ok(())
}

pub async fn home_page(state: &AppState, page: i64) -> AppResult<Page<Post>> {
    let per_page = state.config.posts_per_page;
    let offset = offset_for(page, per_page)?;
    let (items, total) = state.posts.list_recent(offset, per_page).await?;
    let page = Page::new(items, page as u64, per_page, total);
    ensure_in_range(&page)?;
    Ok(page)
}

pub async fn user_page(state: &AppState, username: &str, page: i64) -> AppResult<(User, Page<Post>)> {
    let user = state
        .users
        .find_by_username(username)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    let per_page = state.config.posts_per_page;
    let offset = offset_for(page, per_page)?;
    let (items, total) = state.posts.list_by_author(user.id, offset, per_page).await?;
    let page = Page::new(items, page as u64, per_page, total);
    ensure_in_range(&page)?;
    Ok((user, page))
}

pub async fn author_view(state: &AppState, user: &User) -> AppResult<AuthorView> {
    Ok(AuthorView {
        id: user.id,
        username: user.username.clone(),
        image_url: profile_image_url(state.storage.as_ref(), &user.image_file).await?,
    })
}

/// Attaches author details, loading each distinct author once.
pub async fn to_views(state: &AppState, posts: Vec<Post>) -> AppResult<Vec<PostView>> {
    let mut authors: HashMap<Uuid, AuthorView> = HashMap::new();
    let mut views = Vec::with_capacity(posts.len());
    for post in posts {
        if !authors.contains_key(&post.user_id) {
            // posts.user_id is a foreign key, so a missing author is a broken row
            let user = state
                .users
                .find_by_id(post.user_id)
                .await?
                .ok_or_else(|| AppError::Internal(format!("post {} has no author", post.id)))?;
            authors.insert(post.user_id, author_view(state, &user).await?);
        }
        let author = authors[&post.user_id].clone();
        views.push(PostView {
            id: post.id,
            title: post.title,
            content: post.content,
            date_posted: post.date_posted,
            author,
        });
    }
    Ok(views)
}

pub async fn view_one(state: &AppState, post: Post) -> AppResult<PostView> {
    to_views(state, vec![post])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("empty post view".into()))
}

pub async fn view_page(state: &AppState, page: Page<Post>) -> AppResult<Page<PostView>> {
    let Page { items, page, per_page, total, .. } = page;
    let views = to_views(state, items).await?;
    Ok(Page::new(views, page, per_page, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{dto::RegisterRequest, services::register};

    async fn member(state: &AppState, name: &str) -> User {
        register(
            state,
            RegisterRequest {
                username: name.into(),
                email: format!("{name}@x.com"),
                password: "pw".into(),
                confirm_password: "pw".into(),
            },
        )
        .await
        .unwrap()
    }

    fn form(title: &str) -> PostForm {
        PostForm {
            title: title.into(),
            content: "hello".into(),
        }
    }

    #[tokio::test]
    async fn only_the_author_may_modify() {
        let state = AppState::fake();
        let alice = member(&state, "alice").await;
        let bob = member(&state, "bob").await;
        let post = create_post(&state, &alice, form("first")).await.unwrap();

        let err = update_post(&state, &bob, post.id, form("hijack")).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        let err = delete_post(&state, &bob, post.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let updated = update_post(&state, &alice, post.id, form("edited")).await.unwrap();
        assert_eq!(updated.title, "edited");
        assert_eq!(updated.date_posted, post.date_posted);

        delete_post(&state, &alice, post.id).await.unwrap();
        let err = get_post(&state, post.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("post")));
    }

    #[tokio::test]
    async fn rejects_empty_title() {
        let state = AppState::fake();
        let alice = member(&state, "alice").await;
        let err = create_post(&state, &alice, form("   ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn pages_three_at_a_time() {
        let state = AppState::fake();
        let alice = member(&state, "alice").await;
        let bob = member(&state, "bob").await;
        for i in 0..4 {
            create_post(&state, &alice, form(&format!("a{i}"))).await.unwrap();
        }
        create_post(&state, &bob, form("b0")).await.unwrap();

        let first = home_page(&state, 1).await.unwrap();
        assert_eq!(first.items.len(), 3);
        assert_eq!(first.pages, 2);
        assert!(first.has_next);

        let (user, page) = user_page(&state, "alice", 2).await.unwrap();
        assert_eq!(user.id, alice.id);
        assert_eq!(page.items.len(), 1);

        assert!(matches!(home_page(&state, 3).await, Err(AppError::NotFound("page"))));
        assert!(matches!(
            user_page(&state, "nobody", 1).await,
            Err(AppError::NotFound("user"))
        ));
    }

    #[tokio::test]
    async fn views_carry_author_details() {
        let state = AppState::fake();
        let alice = member(&state, "alice").await;
        create_post(&state, &alice, form("one")).await.unwrap();
        create_post(&state, &alice, form("two")).await.unwrap();

        let page = home_page(&state, 1).await.unwrap();
        let views = to_views(&state, page.items).await.unwrap();
        assert_eq!(views.len(), 2);
        assert!(views.iter().all(|v| v.author.username == "alice"));
        assert!(views[0].author.image_url.ends_with("profile_pics/default.jpg"));
    }
}
