//! In-memory post store - used by tests and `AppState::fake`.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{error::StoreError, posts::repo::PostStore, posts::repo_types::Post};

#[derive(Default)]
pub struct MemoryPostStore {
    // insertion order; newest last
    posts: RwLock<Vec<Post>>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn page_of<'a>(
    posts: impl Iterator<Item = &'a Post>,
    offset: u64,
    limit: u64,
) -> (Vec<Post>, u64) {
    let mut matching: Vec<&Post> = posts.collect();
    matching.reverse();
    matching.sort_by(|a, b| b.date_posted.cmp(&a.date_posted));
    let total = matching.len() as u64;
    let items = matching
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .cloned()
        .collect();
    (items, total)
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn create_post(
        &self,
        author: Uuid,
        title: &str,
        content: &str,
    ) -> Result<Post, StoreError> {
        let post = Post {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            date_posted: OffsetDateTime::now_utc(),
            user_id: author,
        };
        self.posts.write().await.push(post.clone());
        Ok(post)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        Ok(self.posts.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn update_post(&self, id: Uuid, title: &str, content: &str) -> Result<Post, StoreError> {
        let mut posts = self.posts.write().await;
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;
        post.title = title.to_string();
        post.content = content.to_string();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), StoreError> {
        let mut posts = self.posts.write().await;
        let before = posts.len();
        posts.retain(|p| p.id != id);
        if posts.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_recent(&self, offset: u64, limit: u64) -> Result<(Vec<Post>, u64), StoreError> {
        let posts = self.posts.read().await;
        Ok(page_of(posts.iter(), offset, limit))
    }

    async fn list_by_author(
        &self,
        author: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Post>, u64), StoreError> {
        let posts = self.posts.read().await;
        Ok(page_of(
            posts.iter().filter(|p| p.user_id == author),
            offset,
            limit,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_newest_first_with_totals() {
        let store = MemoryPostStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        for i in 0..4 {
            store.create_post(alice, &format!("a{i}"), "body").await.unwrap();
        }
        store.create_post(bob, "b0", "body").await.unwrap();

        let (items, total) = store.list_recent(0, 3).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].title, "b0");

        let (items, total) = store.list_by_author(alice, 3, 3).await.unwrap();
        assert_eq!(total, 4);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "a0");
    }

    #[tokio::test]
    async fn update_keeps_date_posted() {
        let store = MemoryPostStore::new();
        let post = store.create_post(Uuid::new_v4(), "t", "c").await.unwrap();
        let updated = store.update_post(post.id, "t2", "c2").await.unwrap();
        assert_eq!(updated.title, "t2");
        assert_eq!(updated.date_posted, post.date_posted);
    }

    #[tokio::test]
    async fn delete_missing_post_is_not_found() {
        let store = MemoryPostStore::new();
        let post = store.create_post(Uuid::new_v4(), "t", "c").await.unwrap();
        store.delete_post(post.id).await.unwrap();
        assert!(store.find_post(post.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_post(post.id).await,
            Err(StoreError::NotFound)
        ));
    }
}
