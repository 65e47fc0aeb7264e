use crate::models::Post;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::{
    cmp::Reverse,
    sync::atomic::{AtomicU64, Ordering},
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Durable, append-only post storage.
///
/// Listing operations return posts newest first; posts sharing a creation
/// timestamp keep the order in which they were inserted.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Stores a new post, assigning its id and creation time.
    async fn insert(&self, author_id: &str, content: &str) -> Result<Post, StoreError>;

    async fn list_recent(&self, limit: usize) -> Result<Vec<Post>, StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Post>, StoreError>;

    async fn list_by_author(&self, author_id: &str, limit: usize)
    -> Result<Vec<Post>, StoreError>;
}

struct StoredPost {
    seq: u64,
    post: Post,
}

/// `DashMap`-backed store used for local runs and tests.
#[derive(Default)]
pub struct InMemoryPostStore {
    posts: DashMap<Uuid, StoredPost>,
    next_seq: AtomicU64,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a post with a caller-chosen timestamp.
    pub fn insert_at(&self, author_id: &str, content: &str, created_at: DateTime<Utc>) -> Post {
        let post = Post {
            id: Uuid::new_v4(),
            author_id: author_id.to_string(),
            content: content.to_string(),
            created_at,
        };
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);

        self.posts.insert(
            post.id,
            StoredPost {
                seq,
                post: post.clone(),
            },
        );

        post
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    fn collect<F>(&self, filter: F, limit: usize) -> Vec<Post>
    where
        F: Fn(&Post) -> bool,
    {
        let mut matching: Vec<(DateTime<Utc>, u64, Post)> = self
            .posts
            .iter()
            .filter(|entry| filter(&entry.value().post))
            .map(|entry| {
                let stored = entry.value();
                (stored.post.created_at, stored.seq, stored.post.clone())
            })
            .collect();

        // Newest first, insertion order among equal timestamps
        matching.sort_by_key(|(created_at, seq, _)| (Reverse(*created_at), *seq));

        matching
            .into_iter()
            .take(limit)
            .map(|(_, _, post)| post)
            .collect()
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn insert(&self, author_id: &str, content: &str) -> Result<Post, StoreError> {
        Ok(self.insert_at(author_id, content, Utc::now()))
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Post>, StoreError> {
        Ok(self.collect(|_| true, limit))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        Ok(self.posts.get(&id).map(|stored| stored.post.clone()))
    }

    async fn list_by_author(
        &self,
        author_id: &str,
        limit: usize,
    ) -> Result<Vec<Post>, StoreError> {
        Ok(self.collect(|post| post.author_id == author_id, limit))
    }
}
