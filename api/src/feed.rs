use crate::{
    directory::{AuthorDirectory, DirectoryError},
    models::{FeedEntry, Post},
};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("author {author_id} of post {post_id} not found")]
    AuthorNotFound { post_id: Uuid, author_id: String },
    #[error("author lookup failed: {0}")]
    Directory(#[from] DirectoryError),
}

/// Joins posts with their authors.
#[derive(Clone)]
pub struct FeedAssembler {
    directory: AuthorDirectory,
}

impl FeedAssembler {
    pub fn new(directory: AuthorDirectory) -> Self {
        Self { directory }
    }

    /// Pairs each post with its author, keeping input order.
    ///
    /// All or nothing: one unresolvable author (or one without a display
    /// name) fails the whole batch.
    pub async fn assemble(&self, posts: Vec<Post>) -> Result<Vec<FeedEntry>, FeedError> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let authors = self
            .directory
            .resolve_many(posts.iter().map(|p| p.author_id.as_str()))
            .await?;

        let mut entries = Vec::with_capacity(posts.len());
        for post in posts {
            let post_id = post.id;
            let author_id = post.author_id.clone();

            let entry = authors
                .get(&author_id)
                .and_then(|author| FeedEntry::join(post, author))
                .ok_or_else(|| {
                    error!("Author {} not found for post {}", author_id, post_id);
                    FeedError::AuthorNotFound {
                        post_id,
                        author_id: author_id.clone(),
                    }
                })?;

            entries.push(entry);
        }

        Ok(entries)
    }
}
