use super::{AuthorRecord, AuthorView, Post};
use serde::Serialize;

/// A post joined with the author who wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedEntry {
    pub post: Post,
    pub author: AuthorView,
}

impl FeedEntry {
    /// Joins `post` with `author`.
    ///
    /// Fails (returns `None`) unless the record belongs to the post's author
    /// and carries a non-empty display name.
    pub fn join(post: Post, author: &AuthorRecord) -> Option<Self> {
        if author.id != post.author_id {
            return None;
        }
        let author = AuthorView::from_record(author)?;
        Some(Self { post, author })
    }
}
