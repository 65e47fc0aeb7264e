//! The post operations exposed to the UI: list, fetch, per-author feed,
//! create, plus the profile lookup backing the author page.

use crate::{
    config::{Config, EmptyAuthorFeed},
    directory::AuthorDirectory,
    dto::CreatePostRequest,
    errors::ApiError,
    feed::FeedAssembler,
    models::{AuthorView, FeedEntry, Post},
    rate_limit::RateLimiter,
    store::PostStore,
};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Cap (and default) for list operations
    pub feed_limit: usize,
    /// Bound on every store and limiter call
    pub upstream_timeout: Duration,
    pub empty_author_feed: EmptyAuthorFeed,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            feed_limit: 100,
            upstream_timeout: Duration::from_secs(3),
            empty_author_feed: EmptyAuthorFeed::NotFound,
        }
    }
}

impl From<&Config> for ServiceOptions {
    fn from(config: &Config) -> Self {
        Self {
            feed_limit: config.feed_limit,
            upstream_timeout: config.upstream_timeout,
            empty_author_feed: config.empty_author_feed,
        }
    }
}

pub struct PostService {
    store: Arc<dyn PostStore>,
    limiter: Arc<dyn RateLimiter>,
    directory: AuthorDirectory,
    assembler: FeedAssembler,
    options: ServiceOptions,
}

impl PostService {
    pub fn new(
        store: Arc<dyn PostStore>,
        limiter: Arc<dyn RateLimiter>,
        directory: AuthorDirectory,
        options: ServiceOptions,
    ) -> Self {
        Self {
            store,
            limiter,
            assembler: FeedAssembler::new(directory.clone()),
            directory,
            options,
        }
    }

    /// `posts.getAll`: the most recent posts with their authors.
    pub async fn list_all(&self, limit: Option<usize>) -> Result<Vec<FeedEntry>, ApiError> {
        let limit = self.clamp(limit);
        let posts = self.bounded("post store", self.store.list_recent(limit)).await?;
        Ok(self.assembler.assemble(posts).await?)
    }

    /// `posts.getById`
    pub async fn get_by_id(&self, id: &str) -> Result<FeedEntry, ApiError> {
        // Ids are opaque to callers; anything unparsable cannot exist.
        let id = Uuid::parse_str(id).map_err(|_| ApiError::NotFound)?;

        let post = self
            .bounded("post store", self.store.get_by_id(id))
            .await?
            .ok_or(ApiError::NotFound)?;

        self.assembler
            .assemble(vec![post])
            .await?
            .pop()
            .ok_or_else(|| ApiError::InternalError(format!("assembly of post {id} came back empty")))
    }

    /// `posts.getPostByUserId`
    pub async fn list_by_author(
        &self,
        author_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<FeedEntry>, ApiError> {
        let limit = self.clamp(limit);
        let posts = self
            .bounded("post store", self.store.list_by_author(author_id, limit))
            .await?;
        let entries = self.assembler.assemble(posts).await?;

        if entries.is_empty() && self.options.empty_author_feed == EmptyAuthorFeed::NotFound {
            return Err(ApiError::NotFound);
        }

        Ok(entries)
    }

    /// `posts.create`: validate, charge the author's quota, then store.
    pub async fn create(&self, identity: &str, content: String) -> Result<Post, ApiError> {
        let request = CreatePostRequest { content };
        request.validate()?;

        let decision = self
            .bounded("rate limiter", self.limiter.allow(identity))
            .await?;

        if !decision.permitted {
            warn!("Rate limit hit by {}", identity);
            return Err(ApiError::RateLimited {
                retry_after_secs: decision.retry_after.map(|d| d.as_secs_f64().ceil() as u64),
            });
        }

        let post = self
            .bounded("post store", self.store.insert(identity, &request.content))
            .await?;

        info!("Post created: {} by user {}", post.id, identity);

        Ok(post)
    }

    /// `profile.getUserByUserName`; one leading `@` is ignored.
    pub async fn get_profile(&self, username: &str) -> Result<AuthorView, ApiError> {
        let username = username.strip_prefix('@').unwrap_or(username);
        if username.is_empty() {
            return Err(ApiError::NotFound);
        }

        let record = self
            .directory
            .find_by_username(username)
            .await?
            .ok_or(ApiError::NotFound)?;

        AuthorView::from_record(&record).ok_or(ApiError::NotFound)
    }

    fn clamp(&self, limit: Option<usize>) -> usize {
        limit
            .unwrap_or(self.options.feed_limit)
            .clamp(1, self.options.feed_limit)
    }

    async fn bounded<T, E, F>(&self, what: &'static str, call: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, E>>,
        ApiError: From<E>,
    {
        match timeout(self.options.upstream_timeout, call).await {
            Ok(result) => result.map_err(ApiError::from),
            Err(_) => Err(ApiError::UpstreamTimeout(format!(
                "{what} did not answer within {:?}",
                self.options.upstream_timeout
            ))),
        }
    }
}
