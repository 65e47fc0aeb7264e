//! Author lookups against the external identity service.

use crate::models::AuthorRecord;
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Raw access to the identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Fetches one batch of users by id. Unknown ids are absent from the result.
    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<AuthorRecord>, DirectoryError>;

    async fn find_by_username(&self, username: &str)
    -> Result<Option<AuthorRecord>, DirectoryError>;
}

/// Deduplicating, batching front for an [`IdentityProvider`].
#[derive(Clone)]
pub struct AuthorDirectory {
    provider: Arc<dyn IdentityProvider>,
    batch_size: usize,
    call_timeout: Duration,
}

impl AuthorDirectory {
    pub fn new(provider: Arc<dyn IdentityProvider>, batch_size: usize, call_timeout: Duration) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
            call_timeout,
        }
    }

    /// Resolves every distinct id to its record.
    ///
    /// Ids the service does not know are left out of the map; no placeholder
    /// records are made up.
    pub async fn resolve_many<'a, I>(
        &self,
        ids: I,
    ) -> Result<HashMap<String, AuthorRecord>, DirectoryError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let unique: Vec<String> = ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .map(str::to_string)
            .collect();

        let mut resolved = HashMap::with_capacity(unique.len());

        for batch in unique.chunks(self.batch_size) {
            debug!(batch_len = batch.len(), "resolving authors");

            let records = timeout(self.call_timeout, self.provider.fetch_users(batch))
                .await
                .map_err(|_| DirectoryError::Timeout(self.call_timeout))??;

            for record in records {
                if batch.contains(&record.id) {
                    resolved.insert(record.id.clone(), record);
                }
            }
        }

        Ok(resolved)
    }

    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AuthorRecord>, DirectoryError> {
        timeout(self.call_timeout, self.provider.find_by_username(username))
            .await
            .map_err(|_| DirectoryError::Timeout(self.call_timeout))?
    }
}

/// User shape returned by the identity service's `/v1/users` endpoint.
#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: String,
    username: Option<String>,
    #[serde(default)]
    profile_image_url: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

impl From<RemoteUser> for AuthorRecord {
    fn from(user: RemoteUser) -> Self {
        Self {
            id: user.id,
            display_name: user.username,
            profile_image_url: user
                .profile_image_url
                .filter(|url| !url.is_empty())
                .or(user.image_url)
                .unwrap_or_default(),
        }
    }
}

/// HTTP client for the hosted identity service.
pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
}

impl HttpIdentityProvider {
    pub fn new(
        base_url: &str,
        api_key: &str,
        request_timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| DirectoryError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            request_timeout,
        })
    }

    async fn get_users(&self, query: &[(&str, String)]) -> Result<Vec<RemoteUser>, DirectoryError> {
        let response = self
            .client
            .get(format!("{}/v1/users", self.base_url))
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Identity service answered {}", status);
            return Err(DirectoryError::Status(status.as_u16()));
        }

        response
            .json::<Vec<RemoteUser>>()
            .await
            .map_err(|e| self.map_reqwest(e))
    }

    fn map_reqwest(&self, e: reqwest::Error) -> DirectoryError {
        if e.is_timeout() {
            DirectoryError::Timeout(self.request_timeout)
        } else {
            DirectoryError::Request(e.to_string())
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<AuthorRecord>, DirectoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: Vec<(&str, String)> = ids.iter().map(|id| ("user_id", id.clone())).collect();
        query.push(("limit", ids.len().to_string()));

        let users = self.get_users(&query).await?;
        Ok(users.into_iter().map(AuthorRecord::from).collect())
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AuthorRecord>, DirectoryError> {
        let query = [("username", username.to_string()), ("limit", "1".to_string())];
        let users = self.get_users(&query).await?;
        Ok(users.into_iter().next().map(AuthorRecord::from))
    }
}

/// Identity provider holding users in memory.
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    users: DashMap<String, AuthorRecord>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users<I>(users: I) -> Self
    where
        I: IntoIterator<Item = AuthorRecord>,
    {
        let provider = Self::new();
        for user in users {
            provider.upsert(user);
        }
        provider
    }

    pub fn upsert(&self, user: AuthorRecord) {
        self.users.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<AuthorRecord>, DirectoryError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.value().clone()))
            .collect())
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AuthorRecord>, DirectoryError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.display_name.as_deref() == Some(username))
            .map(|u| u.value().clone()))
    }
}
