use crate::rate_limit::RateLimitConfig;
use std::{env, fmt::Display, num::NonZeroU32, str::FromStr, time::Duration};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// What `getPostByUserId` answers for an author without posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyAuthorFeed {
    NotFound,
    Empty,
}

impl FromStr for EmptyAuthorFeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "not_found" | "not-found" | "404" => Ok(EmptyAuthorFeed::NotFound),
            "empty" => Ok(EmptyAuthorFeed::Empty),
            other => Err(format!("expected `not_found` or `empty`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub identity_api_url: String,
    pub identity_api_key: String,
    pub rate_limit: RateLimitConfig,
    pub feed_limit: usize,
    pub directory_batch_size: usize,
    pub upstream_timeout: Duration,
    pub request_timeout: Duration,
    pub global_rps: NonZeroU32,
    pub empty_author_feed: EmptyAuthorFeed,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rate_limit = RateLimitConfig {
            max_requests: try_load(&lookup, "RATE_LIMIT_MAX_REQUESTS", "3")?,
            window: Duration::from_secs(try_load(&lookup, "RATE_LIMIT_WINDOW_SECS", "60")?),
            count_rejected: try_load(&lookup, "RATE_LIMIT_COUNT_REJECTED", "false")?,
        };

        if rate_limit.max_requests == 0 || rate_limit.window.is_zero() {
            return Err(ConfigError::Invalid {
                key: "RATE_LIMIT_*",
                reason: "quota and window must be positive".into(),
            });
        }

        let feed_limit: usize = try_load(&lookup, "FEED_LIMIT", "100")?;
        if feed_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "FEED_LIMIT",
                reason: "must be positive".into(),
            });
        }

        Ok(Self {
            bind_addr: try_load(&lookup, "BIND_ADDR", "0.0.0.0:3000")?,
            jwt_secret: required(&lookup, "JWT_SECRET")?,
            identity_api_url: required(&lookup, "IDENTITY_API_URL")?,
            identity_api_key: required(&lookup, "IDENTITY_API_KEY")?,
            rate_limit,
            feed_limit,
            directory_batch_size: try_load(&lookup, "DIRECTORY_BATCH_SIZE", "100")?,
            upstream_timeout: Duration::from_millis(try_load(
                &lookup,
                "UPSTREAM_TIMEOUT_MS",
                "3000",
            )?),
            request_timeout: Duration::from_secs(try_load(&lookup, "REQUEST_TIMEOUT_SECS", "10")?),
            global_rps: try_load(&lookup, "GLOBAL_RPS", "200")?,
            empty_author_feed: try_load(&lookup, "EMPTY_AUTHOR_FEED", "not_found")?,
        })
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        })
}
