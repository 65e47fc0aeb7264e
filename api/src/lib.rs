//! Emoji-only micro-posting API.
//!
//! Posts live in a [`store::PostStore`]; authors live in an external identity
//! service reached through [`directory::AuthorDirectory`]. Writes are charged
//! against a per-author sliding window ([`rate_limit`]) and reads are joined
//! with their authors by [`feed::FeedAssembler`].

pub mod auth;
pub mod config;
pub mod directory;
pub mod dto;
pub mod errors;
pub mod feed;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod service;
pub mod states;
pub mod store;

pub use states::AppState;
