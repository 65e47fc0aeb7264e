use crate::{rate_limit::IngressLimiter, service::PostService};
use std::sync::Arc;

// ============================================================================
// APPLICATION STATE - Shared data across all requests
// ============================================================================
/// Cheap to clone: every field is shared behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostService>,
    pub ingress: Arc<IngressLimiter>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(posts: PostService, ingress: IngressLimiter, jwt_secret: &str) -> Self {
        Self {
            posts: Arc::new(posts),
            ingress: Arc::new(ingress),
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}
