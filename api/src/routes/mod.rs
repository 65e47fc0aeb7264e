mod health;
mod post;
mod profile;

pub use health::health_check;
pub use post::{create_post, get_post, get_posts, get_posts_by_user};
pub use profile::get_profile;

use crate::{AppState, errors::ApiError};
use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;

/// Rejects requests once the process-wide request budget is spent.
async fn ingress_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.ingress.check().is_err() {
        warn!("Ingress throttle engaged for {}", request.uri().path());
        return Err(ApiError::Overloaded);
    }
    Ok(next.run(request).await)
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/posts", get(get_posts).post(create_post))
        .route("/posts/{id}", get(get_post))
        .route("/users/{user_id}/posts", get(get_posts_by_user))
        .route("/profiles/{username}", get(get_profile))
        .route_layer(middleware::from_fn_with_state(state.clone(), ingress_guard))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(cors),
        )
}
