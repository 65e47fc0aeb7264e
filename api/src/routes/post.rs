use crate::{
    AppState,
    auth::validate_token,
    dto::{CreatePostRequest, ListParams},
    errors::ApiError,
    models::{FeedEntry, Post},
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use tracing::debug;

/// Body problems surface as validation errors, like bad content does.
fn body_error(rejection: JsonRejection) -> ApiError {
    debug!("Rejected post body: {}", rejection.body_text());
    match rejection {
        JsonRejection::JsonDataError(_) => {
            ApiError::invalid("content", "Content is required and must be a string")
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::invalid("body", "Expected an application/json body")
        }
        _ => ApiError::invalid("body", "Body must be valid JSON"),
    }
}

/// POST /posts
/// Headers: Authorization: Bearer <token>
/// Body: { "content": "🎉" }
pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let identity = validate_token(&headers, &state.jwt_secret)?;
    let Json(payload) = payload.map_err(body_error)?;

    let post = state.posts.create(&identity, payload.content).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /posts?limit=100
pub async fn get_posts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<FeedEntry>>, ApiError> {
    Ok(Json(state.posts.list_all(params.limit).await?))
}

/// GET /posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FeedEntry>, ApiError> {
    Ok(Json(state.posts.get_by_id(&id).await?))
}

/// GET /users/{user_id}/posts?limit=100
pub async fn get_posts_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<FeedEntry>>, ApiError> {
    Ok(Json(
        state.posts.list_by_author(&user_id, params.limit).await?,
    ))
}
