use crate::{AppState, errors::ApiError, models::AuthorView};
use axum::{
    Json,
    extract::{Path, State},
};

/// GET /profiles/{username}
/// `username` may carry the `@` of a profile slug.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<AuthorView>, ApiError> {
    Ok(Json(state.posts.get_profile(&username).await?))
}
