mod requests;
mod responses;

pub use requests::{CreatePostRequest, validate_emoji};
pub use responses::{HealthResponse, ListParams};
