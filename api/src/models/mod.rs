mod author;
mod feed;
mod post;

pub use author::{AuthorRecord, AuthorView};
pub use feed::FeedEntry;
pub use post::Post;
