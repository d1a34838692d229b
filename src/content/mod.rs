//! Content module - posts, their headers and loading them from disk

mod frontmatter;
pub mod loader;
mod post;

pub use frontmatter::Headers;
pub use loader::load_post;
pub use post::Post;
