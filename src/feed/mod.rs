//! Post feed: posts, comments and likes.

pub mod fixtures;
pub mod store;
pub mod types;

pub use fixtures::seed_feed;
pub use store::PostStore;
pub use types::{Comment, Post};
