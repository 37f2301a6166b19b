//! Read-mostly lookup surface over users, their posts and follow edges.

pub mod mock;
pub mod record;
pub mod store;

pub use store::{FeedStore, InMemoryStore, PostList, StoreError, StoreStats};
