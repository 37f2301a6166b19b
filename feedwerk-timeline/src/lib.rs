//! Builds a user's timeline from the posts of everyone they follow.

pub mod aggregator;
pub mod context;

pub use aggregator::{FetchFailure, Timeline, TimelineAggregator, TimelineError};
pub use context::{CancelReason, RequestContext};
