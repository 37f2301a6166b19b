use crate::context::{CancelReason, RequestContext};
use feedwerk_common::{
    model::{Id, post::Post, user::UserMarker},
    util::TimelineLimit,
};
use feedwerk_store::{FeedStore, PostList, StoreError};
use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};
use thiserror::Error;
use tokio::{sync::mpsc, task};
use tracing::{debug, instrument, trace, warn};

pub type Result<T, E = TimelineError> = std::result::Result<T, E>;

/// Ends a timeline request without a timeline.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum TimelineError {
    #[error("Timeline aggregation was cancelled")]
    Cancelled,
    #[error("Timeline aggregation ran past its deadline")]
    DeadlineExceeded,
}

impl From<CancelReason> for TimelineError {
    fn from(value: CancelReason) -> Self {
        match value {
            CancelReason::Cancelled => TimelineError::Cancelled,
            CancelReason::DeadlineExceeded => TimelineError::DeadlineExceeded,
        }
    }
}

/// A followee whose posts could not be fetched.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Fetching posts of followee {followee} failed: {error}")]
pub struct FetchFailure {
    pub followee: Id<UserMarker>,
    #[source]
    pub error: StoreError,
}

/// Newest-first posts of everyone a user follows, along with the followees that failed.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Timeline {
    posts: Vec<Arc<Post>>,
    failures: Vec<FetchFailure>,
    followee_count: usize,
}

impl Timeline {
    #[must_use]
    pub fn posts(&self) -> &[Arc<Post>] {
        &self.posts
    }

    #[must_use]
    pub fn into_posts(self) -> Vec<Arc<Post>> {
        self.posts
    }

    /// Failures in the order they were collected.
    #[must_use]
    pub fn failures(&self) -> &[FetchFailure] {
        &self.failures
    }

    #[must_use]
    pub fn followee_count(&self) -> usize {
        self.followee_count
    }

    /// The last collected failure, but only if no followee could be fetched at all.
    #[must_use]
    pub fn error(&self) -> Option<&FetchFailure> {
        if self.followee_count > 0 && self.failures.len() == self.followee_count {
            self.failures.last()
        } else {
            None
        }
    }
}

/// Sorts posts newest first and keeps at most `limit` of them.
///
/// The sort is stable: posts with equal timestamps keep their relative order.
#[must_use]
pub fn merge_newest_first(mut posts: Vec<Arc<Post>>, limit: TimelineLimit) -> Vec<Arc<Post>> {
    posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    posts.truncate(limit.get());
    posts
}

#[derive(Debug)]
pub struct TimelineAggregator<S: ?Sized> {
    store: Arc<S>,
    limit: TimelineLimit,
}

impl<S: FeedStore + ?Sized> TimelineAggregator<S> {
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self::with_limit(store, TimelineLimit::default())
    }

    #[must_use]
    pub fn with_limit(store: Arc<S>, limit: TimelineLimit) -> Self {
        Self { store, limit }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    #[must_use]
    pub fn limit(&self) -> TimelineLimit {
        self.limit
    }

    /// Builds the timeline of `user_id`.
    ///
    /// Every followee is fetched on its own blocking task. Followees that fail are recorded on
    /// the [`Timeline`] instead of failing the call. Only the end of `ctx` fails the call, and
    /// then no partial timeline is returned.
    ///
    /// Posts with equal timestamps from different followees appear in the order their fetches
    /// completed, which is not deterministic.
    #[instrument(skip_all, fields(user = %user_id))]
    pub async fn build_timeline(
        &self,
        user_id: &Id<UserMarker>,
        ctx: &RequestContext,
    ) -> Result<Timeline> {
        trace!(state = "fetching_followees");
        let followees = self.store.followees_of(user_id);
        let followee_count = followees.len();
        if followee_count == 0 {
            debug!("User follows no one");
            return Ok(Timeline::default());
        }

        trace!(state = "fanning_out", followee_count);
        if let Some(reason) = ctx.cancel_reason() {
            debug!(?reason, "Request ended before fanning out");
            return Err(reason.into());
        }

        // Every worker sends exactly once, so sends never find a full queue.
        let (posts_tx, mut posts_rx) = mpsc::channel::<PostList>(followee_count);
        let (failures_tx, mut failures_rx) = mpsc::channel::<FetchFailure>(followee_count);
        for followee in followees {
            let store = Arc::clone(&self.store);
            let posts_tx = posts_tx.clone();
            let failures_tx = failures_tx.clone();
            task::spawn_blocking(move || {
                fetch_followee(&*store, &followee, &posts_tx, &failures_tx);
            });
        }
        drop(posts_tx);
        drop(failures_tx);

        trace!(state = "collecting");
        let cancelled = ctx.cancelled();
        tokio::pin!(cancelled);

        let mut posts = Vec::new();
        let mut failures = Vec::new();
        let mut posts_open = true;
        let mut failures_open = true;
        while posts_open || failures_open {
            tokio::select! {
                biased;
                reason = &mut cancelled => {
                    debug!(?reason, collected = posts.len(), "Request ended while collecting");
                    return Err(reason.into());
                }
                received = posts_rx.recv(), if posts_open => match received {
                    Some(followee_posts) => posts.extend(followee_posts.iter().cloned()),
                    None => posts_open = false,
                },
                received = failures_rx.recv(), if failures_open => match received {
                    Some(failure) => {
                        warn!(%failure, "Leaving followee out of timeline");
                        failures.push(failure);
                    }
                    None => failures_open = false,
                },
            }
        }

        trace!(state = "sorting");
        debug!(
            posts = posts.len(),
            followee_count,
            failed = failures.len(),
            "Aggregated followee posts"
        );
        let posts = merge_newest_first(posts, self.limit);
        debug!(posts = posts.len(), "Returning timeline");

        Ok(Timeline {
            posts,
            failures,
            followee_count,
        })
    }
}

fn fetch_followee<S: FeedStore + ?Sized>(
    store: &S,
    followee: &Id<UserMarker>,
    posts_tx: &mpsc::Sender<PostList>,
    failures_tx: &mpsc::Sender<FetchFailure>,
) {
    let fetched = catch_unwind(AssertUnwindSafe(|| store.posts_of(followee))).unwrap_or_else(
        |_| {
            Err(StoreError::Fetch {
                user: followee.clone(),
                reason: "store lookup panicked".to_owned(),
            })
        },
    );

    let sent = match fetched {
        Ok(posts) => posts_tx.try_send(posts).is_ok(),
        Err(error) => failures_tx
            .try_send(FetchFailure {
                followee: followee.clone(),
                error,
            })
            .is_ok(),
    };
    if !sent {
        debug!(%followee, "Timeline request is gone, dropping fetch result");
    }
}
