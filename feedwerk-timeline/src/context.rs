use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::{CancellationToken, DropGuard};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum CancelReason {
    Cancelled,
    DeadlineExceeded,
}

/// Cancellation scope of a single request.
///
/// A context ends when its token is cancelled (directly or through a parent) or when its
/// deadline passes, whichever comes first. Without a deadline it only ends on cancellation.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Never extends an earlier deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |current| current.min(deadline)));
        self
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// A context that ends with this one but can also be cancelled on its own.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        if self.token.is_cancelled() {
            Some(CancelReason::Cancelled)
        } else if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            Some(CancelReason::DeadlineExceeded)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_reason().is_some()
    }

    /// Completes once the context has ended.
    pub async fn cancelled(&self) -> CancelReason {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                () = self.token.cancelled() => CancelReason::Cancelled,
                () = sleep_until(deadline) => CancelReason::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                CancelReason::Cancelled
            }
        }
    }

    /// Cancels this context when the returned guard is dropped.
    #[must_use]
    pub fn drop_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }
}

#[cfg(test)]
mod tests {
    use crate::context::{CancelReason, RequestContext};
    use std::time::Duration;
    use tokio::time::{Instant, timeout};

    #[tokio::test]
    async fn cancel_reason() {
        let ctx = RequestContext::new();
        assert_eq!(ctx.cancel_reason(), None);

        ctx.cancel();
        assert_eq!(ctx.cancel_reason(), Some(CancelReason::Cancelled));
        assert_eq!(ctx.cancelled().await, CancelReason::Cancelled);

        let expired = RequestContext::new().with_deadline(Instant::now());
        assert_eq!(expired.cancel_reason(), Some(CancelReason::DeadlineExceeded));
        assert_eq!(expired.cancelled().await, CancelReason::DeadlineExceeded);
    }

    #[tokio::test]
    async fn children_end_with_their_parent() {
        let parent = RequestContext::new();
        let child = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());

        let child = parent.child();
        parent.cancel();
        let reason = timeout(Duration::from_secs(1), child.cancelled()).await;
        assert_eq!(reason, Ok(CancelReason::Cancelled));
    }

    #[tokio::test]
    async fn deadlines_only_shrink() {
        let soon = Instant::now() + Duration::from_secs(1);
        let later = soon + Duration::from_secs(60);

        let ctx = RequestContext::new().with_deadline(soon).with_deadline(later);
        assert_eq!(ctx.deadline(), Some(soon));
        assert_eq!(ctx.child().deadline(), Some(soon));
    }

    #[tokio::test]
    async fn timeout_elapses() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(10));

        let reason = timeout(Duration::from_secs(5), ctx.cancelled()).await;
        assert_eq!(reason, Ok(CancelReason::DeadlineExceeded));
    }

    #[test]
    fn drop_guard_cancels() {
        let ctx = RequestContext::new();
        drop(ctx.drop_guard());

        assert!(ctx.is_cancelled());
    }
}
