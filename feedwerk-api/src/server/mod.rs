use axum::{
    Router,
    extract::{FromRef, Request, rejection::PathRejection},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use feedwerk_common::{
    model::{Id, user::UserMarker},
    util::TimelineLimit,
};
use feedwerk_store::{FeedStore, StoreError};
use feedwerk_timeline::{RequestContext, TimelineAggregator, TimelineError};
use json::Json;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::error;

mod json;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub store: Arc<dyn FeedStore>,
    pub timelines: Timelines,
}

impl ServerState {
    /// Timeline requests end when `shutdown` is cancelled or after `timeline_timeout`.
    pub fn new(
        store: Arc<dyn FeedStore>,
        limit: TimelineLimit,
        shutdown: CancellationToken,
        timeline_timeout: Option<Duration>,
    ) -> Self {
        let aggregator = Arc::new(TimelineAggregator::with_limit(Arc::clone(&store), limit));

        Self {
            store,
            timelines: Timelines {
                aggregator,
                root: RequestContext::from_token(shutdown),
                timeout: timeline_timeout,
            },
        }
    }
}

#[derive(Clone)]
pub struct Timelines {
    aggregator: Arc<TimelineAggregator<dyn FeedStore>>,
    root: RequestContext,
    timeout: Option<Duration>,
}

impl Timelines {
    #[must_use]
    pub fn aggregator(&self) -> &TimelineAggregator<dyn FeedStore> {
        &self.aggregator
    }

    #[must_use]
    pub fn request_context(&self) -> RequestContext {
        let ctx = self.root.child();
        match self.timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::UserByIdNotFound(_)
            | ServerError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::Timeline(TimelineError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Timeline(TimelineError::DeadlineExceeded) => StatusCode::GATEWAY_TIMEOUT,
            ServerError::JsonResponse(_) | ServerError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::server::{ServerState, routes};
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use feedwerk_common::util::TimelineLimit;
    use feedwerk_store::InMemoryStore;
    use serde_json::Value;
    use std::{sync::Arc, time::Duration};
    use time::{UtcDateTime, macros::utc_datetime};
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    pub const NOW: UtcDateTime = utc_datetime!(2025-10-24 12:00);

    pub fn app_with(shutdown: CancellationToken, timeout: Option<Duration>) -> Router {
        let store = Arc::new(InMemoryStore::with_mock_data_at(NOW));
        routes().with_state(ServerState::new(
            store,
            TimelineLimit::default(),
            shutdown,
            timeout,
        ))
    }

    pub fn app() -> Router {
        app_with(CancellationToken::new(), None)
    }

    pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn unknown_route() {
        let (status, body) = get(app(), "/nothing/here").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({ "status": 404 }));
    }
}
