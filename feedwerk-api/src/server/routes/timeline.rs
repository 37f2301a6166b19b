use crate::server::{Result, ServerError, ServerRouter, Timelines, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use feedwerk_common::model::{Id, post::Post, user::UserMarker};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(get_timeline)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/timeline", rejection(ServerError))]
struct GetTimelinePath {
    id: Id<UserMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct TimelineResponse {
    posts: Vec<Arc<Post>>,
}

async fn get_timeline(
    GetTimelinePath { id }: GetTimelinePath,
    State(timelines): State<Timelines>,
) -> Result<Json<TimelineResponse>> {
    let ctx = timelines.request_context();
    // Ends the aggregation if the client goes away and this future is dropped.
    let _cancel_on_drop = ctx.drop_guard();

    let timeline = timelines.aggregator().build_timeline(&id, &ctx).await?;
    if let Some(failure) = timeline.error() {
        warn!(user = %id, %failure, "No followee of user could be fetched");
    }

    Ok(Json(TimelineResponse {
        posts: timeline.into_posts(),
    }))
}
