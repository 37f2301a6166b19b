use crate::server::{Result, ServerError, ServerRouter, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use feedwerk_common::model::{
    Id,
    user::{User, UserMarker},
};
use feedwerk_store::{FeedStore, PostList, StoreError};
use serde::Deserialize;
use std::{collections::BTreeSet, sync::Arc};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_user)
        .typed_get(get_user_followees)
        .typed_get(get_user_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}", rejection(ServerError))]
struct GetUserPath {
    id: Id<UserMarker>,
}

async fn get_user(
    GetUserPath { id }: GetUserPath,
    State(store): State<Arc<dyn FeedStore>>,
) -> Result<Json<User>> {
    let user = store.user(&id).ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(user))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/followees", rejection(ServerError))]
struct GetUserFolloweesPath {
    id: Id<UserMarker>,
}

async fn get_user_followees(
    GetUserFolloweesPath { id }: GetUserFolloweesPath,
    State(store): State<Arc<dyn FeedStore>>,
) -> Json<BTreeSet<Id<UserMarker>>> {
    Json(store.followees_of(&id).into_iter().collect())
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/posts", rejection(ServerError))]
struct GetUserPostsPath {
    id: Id<UserMarker>,
}

async fn get_user_posts(
    GetUserPostsPath { id }: GetUserPostsPath,
    State(store): State<Arc<dyn FeedStore>>,
) -> Result<Json<PostList>> {
    let posts = store.posts_of(&id).map_err(|err| match err {
        StoreError::NotFound(id) => ServerError::UserByIdNotFound(id),
        err => err.into(),
    })?;

    Ok(Json(posts))
}
