use crate::store::{InMemoryStore, StoreError};
use feedwerk_common::{
    model::{
        ModelValidationError,
        post::Post,
        user::{User, Username},
    },
    util::rfc3339_utc,
};
use serde::Deserialize;
use std::{fs::File, io::BufReader, path::Path};
use thiserror::Error;
use time::UtcDateTime;
use tracing::info;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Error reading seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error parsing seed file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Seed data was rejected: {0}")]
    Store(#[from] StoreError),
}

/// Flat records a store is populated from.
#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize)]
pub struct SeedRecords {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub posts: Vec<PostRecord>,
    #[serde(default)]
    pub follows: Vec<FollowRecord>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub author_id: String,
    pub content: String,
    #[serde(with = "rfc3339_utc")]
    pub timestamp: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct FollowRecord {
    pub follower_id: String,
    pub followee_id: String,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            username: Username::new(value.username)?,
        })
    }
}

impl From<PostRecord> for Post {
    fn from(value: PostRecord) -> Self {
        Self {
            id: value.id.into(),
            author_id: value.author_id.into(),
            content: value.content,
            timestamp: value.timestamp,
        }
    }
}

impl InMemoryStore {
    /// Builds a store from records. Users are inserted first, so posts may come in any order.
    pub fn from_records(records: SeedRecords) -> Result<Self, StoreError> {
        let store = Self::new();

        for user in records.users {
            store.insert_user(user.try_into()?);
        }
        for post in records.posts {
            store.insert_post(post.into())?;
        }
        for follow in records.follows {
            store.follow(follow.follower_id.into(), follow.followee_id.into());
        }

        let stats = store.stats();
        info!(
            users = stats.users,
            posts = stats.posts,
            follows = stats.follows,
            "Feed store populated"
        );

        Ok(store)
    }

    /// Builds a store from a JSON file holding [`SeedRecords`].
    pub fn from_seed_file(path: &Path) -> Result<Self, SeedError> {
        let reader = BufReader::new(File::open(path)?);
        let records: SeedRecords = serde_json::from_reader(reader)?;

        Ok(Self::from_records(records)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        record::SeedRecords,
        store::{FeedStore, InMemoryStore, StoreError},
    };
    use feedwerk_common::model::ModelValidationError;

    #[test]
    fn parse_and_populate() {
        let records: SeedRecords = serde_json::from_str(
            r#"{
                "users": [
                    { "id": "user1", "username": "Alice" },
                    { "id": "user2", "username": "Bob" }
                ],
                "posts": [
                    {
                        "id": "post1",
                        "author_id": "user2",
                        "content": "older",
                        "timestamp": "2025-10-24T10:00:00.5Z"
                    },
                    {
                        "id": "post2",
                        "author_id": "user2",
                        "content": "newer",
                        "timestamp": "2025-10-24T10:00:00.75Z"
                    }
                ],
                "follows": [
                    { "follower_id": "user1", "followee_id": "user2" },
                    { "follower_id": "user1", "followee_id": "ghost" }
                ]
            }"#,
        )
        .unwrap();

        let store = InMemoryStore::from_records(records).unwrap();

        let posts = store.posts_of(&"user2".into()).unwrap();
        let ids: Vec<_> = posts.iter().map(|post| post.id.as_str()).collect();
        assert_eq!(ids, ["post2", "post1"]);
        assert_eq!(store.followees_of(&"user1".into()).len(), 2);
        assert_eq!(store.user(&"user1".into()).unwrap().username.get(), "Alice");
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let records: SeedRecords = serde_json::from_str("{}").unwrap();
        assert_eq!(records, SeedRecords::default());
    }

    #[test]
    fn invalid_records_are_rejected() {
        let records: SeedRecords =
            serde_json::from_str(r#"{ "users": [{ "id": "user1", "username": "" }] }"#).unwrap();

        assert!(matches!(
            InMemoryStore::from_records(records),
            Err(StoreError::Data(ModelValidationError::Username(_)))
        ));
    }
}
