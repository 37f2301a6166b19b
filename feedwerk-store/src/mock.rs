//! Built-in demo data, used when no seed file is configured.

use crate::{
    record::{FollowRecord, PostRecord, SeedRecords, UserRecord},
    store::InMemoryStore,
};
use time::{Duration, UtcDateTime};

const USERS: [(&str, &str); 6] = [
    ("user1", "Alice"),
    ("user2", "Bob"),
    ("user3", "Charlie"),
    ("user4", "David"),
    ("user5", "Eve"),
    ("user6", "Frank"),
];

const FOLLOWS: [(&str, &[&str]); 6] = [
    ("user1", &["user2", "user3"]),
    ("user2", &["user1", "user4"]), // Alice never posts.
    ("user3", &["user1", "user2", "user4", "user5"]),
    ("user4", &["user2"]),
    ("user5", &[]),
    ("user6", &["ghost", "user4"]), // "ghost" is not a user.
];

/// Demo records relative to `now`: Bob posts 15 times every 5 minutes, Charlie 8 times every
/// 12 minutes and David 5 times every 30 minutes.
#[must_use]
pub fn mock_records(now: UtcDateTime) -> SeedRecords {
    let users = USERS
        .iter()
        .map(|&(id, username)| UserRecord {
            id: id.to_owned(),
            username: username.to_owned(),
        })
        .collect();

    let mut posts = Vec::new();
    let mut add_posts = |author_id: &str, count: i64, spacing: i64, content: fn(i64) -> String| {
        for i in 0..count {
            posts.push(PostRecord {
                id: format!("post{}", posts.len() + 1),
                author_id: author_id.to_owned(),
                content: content(count - i),
                timestamp: now - Duration::minutes(i * spacing),
            });
        }
    };
    add_posts("user2", 15, 5, |n| format!("Bob's post #{n}"));
    add_posts("user3", 8, 12, |n| format!("Charlie's thoughts {n}"));
    add_posts("user4", 5, 30, |n| format!("David here, post {n}"));

    let follows = FOLLOWS
        .iter()
        .flat_map(|&(follower, followees)| {
            followees.iter().map(move |&followee| FollowRecord {
                follower_id: follower.to_owned(),
                followee_id: followee.to_owned(),
            })
        })
        .collect();

    SeedRecords {
        users,
        posts,
        follows,
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn with_mock_data() -> Self {
        Self::with_mock_data_at(UtcDateTime::now())
    }

    #[must_use]
    pub fn with_mock_data_at(now: UtcDateTime) -> Self {
        Self::from_records(mock_records(now)).expect("Mock records are valid.")
    }
}

#[cfg(test)]
mod tests {
    use crate::store::{FeedStore, InMemoryStore, StoreStats};
    use time::{Duration, macros::utc_datetime};

    #[test]
    fn mock_data_shape() {
        let now = utc_datetime!(2025-10-24 12:00);
        let store = InMemoryStore::with_mock_data_at(now);

        assert_eq!(
            store.stats(),
            StoreStats {
                users: 6,
                posts: 28,
                follows: 11,
            }
        );

        let bob = store.posts_of(&"user2".into()).unwrap();
        assert_eq!(bob.len(), 15);
        assert_eq!(bob[0].timestamp, now);
        assert_eq!(bob[0].content, "Bob's post #15");
        assert_eq!(bob[14].timestamp, now - Duration::minutes(70));

        let charlie = store.posts_of(&"user3".into()).unwrap();
        assert_eq!(charlie.len(), 8);
        assert_eq!(charlie[1].timestamp - charlie[2].timestamp, Duration::minutes(12));

        assert!(store.posts_of(&"user1".into()).unwrap().is_empty());
        assert!(store.followees_of(&"user5".into()).is_empty());
        assert!(store.followees_of(&"user6".into()).contains(&"ghost".into()));
    }
}
