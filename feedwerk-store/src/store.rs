use feedwerk_common::model::{
    Id, ModelValidationError,
    post::{Post, PostMarker},
    user::{User, UserMarker},
};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use thiserror::Error;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// A user's posts, newest first.
pub type PostList = Arc<[Arc<Post>]>;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum StoreError {
    #[error("User {0} not found")]
    NotFound(Id<UserMarker>),
    #[error("Fetching posts of user {user} failed: {reason}")]
    Fetch {
        user: Id<UserMarker>,
        reason: String,
    },
    #[error("Post {post} references unknown author {author}")]
    UnknownAuthor {
        post: Id<PostMarker>,
        author: Id<UserMarker>,
    },
    #[error("An object in the store was invalid: {0}")]
    Data(#[from] ModelValidationError),
}

/// Lookup capabilities a timeline is built from.
///
/// Implementations must be safe for any number of concurrent readers.
pub trait FeedStore: Send + Sync + 'static {
    fn user(&self, user_id: &Id<UserMarker>) -> Option<User>;

    /// Users followed by `user_id`. Unknown users follow no one.
    fn followees_of(&self, user_id: &Id<UserMarker>) -> HashSet<Id<UserMarker>>;

    /// Posts authored by `user_id`, newest first.
    ///
    /// A known user without posts yields an empty list, an unknown one [`StoreError::NotFound`].
    fn posts_of(&self, user_id: &Id<UserMarker>) -> Result<PostList>;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct StoreStats {
    pub users: usize,
    pub posts: usize,
    pub follows: usize,
}

#[derive(Debug, Default)]
struct StoreData {
    users: HashMap<Id<UserMarker>, User>,
    posts: HashMap<Id<UserMarker>, PostList>,
    follows: HashMap<Id<UserMarker>, HashSet<Id<UserMarker>>>,
}

/// [`FeedStore`] keeping everything in memory behind a single reader/writer lock.
///
/// Post lists are replaced wholesale on write, so a reader holding a [`PostList`] keeps a
/// consistent snapshot no matter what is written afterwards.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<StoreData>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Nothing holding the lock can leave the maps half-written, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, StoreData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds or renames a user. Returns whether the user was new.
    pub fn insert_user(&self, user: User) -> bool {
        let mut data = self.write();
        data.posts
            .entry(user.id.clone())
            .or_insert_with(|| Arc::from([]));
        data.users.insert(user.id.clone(), user).is_none()
    }

    /// Adds a post to its author's list, keeping the list newest first.
    ///
    /// Posts with equal timestamps stay in insertion order.
    pub fn insert_post(&self, post: Post) -> Result<()> {
        let mut data = self.write();
        let Some(existing) = data.posts.get_mut(&post.author_id) else {
            return Err(StoreError::UnknownAuthor {
                post: post.id,
                author: post.author_id,
            });
        };

        let position = existing.partition_point(|other| other.timestamp >= post.timestamp);
        let mut posts = existing.to_vec();
        posts.insert(position, Arc::new(post));
        *existing = posts.into();

        Ok(())
    }

    /// Records that `follower` follows `followee`. Returns whether the edge was new.
    ///
    /// The followee does not have to exist.
    pub fn follow(&self, follower: Id<UserMarker>, followee: Id<UserMarker>) -> bool {
        self.write()
            .follows
            .entry(follower)
            .or_default()
            .insert(followee)
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let data = self.read();
        StoreStats {
            users: data.users.len(),
            posts: data.posts.values().map(|posts| posts.len()).sum(),
            follows: data.follows.values().map(HashSet::len).sum(),
        }
    }
}

impl FeedStore for InMemoryStore {
    fn user(&self, user_id: &Id<UserMarker>) -> Option<User> {
        self.read().users.get(user_id).cloned()
    }

    fn followees_of(&self, user_id: &Id<UserMarker>) -> HashSet<Id<UserMarker>> {
        self.read()
            .follows
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    fn posts_of(&self, user_id: &Id<UserMarker>) -> Result<PostList> {
        self.read()
            .posts
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(user_id.clone()))
    }
}
