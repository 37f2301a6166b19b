use crate::{
    model::{Id, user::UserMarker},
    util::rfc3339_utc,
};
use serde::{Deserialize, Serialize};
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// An immutable post. The timestamp is only used for ordering.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author_id: Id<UserMarker>,
    pub content: String,
    #[serde(with = "rfc3339_utc")]
    pub timestamp: UtcDateTime,
}

#[cfg(test)]
mod tests {
    use crate::model::post::Post;
    use time::{Duration, macros::utc_datetime};

    #[test]
    fn timestamp_keeps_sub_second_precision() {
        let post = Post {
            id: "post1".into(),
            author_id: "user2".into(),
            content: "Bob's post #15".to_owned(),
            timestamp: utc_datetime!(2025-10-24 10:30) + Duration::nanoseconds(123_456_789),
        };

        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["timestamp"], "2025-10-24T10:30:00.123456789Z");
        assert_eq!(json["author_id"], "user2");

        let parsed: Post = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, post);
    }
}
