use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use std::num::NonZeroUsize;
use thiserror::Error;

/// Maximum number of posts in a single timeline.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct TimelineLimit(NonZeroUsize);

impl TimelineLimit {
    pub const DEFAULT: Self = Self(NonZeroUsize::new(20).unwrap());

    #[must_use]
    pub fn new(limit: usize) -> Option<Self> {
        NonZeroUsize::new(limit).map(Self)
    }

    #[must_use]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for TimelineLimit {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The timeline limit must be positive, got {0}")]
pub struct InvalidTimelineLimitError(usize);

impl TryFrom<usize> for TimelineLimit {
    type Error = InvalidTimelineLimitError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidTimelineLimitError(value))
    }
}

impl<'de> Deserialize<'de> for TimelineLimit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = usize::deserialize(deserializer)?;
        Self::try_from(inner).map_err(D::Error::custom)
    }
}

/// RFC 3339 (de)serialization for [`UtcDateTime`](time::UtcDateTime), for use with `#[serde(with)]`.
pub mod rfc3339_utc {
    use serde::{Deserializer, Serializer};
    use time::{OffsetDateTime, UtcDateTime, UtcOffset};

    pub fn serialize<S>(value: &UtcDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        time::serde::rfc3339::serialize(&value.to_offset(UtcOffset::UTC), serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<UtcDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        time::serde::rfc3339::deserialize(deserializer).map(OffsetDateTime::to_utc)
    }
}

#[cfg(test)]
mod tests {
    use crate::util::TimelineLimit;

    #[test]
    fn timeline_limit() {
        assert_eq!(TimelineLimit::default().get(), 20);
        assert_eq!(TimelineLimit::try_from(5).map(TimelineLimit::get), Ok(5));
        assert!(TimelineLimit::try_from(0).is_err());

        assert_eq!(
            serde_json::from_str::<TimelineLimit>("7").unwrap(),
            TimelineLimit::new(7).unwrap()
        );
        let err = serde_json::from_str::<TimelineLimit>("0").unwrap_err();
        assert!(err.to_string().starts_with("The timeline limit must be positive, got 0"));
    }
}
