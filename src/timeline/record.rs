use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform identifier of a message, stable for the message's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

/// Platform identifier of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

impl MessageRecord {
    pub fn new(
        id: MessageId,
        channel_id: ChannelId,
        author: impl Into<String>,
        timestamp: DateTime<Utc>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id,
            channel_id,
            author: author.into(),
            timestamp,
            content: content.into(),
        }
    }
}

/// One element of a timeline: a real message, or the end-of-history marker
/// that sorts before everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEntry {
    Sentinel,
    Message(MessageRecord),
}

impl TimelineEntry {
    pub fn id(&self) -> Option<MessageId> {
        match self {
            TimelineEntry::Sentinel => None,
            TimelineEntry::Message(m) => Some(m.id),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TimelineEntry::Sentinel => DateTime::<Utc>::MIN_UTC,
            TimelineEntry::Message(m) => m.timestamp,
        }
    }

    pub fn as_message(&self) -> Option<&MessageRecord> {
        match self {
            TimelineEntry::Sentinel => None,
            TimelineEntry::Message(m) => Some(m),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, TimelineEntry::Sentinel)
    }

    /// Ordering key. The sentinel always comes first, even against a message
    /// carrying the minimum timestamp.
    pub(crate) fn sort_key(&self) -> (bool, DateTime<Utc>) {
        (!self.is_sentinel(), self.timestamp())
    }
}

impl From<MessageRecord> for TimelineEntry {
    fn from(record: MessageRecord) -> Self {
        TimelineEntry::Message(record)
    }
}
