use thiserror::Error;

use crate::timeline::{ChannelId, MessageId};

/// Failures reported by a chat-service client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("unknown channel {0}")]
    UnknownChannel(ChannelId),

    #[error("unknown message {0}")]
    UnknownMessage(MessageId),

    #[error("message {0} belongs to another user")]
    NotAuthor(MessageId),

    #[error("disconnected from chat service")]
    Disconnected,

    #[error("chat service error: {0}")]
    Backend(String),
}

/// Non-fatal outcomes of a history request. None of these should ever stop
/// the render loop; callers turn them into status notices.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimelineError {
    #[error("still loading older messages")]
    Busy,

    #[error("reached the beginning of history")]
    Exhausted,

    #[error("history fetch failed: {0}")]
    Fetch(#[from] ClientError),
}

/// Signal returned when focus is moved outside the timeline.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum FocusError {
    /// Above the first entry: older history has to be requested.
    #[error("position is above the loaded history")]
    NeedOlder,

    /// Below the last entry: there is nothing more to show.
    #[error("position is past the end of the timeline")]
    PastEnd,
}
