use tracing::{debug, trace};

use super::record::{ChannelId, MessageRecord};
use super::store::TimelineStore;
use crate::client::{ChatEvent, Subscription};

/// What a live event did to the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventEffect {
    /// The event belongs to a channel outside the active set.
    Ignored,
    Inserted { followed: bool },
    Duplicate,
    Replaced,
    Removed,
    /// Edit or delete for a message that is not loaded.
    Missing,
}

impl EventEffect {
    pub fn changed(self) -> bool {
        matches!(
            self,
            EventEffect::Inserted { .. } | EventEffect::Replaced | EventEffect::Removed
        )
    }
}

/// Applies real-time events to a timeline, filtered to the active channels.
///
/// Owns the subscription; dropping the bridge unsubscribes, so switching
/// channel sets never leaves handlers behind.
pub struct LiveEventBridge {
    subscription: Subscription,
}

impl LiveEventBridge {
    pub fn new(subscription: Subscription) -> Self {
        Self { subscription }
    }

    /// Apply every event delivered since the last call. Returns how many
    /// changed the store.
    pub fn drain(&mut self, store: &mut TimelineStore, channels: &[ChannelId]) -> usize {
        let mut changed = 0;
        while let Some(event) = self.subscription.try_next() {
            if Self::apply(store, channels, event).changed() {
                changed += 1;
            }
        }
        changed
    }

    pub fn apply(store: &mut TimelineStore, channels: &[ChannelId], event: ChatEvent) -> EventEffect {
        match event {
            ChatEvent::MessageCreated(record) => Self::on_created(store, channels, record),
            ChatEvent::MessageEdited { before, after } => {
                Self::on_edited(store, channels, &before, after)
            }
            ChatEvent::MessageDeleted(record) => Self::on_deleted(store, channels, &record),
        }
    }

    /// Insert a new message. If the reader was at (or one above) the bottom,
    /// focus follows to the newest message; otherwise it is left alone.
    pub fn on_created(
        store: &mut TimelineStore,
        channels: &[ChannelId],
        record: MessageRecord,
    ) -> EventEffect {
        if !channels.contains(&record.channel_id) {
            trace!(channel = %record.channel_id, "ignoring message for inactive channel");
            return EventEffect::Ignored;
        }

        let len = store.len();
        let at_bottom = store.get_focus().is_none_or(|focus| focus + 2 >= len);

        if !store.append_one(record) {
            return EventEffect::Duplicate;
        }
        if at_bottom {
            store.focus_last();
        }
        EventEffect::Inserted { followed: at_bottom }
    }

    pub fn on_edited(
        store: &mut TimelineStore,
        channels: &[ChannelId],
        before: &MessageRecord,
        after: MessageRecord,
    ) -> EventEffect {
        if !channels.contains(&before.channel_id) {
            return EventEffect::Ignored;
        }
        if store.replace(before.id, after) {
            EventEffect::Replaced
        } else {
            debug!(id = %before.id, "edit for a message that is not loaded");
            EventEffect::Missing
        }
    }

    pub fn on_deleted(
        store: &mut TimelineStore,
        channels: &[ChannelId],
        record: &MessageRecord,
    ) -> EventEffect {
        if !channels.contains(&record.channel_id) {
            return EventEffect::Ignored;
        }
        match store.remove(record.id) {
            Some(_) => EventEffect::Removed,
            None => {
                debug!(id = %record.id, "delete for a message that is not loaded");
                EventEffect::Missing
            }
        }
    }
}
