use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;

use super::record::{ChannelId, MessageId, MessageRecord, TimelineEntry};
use crate::error::FocusError;

type Observer = Box<dyn FnMut(u64)>;

/// Which entry the focus sits on, used to keep the cursor on the same
/// message while entries move around it.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Sentinel,
    Message(MessageId),
}

/// Sorted, deduplicated timeline of messages from one or more channels.
///
/// Entries are ordered ascending by timestamp with the end-of-history
/// sentinel (if any) first, and no two messages share an id. Focus is
/// `None` exactly when the timeline is empty.
pub struct TimelineStore {
    entries: Vec<TimelineEntry>,
    focus: Option<usize>,
    top_reached: bool,
    polling: bool,
    generation: u64,
    revision: u64,
    observers: Vec<Observer>,
}

impl Default for TimelineStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TimelineStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineStore")
            .field("entries", &self.entries.len())
            .field("focus", &self.focus)
            .field("top_reached", &self.top_reached)
            .field("polling", &self.polling)
            .field("generation", &self.generation)
            .field("revision", &self.revision)
            .finish()
    }
}

impl TimelineStore {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            focus: None,
            top_reached: false,
            polling: false,
            generation: 0,
            revision: 0,
            observers: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TimelineEntry> {
        self.entries.get(index)
    }

    pub fn position_of(&self, id: MessageId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == Some(id))
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.position_of(id).is_some()
    }

    pub fn message(&self, id: MessageId) -> Option<&MessageRecord> {
        self.position_of(id)
            .and_then(|idx| self.entries[idx].as_message())
    }

    pub fn has_sentinel(&self) -> bool {
        self.entries.first().is_some_and(TimelineEntry::is_sentinel)
    }

    /// Timestamp of the oldest real message held, ignoring the sentinel.
    pub fn earliest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.entries
            .iter()
            .find_map(|e| e.as_message().map(|m| m.timestamp))
    }

    /// Timestamp of the oldest message held for `channel`.
    pub fn earliest_timestamp_in(&self, channel: ChannelId) -> Option<DateTime<Utc>> {
        self.entries
            .iter()
            .filter_map(TimelineEntry::as_message)
            .find(|m| m.channel_id == channel)
            .map(|m| m.timestamp)
    }

    pub fn is_top_reached(&self) -> bool {
        self.top_reached
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    /// Bumped by every `clear`; a fetch tagged with an older generation was
    /// issued for a channel set that is no longer shown.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Register a callback run after every mutation with the new revision.
    pub fn on_modified(&mut self, observer: impl FnMut(u64) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub(crate) fn set_polling(&mut self, polling: bool) {
        self.polling = polling;
    }

    pub(crate) fn mark_top_reached(&mut self) {
        self.top_reached = true;
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Merge a batch into the timeline. Records whose id is already present
    /// are dropped (the held copy wins). Returns how many were added.
    pub fn insert_many(&mut self, records: impl IntoIterator<Item = MessageRecord>) -> usize {
        let anchor = self.anchor();
        let mut seen: HashSet<MessageId> = self.entries.iter().filter_map(|e| e.id()).collect();
        let before = self.entries.len();

        for record in records {
            if seen.insert(record.id) {
                self.entries.push(TimelineEntry::Message(record));
            }
        }

        let added = self.entries.len() - before;
        if added > 0 {
            self.entries.sort_by_key(TimelineEntry::sort_key);
            self.restore_anchor(anchor);
            self.touch();
        }
        added
    }

    /// Insert a single live message at its sorted position. A second call
    /// with an id already present changes nothing and returns false.
    pub fn append_one(&mut self, record: MessageRecord) -> bool {
        if self.contains(record.id) {
            return false;
        }

        let entry = TimelineEntry::Message(record);
        let key = entry.sort_key();
        let idx = self.entries.partition_point(|e| e.sort_key() <= key);
        self.entries.insert(idx, entry);

        self.focus = match self.focus {
            Some(f) if idx <= f => Some(f + 1),
            Some(f) => Some(f),
            None => Some(idx),
        };
        self.touch();
        true
    }

    /// Swap an existing message in place. Edits never move a message, so
    /// the held timestamp is kept as the ordering key.
    pub fn replace(&mut self, id: MessageId, mut new_record: MessageRecord) -> bool {
        let Some(idx) = self.position_of(id) else {
            return false;
        };
        debug_assert!(
            new_record.id == id || !self.contains(new_record.id),
            "replacement would duplicate message {}",
            new_record.id
        );

        new_record.timestamp = self.entries[idx].timestamp();
        self.entries[idx] = TimelineEntry::Message(new_record);
        self.touch();
        true
    }

    pub fn remove(&mut self, id: MessageId) -> Option<MessageRecord> {
        let idx = self.position_of(id)?;
        let removed = self.entries.remove(idx);

        let len = self.entries.len();
        self.focus = match self.focus {
            _ if len == 0 => None,
            Some(f) if idx < f => Some(f - 1),
            Some(f) => Some(f.min(len - 1)),
            None => None,
        };
        self.touch();

        match removed {
            TimelineEntry::Message(m) => Some(m),
            TimelineEntry::Sentinel => None,
        }
    }

    /// Put the end-of-history marker at the top. Only one is ever held.
    pub fn insert_sentinel(&mut self) -> bool {
        if self.has_sentinel() {
            return false;
        }
        self.entries.insert(0, TimelineEntry::Sentinel);
        self.focus = Some(self.focus.map_or(0, |f| f + 1));
        self.touch();
        true
    }

    /// Forget everything. Used when the active channel set changes.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.focus = None;
        self.top_reached = false;
        self.polling = false;
        self.generation += 1;
        self.touch();
    }

    // =========================================================================
    // Focus
    // =========================================================================

    pub fn get_focus(&self) -> Option<usize> {
        self.focus
    }

    pub fn set_focus(&mut self, index: isize) -> Result<(), FocusError> {
        if index < 0 {
            return Err(FocusError::NeedOlder);
        }
        let index = index as usize;
        if index >= self.entries.len() {
            return Err(FocusError::PastEnd);
        }
        if self.focus != Some(index) {
            self.focus = Some(index);
            self.touch();
        }
        Ok(())
    }

    pub fn focus_last(&mut self) {
        let last = self.entries.len().checked_sub(1);
        if self.focus != last {
            self.focus = last;
            self.touch();
        }
    }

    pub fn focused_entry(&self) -> Option<&TimelineEntry> {
        self.focus.and_then(|f| self.entries.get(f))
    }

    fn anchor(&self) -> Option<Anchor> {
        self.focused_entry().map(|e| match e.id() {
            Some(id) => Anchor::Message(id),
            None => Anchor::Sentinel,
        })
    }

    fn restore_anchor(&mut self, anchor: Option<Anchor>) {
        let found = anchor.and_then(|anchor| {
            self.entries.iter().position(|e| match anchor {
                Anchor::Sentinel => e.is_sentinel(),
                Anchor::Message(id) => e.id() == Some(id),
            })
        });
        self.focus = found.or_else(|| self.entries.len().checked_sub(1));
    }

    fn touch(&mut self) {
        debug_assert!(self.is_consistent(), "timeline invariants violated");
        self.revision += 1;
        self.notify();
    }

    fn notify(&mut self) {
        let revision = self.revision;
        for observer in &mut self.observers {
            observer(revision);
        }
    }

    /// Sorted by key, unique ids, focus in range.
    pub fn is_consistent(&self) -> bool {
        let sorted = self
            .entries
            .windows(2)
            .all(|w| w[0].sort_key() <= w[1].sort_key());
        let mut ids = HashSet::new();
        let unique = self.entries.iter().filter_map(|e| e.id()).all(|id| ids.insert(id));
        let sentinels = self.entries.iter().filter(|e| e.is_sentinel()).count();
        let focus_ok = match self.focus {
            None => self.entries.is_empty(),
            Some(f) => f < self.entries.len(),
        };
        sorted && unique && sentinels <= 1 && focus_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::ChannelId;
    use chrono::TimeZone;
    use std::cell::Cell;
    use std::rc::Rc;

    fn msg(id: u64, t: i64) -> MessageRecord {
        MessageRecord::new(
            MessageId(id),
            ChannelId(1),
            "alice",
            Utc.timestamp_opt(t, 0).unwrap(),
            format!("message {}", id),
        )
    }

    fn ids(store: &TimelineStore) -> Vec<Option<u64>> {
        store.entries().iter().map(|e| e.id().map(|id| id.0)).collect()
    }

    #[test]
    fn test_insert_many_sorts_and_dedups() {
        let mut store = TimelineStore::new();
        assert_eq!(store.insert_many(vec![msg(3, 30), msg(1, 10)]), 2);
        assert_eq!(store.insert_many(vec![msg(2, 20), msg(1, 10), msg(2, 20)]), 1);

        assert_eq!(ids(&store), vec![Some(1), Some(2), Some(3)]);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_insert_many_keeps_existing_copy() {
        let mut store = TimelineStore::new();
        store.insert_many(vec![msg(1, 10)]);

        let mut dup = msg(1, 10);
        dup.content = "refetched".to_string();
        store.insert_many(vec![dup]);

        assert_eq!(store.message(MessageId(1)).unwrap().content, "message 1");
    }

    #[test]
    fn test_insert_many_keeps_focus_on_same_message() {
        let mut store = TimelineStore::new();
        store.insert_many(vec![msg(5, 50), msg(6, 60)]);
        store.set_focus(0).unwrap();

        store.insert_many(vec![msg(1, 10), msg(2, 20)]);

        assert_eq!(store.get_focus(), Some(2));
        assert_eq!(store.focused_entry().and_then(|e| e.id()), Some(MessageId(5)));
    }

    #[test]
    fn test_first_insert_focuses_newest() {
        let mut store = TimelineStore::new();
        assert_eq!(store.get_focus(), None);
        store.insert_many(vec![msg(1, 10), msg(2, 20)]);
        assert_eq!(store.get_focus(), Some(1));
    }

    #[test]
    fn test_append_one_is_idempotent() {
        let mut once = TimelineStore::new();
        once.insert_many(vec![msg(1, 10)]);
        once.append_one(msg(2, 20));

        let mut twice = TimelineStore::new();
        twice.insert_many(vec![msg(1, 10)]);
        assert!(twice.append_one(msg(2, 20)));
        assert!(!twice.append_one(msg(2, 20)));

        assert_eq!(once.entries(), twice.entries());
        assert_eq!(once.get_focus(), twice.get_focus());
    }

    #[test]
    fn test_append_one_tolerates_out_of_order_delivery() {
        let mut store = TimelineStore::new();
        store.insert_many(vec![msg(1, 10), msg(3, 30)]);
        store.append_one(msg(2, 20));

        assert_eq!(ids(&store), vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_append_before_focus_shifts_focus() {
        let mut store = TimelineStore::new();
        store.insert_many(vec![msg(1, 10), msg(3, 30)]);
        store.set_focus(1).unwrap();

        store.append_one(msg(2, 20));

        assert_eq!(store.get_focus(), Some(2));
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut store = TimelineStore::new();
        store.insert_many(vec![msg(5, 10), msg(6, 20)]);

        let mut edited = msg(5, 10);
        edited.content = "hi edited".to_string();
        edited.timestamp = Utc.timestamp_opt(99, 0).unwrap();
        assert!(store.replace(MessageId(5), edited));

        assert_eq!(store.position_of(MessageId(5)), Some(0));
        let held = store.message(MessageId(5)).unwrap();
        assert_eq!(held.content, "hi edited");
        assert_eq!(held.timestamp, Utc.timestamp_opt(10, 0).unwrap());
        assert!(store.is_consistent());
        assert!(!store.replace(MessageId(42), msg(42, 1)));
    }

    #[test]
    fn test_remove_clamps_focus() {
        let mut store = TimelineStore::new();
        store.insert_many(vec![msg(1, 10), msg(2, 20), msg(3, 30)]);
        assert_eq!(store.get_focus(), Some(2));

        store.remove(MessageId(3));
        assert_eq!(store.get_focus(), Some(1));

        store.remove(MessageId(1));
        assert_eq!(store.get_focus(), Some(0));

        store.remove(MessageId(2));
        assert!(store.is_empty());
        assert_eq!(store.get_focus(), None);
    }

    #[test]
    fn test_remove_missing_id_is_noop() {
        let mut store = TimelineStore::new();
        store.insert_many(vec![msg(1, 10)]);
        let revision = store.revision();

        assert!(store.remove(MessageId(9)).is_none());
        assert_eq!(store.revision(), revision);
        assert_eq!(store.get_focus(), Some(0));
    }

    #[test]
    fn test_sentinel_inserted_once_and_first() {
        let mut store = TimelineStore::new();
        store.insert_many(vec![msg(1, 10)]);

        assert!(store.insert_sentinel());
        assert!(!store.insert_sentinel());
        store.insert_many(vec![msg(0, 0)]);

        assert_eq!(store.entries()[0], TimelineEntry::Sentinel);
        assert_eq!(store.entries().iter().filter(|e| e.is_sentinel()).count(), 1);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_set_focus_bounds() {
        let mut store = TimelineStore::new();
        store.insert_many(vec![msg(1, 10), msg(2, 20)]);

        assert_eq!(store.set_focus(-1), Err(FocusError::NeedOlder));
        assert_eq!(store.set_focus(2), Err(FocusError::PastEnd));
        assert_eq!(store.set_focus(0), Ok(()));
        assert_eq!(store.get_focus(), Some(0));
    }

    #[test]
    fn test_clear_resets_flags_and_bumps_generation() {
        let mut store = TimelineStore::new();
        store.insert_many(vec![msg(1, 10)]);
        store.mark_top_reached();
        store.set_polling(true);
        let generation = store.generation();

        store.clear();

        assert!(store.is_empty());
        assert!(!store.is_top_reached());
        assert!(!store.is_polling());
        assert_eq!(store.generation(), generation + 1);
        assert_eq!(store.get_focus(), None);
    }

    #[test]
    fn test_observers_see_every_mutation() {
        let mut store = TimelineStore::new();
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        store.on_modified(move |_| seen.set(seen.get() + 1));

        store.insert_many(vec![msg(1, 10)]);
        store.append_one(msg(2, 20));
        store.replace(MessageId(1), msg(1, 10));
        store.remove(MessageId(2));

        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn test_sorted_and_unique_under_mixed_operations() {
        let mut store = TimelineStore::new();
        let stamps = [7, 3, 9, 1, 3, 8, 2, 7, 5, 9];
        for (round, t) in stamps.iter().enumerate() {
            let id = *t as u64;
            if round % 2 == 0 {
                store.append_one(msg(id, *t));
            } else {
                store.insert_many(vec![msg(id, *t), msg(id + 100, *t + 100)]);
            }
            assert!(store.is_consistent());
        }

        let held: Vec<_> = store.entries().iter().filter_map(|e| e.id()).collect();
        let distinct: HashSet<_> = held.iter().copied().collect();
        assert_eq!(held.len(), distinct.len());
    }
}
