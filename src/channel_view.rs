use std::sync::Arc;
use tracing::{debug, info};

use crate::client::ChatClient;
use crate::error::{FocusError, TimelineError};
use crate::timeline::{
    ChannelId, Completion, FetchOutcome, LiveEventBridge, MessageRecord, PaginationController,
    Step, TimelineStore, TimelineView,
};

/// One tab's worth of timeline: the active channel set, the store, and the
/// pagination and live-event machinery feeding it.
pub struct ChannelView {
    client: Arc<dyn ChatClient>,
    channels: Vec<ChannelId>,
    send_channel: Option<ChannelId>,
    store: TimelineStore,
    pager: PaginationController,
    bridge: Option<LiveEventBridge>,
    notices: Vec<String>,
}

impl ChannelView {
    pub fn new(client: Arc<dyn ChatClient>, page_size: usize) -> Self {
        let pager = PaginationController::new(Arc::clone(&client), page_size);
        Self {
            client,
            channels: Vec::new(),
            send_channel: None,
            store: TimelineStore::new(),
            pager,
            bridge: None,
            notices: Vec::new(),
        }
    }

    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    pub fn send_channel(&self) -> Option<ChannelId> {
        self.send_channel
    }

    pub fn store(&self) -> &TimelineStore {
        &self.store
    }

    /// For registering modification callbacks.
    pub fn store_mut(&mut self) -> &mut TimelineStore {
        &mut self.store
    }

    pub fn view(&self) -> TimelineView<'_> {
        TimelineView::new(&self.store)
    }

    pub fn pager(&self) -> &PaginationController {
        &self.pager
    }

    pub fn is_subscribed(&self) -> bool {
        self.bridge.is_some()
    }

    /// Show `channels`, replacing whatever was shown before. The store is
    /// cleared, the old subscription released, and the first page requested.
    pub fn open(&mut self, channels: Vec<ChannelId>) {
        let mut unique: Vec<ChannelId> = Vec::with_capacity(channels.len());
        for channel in channels {
            if !unique.contains(&channel) {
                unique.push(channel);
            }
        }

        self.bridge = None;
        self.store.clear();
        self.channels = unique;
        if !self.send_channel.is_some_and(|c| self.channels.contains(&c)) {
            self.send_channel = self.channels.first().copied();
        }
        info!(channels = ?self.channels, "opening channel view");

        if self.channels.is_empty() {
            return;
        }
        self.bridge = Some(LiveEventBridge::new(self.client.subscribe()));

        let snap_to_bottom: Completion = Box::new(|store: &mut TimelineStore| store.focus_last());
        self.request_history(Some(snap_to_bottom));
    }

    pub fn add_channel(&mut self, channel: ChannelId) -> bool {
        if self.channels.contains(&channel) {
            return false;
        }
        let mut channels = self.channels.clone();
        channels.push(channel);
        self.open(channels);
        true
    }

    pub fn remove_channel(&mut self, channel: ChannelId) -> bool {
        if !self.channels.contains(&channel) {
            return false;
        }
        let channels = self.channels.iter().copied().filter(|c| *c != channel).collect();
        self.open(channels);
        true
    }

    pub fn set_send_channel(&mut self, channel: ChannelId) -> bool {
        if self.channels.contains(&channel) {
            self.send_channel = Some(channel);
            true
        } else {
            false
        }
    }

    pub fn cycle_send_channel(&mut self) {
        if self.channels.is_empty() {
            return;
        }
        let current = self
            .send_channel
            .and_then(|c| self.channels.iter().position(|x| *x == c))
            .unwrap_or(0);
        self.send_channel = Some(self.channels[(current + 1) % self.channels.len()]);
    }

    /// Fold finished fetches and pending live events into the store.
    /// Returns whether anything visible changed.
    pub fn tick(&mut self) -> bool {
        let mut changed = false;
        for outcome in self.pager.poll(&mut self.store) {
            changed |= self.record(&outcome);
        }
        if let Some(bridge) = self.bridge.as_mut() {
            changed |= bridge.drain(&mut self.store, &self.channels) > 0;
        }
        changed
    }

    /// Wait for the fetch in flight (if any) and apply it. Stale results
    /// from a previous channel set are skipped.
    pub async fn wait_for_history(&mut self) -> Option<FetchOutcome> {
        while self.store.is_polling() {
            let outcome = self.pager.next_outcome(&mut self.store).await?;
            if outcome != FetchOutcome::Stale {
                self.record(&outcome);
                return Some(outcome);
            }
        }
        None
    }

    pub fn request_older(&mut self) -> Result<(), TimelineError> {
        self.pager
            .request_older(&mut self.store, &self.channels, None, None)
    }

    fn request_history(&mut self, on_complete: Option<Completion>) {
        if let Err(err) = self
            .pager
            .request_older(&mut self.store, &self.channels, None, on_complete)
        {
            self.notices.push(err.to_string());
        }
    }

    fn record(&mut self, outcome: &FetchOutcome) -> bool {
        match outcome {
            FetchOutcome::Failed(err) => {
                self.notices.push(TimelineError::from(err.clone()).to_string());
                false
            }
            FetchOutcome::Stale => false,
            FetchOutcome::Exhausted | FetchOutcome::Merged { .. } => true,
        }
    }

    /// Move focus. A negative index asks for older history instead.
    pub fn set_focus(&mut self, index: isize) -> Result<(), FocusError> {
        let result = self.store.set_focus(index);
        if result == Err(FocusError::NeedOlder) {
            debug!("scrolled above loaded history");
            self.request_history(None);
        }
        result
    }

    /// Position before `position`, requesting older history when asked for
    /// the slot above the first entry. That slot reports `End` once history
    /// is exhausted or when no channel is shown.
    ///
    /// A fetch already in flight is not reported here; only the scroll
    /// methods leave a notice for it.
    pub fn prev_position(&mut self, position: usize) -> Step {
        let step = self.view().prev_position(position);
        match step {
            Step::NeedOlder if self.channels.is_empty() => Step::End,
            Step::NeedOlder => match self.request_older() {
                Err(TimelineError::Exhausted) => Step::End,
                Err(TimelineError::Busy) | Err(TimelineError::Fetch(_)) | Ok(()) => {
                    Step::NeedOlder
                }
            },
            step => step,
        }
    }

    pub fn next_position(&self, position: usize) -> Step {
        self.view().next_position(position)
    }

    pub fn scroll_up(&mut self, lines: usize) {
        let target = match self.store.get_focus() {
            Some(focus) if focus > 0 => focus.saturating_sub(lines) as isize,
            _ => -1,
        };
        let _ = self.set_focus(target);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        if let Some(focus) = self.store.get_focus() {
            let last = self.store.len().saturating_sub(1);
            let _ = self.set_focus((focus + lines).min(last) as isize);
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        self.store.focus_last();
    }

    pub fn scroll_to_top(&mut self) {
        if !self.store.is_empty() {
            let _ = self.set_focus(0);
        }
    }

    pub fn focused_message(&self) -> Option<&MessageRecord> {
        self.store.focused_entry().and_then(|e| e.as_message())
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChatEvent;
    use crate::error::ClientError;
    use crate::testing::ScriptedClient;
    use crate::timeline::MessageId;
    use chrono::{TimeZone, Utc};
    use tokio::sync::Notify;

    fn msg(id: u64, channel: u64, t: i64) -> MessageRecord {
        MessageRecord::new(
            MessageId(id),
            ChannelId(channel),
            "dave",
            Utc.timestamp_opt(t, 0).unwrap(),
            "yo",
        )
    }

    fn ids(view: &ChannelView) -> Vec<u64> {
        view.store().entries().iter().filter_map(|e| e.id()).map(|id| id.0).collect()
    }

    #[tokio::test]
    async fn test_open_loads_and_snaps_to_bottom() {
        let client = Arc::new(ScriptedClient::new(vec![(
            1,
            Ok(vec![msg(3, 1, 30), msg(2, 1, 20), msg(1, 1, 10)]),
        )]));
        let mut view = ChannelView::new(client.clone(), 50);

        view.open(vec![ChannelId(1), ChannelId(1)]);
        assert_eq!(view.channels(), &[ChannelId(1)]);
        assert_eq!(view.send_channel(), Some(ChannelId(1)));

        view.wait_for_history().await;
        assert_eq!(view.store().len(), 3);
        assert_eq!(view.store().get_focus(), Some(2));
    }

    #[tokio::test]
    async fn test_switching_channels_releases_subscription() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let mut view = ChannelView::new(client.clone(), 50);

        view.open(vec![ChannelId(1)]);
        view.open(vec![ChannelId(2)]);
        view.open(vec![ChannelId(3)]);
        assert_eq!(client.subscriber_count(), 1);

        view.open(Vec::new());
        assert_eq!(client.subscriber_count(), 0);
        assert!(!view.is_subscribed());
    }

    #[tokio::test]
    async fn test_scrolling_above_top_requests_older() {
        let client = Arc::new(ScriptedClient::new(vec![
            (1, Ok(vec![msg(5, 1, 50), msg(6, 1, 60)])),
            (1, Ok(vec![msg(4, 1, 40)])),
        ]));
        let mut view = ChannelView::new(client.clone(), 50);
        view.open(vec![ChannelId(1)]);
        view.wait_for_history().await;

        view.scroll_up(5);
        assert_eq!(view.store().get_focus(), Some(0));
        assert_eq!(client.calls().len(), 1);

        view.scroll_up(1);
        assert_eq!(view.pager().dispatched(), 2);

        view.wait_for_history().await;
        assert_eq!(client.calls()[1].1, Utc.timestamp_opt(50, 0).unwrap());
        assert_eq!(view.store().len(), 3);
        assert_eq!(view.focused_message().map(|m| m.id), Some(MessageId(5)));
    }

    #[tokio::test]
    async fn test_prev_position_reports_end_after_exhaustion() {
        let client = Arc::new(ScriptedClient::new(vec![(1, Ok(vec![msg(1, 1, 10)]))]));
        let mut view = ChannelView::new(client.clone(), 50);
        view.open(vec![ChannelId(1)]);
        view.wait_for_history().await;

        assert_eq!(view.prev_position(0), Step::NeedOlder);
        view.wait_for_history().await;
        assert!(view.store().is_top_reached());
        assert!(view.store().has_sentinel());
        assert_eq!(view.prev_position(0), Step::End);
        assert_eq!(view.next_position(1), Step::End);
    }

    #[tokio::test]
    async fn test_busy_request_leaves_notice() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let mut view = ChannelView::new(client.clone(), 50);
        view.open(vec![ChannelId(1)]);

        assert_eq!(view.set_focus(-1), Err(FocusError::NeedOlder));
        assert_eq!(view.take_notices(), vec![TimelineError::Busy.to_string()]);
        assert_eq!(view.pager().dispatched(), 1);
    }

    #[tokio::test]
    async fn test_tick_applies_live_events() {
        let client = Arc::new(ScriptedClient::new(vec![(1, Ok(vec![msg(1, 1, 10)]))]));
        let mut view = ChannelView::new(client.clone(), 50);
        view.open(vec![ChannelId(1)]);
        view.wait_for_history().await;

        client.emit(ChatEvent::MessageCreated(msg(2, 1, 20)));
        client.emit(ChatEvent::MessageCreated(msg(3, 7, 30)));

        assert!(view.tick());
        assert_eq!(view.store().len(), 2);
        assert_eq!(view.store().get_focus(), Some(1));
        assert!(!view.tick());
    }

    #[tokio::test]
    async fn test_send_channel_follows_channel_set() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let mut view = ChannelView::new(client.clone(), 50);
        view.open(vec![ChannelId(1), ChannelId(2)]);
        assert!(view.set_send_channel(ChannelId(2)));
        assert!(!view.set_send_channel(ChannelId(9)));

        view.cycle_send_channel();
        assert_eq!(view.send_channel(), Some(ChannelId(1)));

        view.remove_channel(ChannelId(1));
        assert_eq!(view.send_channel(), Some(ChannelId(2)));
        assert!(view.add_channel(ChannelId(3)));
        assert!(!view.add_channel(ChannelId(3)));
        assert_eq!(view.channels(), &[ChannelId(2), ChannelId(3)]);
    }

    #[tokio::test]
    async fn test_live_create_during_fetch_converges() {
        let gate = Arc::new(Notify::new());
        let client = Arc::new(
            ScriptedClient::new(vec![(1, Ok(vec![msg(3, 1, 30), msg(1, 1, 10)]))])
                .gated(gate.clone()),
        );
        let mut view = ChannelView::new(client.clone(), 50);
        view.open(vec![ChannelId(1)]);

        client.emit(ChatEvent::MessageCreated(msg(3, 1, 30)));
        client.emit(ChatEvent::MessageCreated(msg(2, 1, 20)));
        assert!(view.tick());
        assert!(view.store().is_polling());
        assert_eq!(ids(&view), vec![2, 3]);

        gate.notify_one();
        assert_eq!(
            view.wait_for_history().await,
            Some(FetchOutcome::Merged { fetched: 2, added: 1 })
        );
        assert_eq!(ids(&view), vec![1, 2, 3]);
        assert_eq!(view.store().get_focus(), Some(2));
    }

    #[tokio::test]
    async fn test_live_create_after_fetch_converges() {
        let client = Arc::new(ScriptedClient::new(vec![(
            1,
            Ok(vec![msg(3, 1, 30), msg(1, 1, 10)]),
        )]));
        let mut view = ChannelView::new(client.clone(), 50);
        view.open(vec![ChannelId(1)]);
        view.wait_for_history().await;
        assert_eq!(ids(&view), vec![1, 3]);

        client.emit(ChatEvent::MessageCreated(msg(3, 1, 30)));
        client.emit(ChatEvent::MessageCreated(msg(2, 1, 20)));
        assert!(view.tick());
        assert_eq!(ids(&view), vec![1, 2, 3]);
        assert_eq!(view.store().get_focus(), Some(2));
    }

    #[tokio::test]
    async fn test_prev_position_without_channels_is_end() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let mut view = ChannelView::new(client.clone(), 50);

        assert_eq!(view.prev_position(0), Step::End);
        assert_eq!(view.pager().dispatched(), 0);
        assert!(view.take_notices().is_empty());
    }

    #[tokio::test]
    async fn test_prev_position_while_loading_stays_quiet() {
        let gate = Arc::new(Notify::new());
        let client = Arc::new(ScriptedClient::new(vec![]).gated(gate.clone()));
        let mut view = ChannelView::new(client.clone(), 50);
        view.open(vec![ChannelId(1)]);

        for _ in 0..5 {
            assert_eq!(view.prev_position(0), Step::NeedOlder);
        }
        assert!(view.take_notices().is_empty());
        assert_eq!(view.pager().dispatched(), 1);

        view.scroll_up(1);
        assert_eq!(view.take_notices(), vec![TimelineError::Busy.to_string()]);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_notice_and_allows_retry() {
        let client = Arc::new(ScriptedClient::new(vec![
            (1, Err(ClientError::Backend("timeout".to_string()))),
            (1, Ok(vec![msg(1, 1, 10)])),
        ]));
        let mut view = ChannelView::new(client.clone(), 50);
        view.open(vec![ChannelId(1)]);

        let outcome = view.wait_for_history().await;
        assert_eq!(
            outcome,
            Some(FetchOutcome::Failed(ClientError::Backend("timeout".to_string())))
        );
        assert_eq!(
            view.take_notices(),
            vec!["history fetch failed: chat service error: timeout".to_string()]
        );
        assert!(!view.store().is_polling());

        assert_eq!(view.request_older(), Ok(()));
        view.wait_for_history().await;
        assert_eq!(ids(&view), vec![1]);
    }
}
