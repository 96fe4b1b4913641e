use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, Notify};

use crate::client::{ChatClient, ChatEvent, ServerInfo, Subscription};
use crate::error::ClientError;
use crate::timeline::{ChannelId, MessageId, MessageRecord};

type Page = Result<Vec<MessageRecord>, ClientError>;

/// Client whose history answers come from a per-channel script. Every
/// fetch is recorded; a channel with no script left answers an empty page.
/// When gated, each fetch waits for a `Notify` permit before answering.
pub struct ScriptedClient {
    pages: Mutex<HashMap<ChannelId, VecDeque<Page>>>,
    calls: Mutex<Vec<(ChannelId, DateTime<Utc>)>>,
    gate: Option<Arc<Notify>>,
    events: broadcast::Sender<ChatEvent>,
}

impl ScriptedClient {
    pub fn new(pages: Vec<(u64, Page)>) -> Self {
        let mut script: HashMap<ChannelId, VecDeque<Page>> = HashMap::new();
        for (channel, page) in pages {
            script.entry(ChannelId(channel)).or_default().push_back(page);
        }
        Self {
            pages: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
            gate: None,
            events: broadcast::channel(64).0,
        }
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<(ChannelId, DateTime<Utc>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn emit(&self, event: ChatEvent) {
        let _ = self.events.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    fn username(&self) -> &str {
        "me"
    }

    async fn servers(&self) -> Result<Vec<ServerInfo>, ClientError> {
        Ok(Vec::new())
    }

    async fn fetch_history(
        &self,
        channel: ChannelId,
        before: DateTime<Utc>,
        _limit: usize,
    ) -> Result<Vec<MessageRecord>, ClientError> {
        self.calls.lock().unwrap().push((channel, before));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self
            .pages
            .lock()
            .unwrap()
            .get_mut(&channel)
            .and_then(VecDeque::pop_front);
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn send(&self, _: ChannelId, _: String) -> Result<MessageRecord, ClientError> {
        Err(ClientError::Disconnected)
    }

    async fn edit(&self, _: MessageId, _: String) -> Result<(), ClientError> {
        Err(ClientError::Disconnected)
    }

    async fn delete(&self, _: MessageId) -> Result<(), ClientError> {
        Err(ClientError::Disconnected)
    }

    fn subscribe(&self) -> Subscription {
        Subscription::new(self.events.subscribe())
    }
}
