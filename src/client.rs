use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::timeline::{ChannelId, MessageId, MessageRecord};

const EVENT_BUFFER: usize = 256;

/// Real-time events delivered by the chat service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    MessageCreated(MessageRecord),
    MessageEdited {
        before: MessageRecord,
        after: MessageRecord,
    },
    MessageDeleted(MessageRecord),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
}

/// Presence of a server member. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Online,
    Idle,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub name: String,
    pub status: MemberStatus,
}

impl MemberInfo {
    pub fn new(name: impl Into<String>, status: MemberStatus) -> Self {
        Self { name: name.into(), status }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub channels: Vec<ChannelInfo>,
    #[serde(default)]
    pub members: Vec<MemberInfo>,
}

/// Server and channel names, for resolving what the user types and for
/// labelling channels on screen.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    servers: Vec<ServerInfo>,
}

impl Directory {
    pub fn new(servers: Vec<ServerInfo>) -> Self {
        Self { servers }
    }

    pub fn servers(&self) -> &[ServerInfo] {
        &self.servers
    }

    pub fn contains(&self, id: ChannelId) -> bool {
        self.channel_name(id).is_some()
    }

    pub fn channel_name(&self, id: ChannelId) -> Option<&str> {
        self.servers
            .iter()
            .flat_map(|s| s.channels.iter())
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }

    /// Members of every server that owns one of `channels`, online first,
    /// then idle, then offline. Someone in two of those servers is listed
    /// once.
    pub fn members_for(&self, channels: &[ChannelId]) -> Vec<&MemberInfo> {
        let mut members: Vec<&MemberInfo> = Vec::new();
        let servers = self
            .servers
            .iter()
            .filter(|s| s.channels.iter().any(|c| channels.contains(&c.id)));
        for member in servers.flat_map(|s| s.members.iter()) {
            if !members.iter().any(|m| m.name == member.name) {
                members.push(member);
            }
        }
        members.sort_by(|a, b| {
            a.status
                .cmp(&b.status)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        members
    }

    /// Accepts `name`, `#name`, `server/name` or a numeric channel id.
    pub fn resolve(&self, query: &str) -> Option<ChannelId> {
        let query = query.trim();
        if let Ok(raw) = query.parse::<u64>() {
            let id = ChannelId(raw);
            return self.contains(id).then_some(id);
        }

        let (server, name) = match query.split_once('/') {
            Some((server, name)) => (Some(server), name),
            None => (None, query),
        };
        let name = name.trim_start_matches('#');

        self.servers
            .iter()
            .filter(|s| server.is_none_or(|wanted| s.name.eq_ignore_ascii_case(wanted)))
            .flat_map(|s| s.channels.iter())
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.id)
    }
}

/// Handle on the service's event stream. Dropping it unsubscribes.
pub struct Subscription {
    rx: broadcast::Receiver<ChatEvent>,
}

impl Subscription {
    pub fn new(rx: broadcast::Receiver<ChatEvent>) -> Self {
        Self { rx }
    }

    /// Next pending event, without waiting.
    pub fn try_next(&mut self) -> Option<ChatEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscription lagged, events dropped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

/// The chat service as seen by the UI.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Display name of the signed-in user.
    fn username(&self) -> &str;

    async fn servers(&self) -> Result<Vec<ServerInfo>, ClientError>;

    /// Up to `limit` messages of `channel` strictly older than `before`.
    /// An empty page means the channel has no older history.
    async fn fetch_history(
        &self,
        channel: ChannelId,
        before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, ClientError>;

    async fn send(&self, channel: ChannelId, text: String) -> Result<MessageRecord, ClientError>;

    async fn edit(&self, id: MessageId, text: String) -> Result<(), ClientError>;

    async fn delete(&self, id: MessageId) -> Result<(), ClientError>;

    fn subscribe(&self) -> Subscription;
}

/// Initial contents of a [`LocalClient`] workspace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceSeed {
    pub servers: Vec<ServerInfo>,
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
}

struct Workspace {
    servers: Vec<ServerInfo>,
    messages: Vec<MessageRecord>,
    next_id: u64,
}

impl Workspace {
    fn has_channel(&self, channel: ChannelId) -> bool {
        self.servers
            .iter()
            .any(|s| s.channels.iter().any(|c| c.id == channel))
    }

    fn position(&self, id: MessageId) -> Result<usize, ClientError> {
        self.messages
            .iter()
            .position(|m| m.id == id)
            .ok_or(ClientError::UnknownMessage(id))
    }

    /// Creation time for a new message, never equal to one already stored
    /// in the same channel.
    fn next_timestamp(&self, channel: ChannelId) -> DateTime<Utc> {
        let now = Utc::now();
        match self
            .messages
            .iter()
            .filter(|m| m.channel_id == channel)
            .map(|m| m.timestamp)
            .max()
        {
            Some(latest) if latest >= now => latest + Duration::milliseconds(1),
            _ => now,
        }
    }
}

/// In-process chat service: keeps servers, channels and history in memory
/// and broadcasts events for every change, the way a remote service would.
#[derive(Clone)]
pub struct LocalClient {
    username: String,
    workspace: Arc<Mutex<Workspace>>,
    events: broadcast::Sender<ChatEvent>,
}

impl LocalClient {
    pub fn new(username: impl Into<String>, seed: WorkspaceSeed) -> Self {
        let next_id = seed.messages.iter().map(|m| m.id.0).max().unwrap_or(0) + 1;
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            username: username.into(),
            workspace: Arc::new(Mutex::new(Workspace {
                servers: seed.servers,
                messages: seed.messages,
                next_id,
            })),
            events,
        }
    }

    pub fn from_seed_file(username: impl Into<String>, path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let seed: WorkspaceSeed = serde_json::from_str(&content)?;
        Ok(Self::new(username, seed))
    }

    /// A small workspace with a few days of scrollback, enough to page
    /// through several times.
    pub fn demo(username: impl Into<String>) -> Self {
        let servers = vec![
            ServerInfo {
                name: "rustaceans".to_string(),
                channels: vec![
                    ChannelInfo { id: ChannelId(1), name: "general".to_string() },
                    ChannelInfo { id: ChannelId(2), name: "async".to_string() },
                    ChannelInfo { id: ChannelId(3), name: "off-topic".to_string() },
                ],
                members: vec![
                    MemberInfo::new("ferris", MemberStatus::Online),
                    MemberInfo::new("corro", MemberStatus::Idle),
                    MemberInfo::new("bors", MemberStatus::Online),
                    MemberInfo::new("crab", MemberStatus::Offline),
                ],
            },
            ServerInfo {
                name: "terminal-club".to_string(),
                channels: vec![
                    ChannelInfo { id: ChannelId(10), name: "showcase".to_string() },
                    ChannelInfo { id: ChannelId(11), name: "help".to_string() },
                ],
                members: vec![
                    MemberInfo::new("tux", MemberStatus::Idle),
                    MemberInfo::new("ferris", MemberStatus::Online),
                ],
            },
        ];

        let authors = ["ferris", "corro", "bors", "crab", "tux"];
        let lines = [
            "has anyone tried the new borrow checker diagnostics?",
            "cargo build is taking forever today",
            "pinning finally clicked for me",
            "what terminal are you all using?",
            "just shipped a release, fingers crossed",
            "the docs for that crate are great",
            "lunch break, back in an hour",
            "that lifetime error was my fault",
        ];

        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).single().unwrap_or_else(Utc::now);
        let mut messages = Vec::new();
        let mut id = 1;
        for (ci, channel) in [1, 2, 3, 10, 11].into_iter().enumerate() {
            let count = 140 - ci * 25;
            for n in 0..count {
                let offset = (n * 17 + ci * 5) as i64;
                messages.push(MessageRecord::new(
                    MessageId(id),
                    ChannelId(channel),
                    authors[(n + ci) % authors.len()],
                    start + Duration::minutes(offset),
                    lines[(n * 3 + ci) % lines.len()],
                ));
                id += 1;
            }
        }

        Self::new(username, WorkspaceSeed { servers, messages })
    }

    /// Post as someone other than the signed-in user.
    pub async fn post_as(
        &self,
        author: &str,
        channel: ChannelId,
        text: &str,
    ) -> Result<MessageRecord, ClientError> {
        let mut workspace = self.workspace.lock().await;
        if !workspace.has_channel(channel) {
            return Err(ClientError::UnknownChannel(channel));
        }

        let record = MessageRecord::new(
            MessageId(workspace.next_id),
            channel,
            author,
            workspace.next_timestamp(channel),
            text,
        );
        workspace.next_id += 1;
        workspace.messages.push(record.clone());
        drop(workspace);

        debug!(id = %record.id, channel = %channel, "message created");
        let _ = self.events.send(ChatEvent::MessageCreated(record.clone()));
        Ok(record)
    }

    fn check_author(&self, record: &MessageRecord) -> Result<(), ClientError> {
        if record.author == self.username {
            Ok(())
        } else {
            Err(ClientError::NotAuthor(record.id))
        }
    }
}

#[async_trait]
impl ChatClient for LocalClient {
    fn username(&self) -> &str {
        &self.username
    }

    async fn servers(&self) -> Result<Vec<ServerInfo>, ClientError> {
        Ok(self.workspace.lock().await.servers.clone())
    }

    async fn fetch_history(
        &self,
        channel: ChannelId,
        before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, ClientError> {
        let workspace = self.workspace.lock().await;
        if !workspace.has_channel(channel) {
            return Err(ClientError::UnknownChannel(channel));
        }

        let mut page: Vec<MessageRecord> = workspace
            .messages
            .iter()
            .filter(|m| m.channel_id == channel && m.timestamp < before)
            .cloned()
            .collect();

        // Newest first, like a paginated history endpoint.
        page.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        page.truncate(limit);
        Ok(page)
    }

    async fn send(&self, channel: ChannelId, text: String) -> Result<MessageRecord, ClientError> {
        let username = self.username.clone();
        self.post_as(&username, channel, &text).await
    }

    async fn edit(&self, id: MessageId, text: String) -> Result<(), ClientError> {
        let mut workspace = self.workspace.lock().await;
        let idx = workspace.position(id)?;
        self.check_author(&workspace.messages[idx])?;

        let before = workspace.messages[idx].clone();
        workspace.messages[idx].content = text;
        let after = workspace.messages[idx].clone();
        drop(workspace);

        let _ = self.events.send(ChatEvent::MessageEdited { before, after });
        Ok(())
    }

    async fn delete(&self, id: MessageId) -> Result<(), ClientError> {
        let mut workspace = self.workspace.lock().await;
        let idx = workspace.position(id)?;
        self.check_author(&workspace.messages[idx])?;

        let removed = workspace.messages.remove(idx);
        drop(workspace);

        let _ = self.events.send(ChatEvent::MessageDeleted(removed));
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        Subscription::new(self.events.subscribe())
    }
}
