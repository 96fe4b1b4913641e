use anyhow::Result;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use unicode_width::UnicodeWidthStr;

use crate::channel_view::ChannelView;
use crate::client::{ChatClient, Directory, MemberStatus};
use crate::commands::CommandHandler;
use crate::config::Config;
use crate::error::ClientError;
use crate::timeline::{ChannelId, MessageRecord, TimelineEntry};
use crate::utils::{
    format_message_time, pad_to_width, shorten_channel_names, truncate_to_width,
    try_autocomplete, wrap_text,
};

pub const TAB_COUNT: usize = 10;
const PAGE_LINES: usize = 10;
const CHANNEL_WIDTH: usize = 14;
const SIDEBAR_WIDTH: u16 = 20;

/// The input box of a tab.
#[derive(Debug, Default)]
pub struct Composer {
    pub buffer: String,
    /// Byte offset, always on a char boundary.
    pub cursor: usize,
    /// Message being edited; `None` while composing a new one.
    pub editing: Option<MessageRecord>,
}

impl Composer {
    pub fn set_text(&mut self, text: String) {
        self.cursor = text.len();
        self.buffer = text;
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    pub fn stop_edit(&mut self) {
        self.editing = None;
        self.clear();
    }

    pub fn insert(&mut self, c: char) {
        self.buffer.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let prev = self.buffer[..self.cursor]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.buffer.remove(prev);
            self.cursor = prev;
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.buffer.len() {
            self.buffer.remove(self.cursor);
        }
    }

    pub fn left(&mut self) {
        if self.cursor > 0 {
            self.cursor = self.buffer[..self.cursor]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
        }
    }

    pub fn right(&mut self) {
        if self.cursor < self.buffer.len() {
            self.cursor = self.buffer[self.cursor..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| self.cursor + i)
                .unwrap_or(self.buffer.len());
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.buffer.len();
    }
}

pub struct Tab {
    pub view: ChannelView,
    pub composer: Composer,
    list_state: ListState,
}

impl Tab {
    fn new(view: ChannelView) -> Self {
        Self {
            view,
            composer: Composer::default(),
            list_state: ListState::default(),
        }
    }
}

enum PickerRow {
    Server(String),
    Channel(ChannelId, String),
}

/// Popup listing every server and its channels. Enter toggles the selected
/// channel in the active tab.
pub struct ChannelPicker {
    rows: Vec<PickerRow>,
    selected: usize,
}

impl ChannelPicker {
    fn new(directory: &Directory) -> Self {
        let mut rows = Vec::new();
        for server in directory.servers() {
            rows.push(PickerRow::Server(server.name.clone()));
            for channel in &server.channels {
                rows.push(PickerRow::Channel(channel.id, channel.name.clone()));
            }
        }
        let selected = rows
            .iter()
            .position(|r| matches!(r, PickerRow::Channel(..)))
            .unwrap_or(0);
        Self { rows, selected }
    }

    /// Move the selection by `delta` channel rows, skipping server headers.
    fn move_by(&mut self, delta: isize) {
        let mut idx = self.selected as isize;
        loop {
            idx += delta.signum();
            if idx < 0 || idx >= self.rows.len() as isize {
                return;
            }
            if matches!(self.rows[idx as usize], PickerRow::Channel(..)) {
                self.selected = idx as usize;
                return;
            }
        }
    }

    pub fn selected_channel(&self) -> Option<ChannelId> {
        match self.rows.get(self.selected) {
            Some(PickerRow::Channel(id, _)) => Some(*id),
            _ => None,
        }
    }
}

pub struct App {
    pub config: Config,
    pub client: Arc<dyn ChatClient>,
    pub directory: Directory,
    pub tabs: Vec<Tab>,
    pub active_tab: usize,
    pub focus_on_composer: bool,
    pub picker: Option<ChannelPicker>,
    /// Member list beside the messages, toggled with `b`.
    pub show_members: bool,
    pub status_message: Option<String>,
    pub status_expire: Option<Instant>,
    notice_tx: mpsc::UnboundedSender<String>,
    notice_rx: mpsc::UnboundedReceiver<String>,
}

impl App {
    pub async fn new(config: Config, client: Arc<dyn ChatClient>) -> Result<Self> {
        let directory = Directory::new(client.servers().await?);
        let page_size = config.settings.page_size;
        let tabs = (0..TAB_COUNT)
            .map(|_| Tab::new(ChannelView::new(Arc::clone(&client), page_size)))
            .collect();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let mut app = Self {
            config,
            client,
            directory,
            tabs,
            active_tab: 0,
            focus_on_composer: false,
            picker: None,
            show_members: false,
            status_message: None,
            status_expire: None,
            notice_tx,
            notice_rx,
        };

        let restored: Vec<ChannelId> = app
            .config
            .open_channels
            .iter()
            .copied()
            .filter(|c| app.directory.contains(*c))
            .collect();
        if restored.is_empty() {
            app.open_picker();
        } else {
            info!(channels = ?restored, "restoring open channels");
            app.tabs[0].view.open(restored);
            app.focus_on_composer = true;
        }

        Ok(app)
    }

    pub fn active(&self) -> &Tab {
        &self.tabs[self.active_tab]
    }

    pub fn active_mut(&mut self) -> &mut Tab {
        &mut self.tabs[self.active_tab]
    }

    pub fn channel_label(&self, channel: ChannelId) -> String {
        match self.directory.channel_name(channel) {
            Some(name) => format!("#{}", name),
            None => format!("#{}", channel),
        }
    }

    /// Show a status notification that auto-expires
    pub fn notify(&mut self, message: &str) {
        self.status_message = Some(message.to_string());
        self.status_expire = Some(Instant::now() + Duration::from_secs(3));
    }

    /// Advance every tab: finished fetches, live events and action
    /// failures. Returns whether a redraw is needed.
    pub fn tick(&mut self) -> bool {
        let mut changed = false;
        let mut notices = Vec::new();

        for (idx, tab) in self.tabs.iter_mut().enumerate() {
            changed |= tab.view.tick();
            for notice in tab.view.take_notices() {
                if idx == self.active_tab {
                    notices.push(notice);
                } else {
                    debug!(tab = idx, %notice, "notice for background tab");
                }
            }
        }
        while let Ok(notice) = self.notice_rx.try_recv() {
            notices.push(notice);
        }

        if let Some(last) = notices.last() {
            self.notify(last);
            changed = true;
        }
        if self.status_expire.is_some_and(|expire| Instant::now() >= expire) {
            self.status_message = None;
            self.status_expire = None;
            changed = true;
        }
        changed
    }

    /// Alt+digit. Tab 0 is the tenth.
    pub fn switch_tab(&mut self, digit: u32) {
        let idx = if digit == 0 { TAB_COUNT - 1 } else { digit as usize - 1 };
        if idx >= self.tabs.len() {
            return;
        }
        self.active_tab = idx;
        self.notify(&format!("Tab: {}", digit));
        if self.active().view.channels().is_empty() {
            self.open_picker();
        } else {
            self.picker = None;
        }
    }

    pub fn open_picker(&mut self) {
        self.picker = Some(ChannelPicker::new(&self.directory));
    }

    pub fn close_picker(&mut self) {
        self.picker = None;
    }

    pub fn picker_toggle(&mut self) {
        let Some(channel) = self.picker.as_ref().and_then(|p| p.selected_channel()) else {
            return;
        };
        let label = self.channel_label(channel);
        let view = &mut self.active_mut().view;
        if view.channels().contains(&channel) {
            view.remove_channel(channel);
            self.notify(&format!("Left {}", label));
        } else {
            view.add_channel(channel);
            self.notify(&format!("Joined {}", label));
        }
    }

    fn is_own(&self, record: &MessageRecord) -> bool {
        record.author == self.client.username()
    }

    /// Run a service call in the background. Failures come back as notices
    /// on the next tick; successes show up through live events.
    fn spawn_action<F>(&self, what: &'static str, action: F)
    where
        F: Future<Output = Result<(), ClientError>> + Send + 'static,
    {
        let tx = self.notice_tx.clone();
        tokio::spawn(async move {
            if let Err(err) = action.await {
                warn!(error = %err, "{} failed", what);
                let _ = tx.send(format!("{} failed: {}", what, err));
            }
        });
    }

    pub fn submit(&mut self) {
        let composer = &mut self.tabs[self.active_tab].composer;
        let text = composer.buffer.clone();

        if text.trim().is_empty() {
            composer.stop_edit();
            return;
        }

        if let Some(original) = composer.editing.take() {
            composer.clear();
            debug!(id = %original.id, "submitting edit");
            let client = Arc::clone(&self.client);
            self.spawn_action("Edit", async move { client.edit(original.id, text).await });
            return;
        }

        if text.starts_with('/') && CommandHandler::handle(self, &text) {
            self.active_mut().composer.clear();
            return;
        }

        let Some(channel) = self.active().view.send_channel() else {
            self.notify("Open a channel first (Ctrl+S)");
            return;
        };
        self.active_mut().composer.clear();
        let client = Arc::clone(&self.client);
        self.spawn_action("Send", async move { client.send(channel, text).await.map(|_| ()) });
    }

    /// Start editing the focused message, if it is ours.
    pub fn begin_edit(&mut self) {
        let Some(record) = self.active().view.focused_message().cloned() else {
            return;
        };
        if !self.is_own(&record) {
            self.notify("You can only edit your own messages");
            return;
        }
        let composer = &mut self.active_mut().composer;
        composer.set_text(record.content.clone());
        composer.editing = Some(record);
        self.focus_on_composer = true;
    }

    pub fn reply(&mut self) {
        let Some(content) = self.active().view.focused_message().map(|m| m.content.clone()) else {
            return;
        };
        let composer = &mut self.active_mut().composer;
        composer.editing = None;
        composer.set_text(format!("> _{}_\n", content));
        self.focus_on_composer = true;
    }

    pub fn delete_focused(&mut self) {
        let Some(record) = self.active().view.focused_message().cloned() else {
            return;
        };
        if !self.is_own(&record) {
            self.notify("You can only delete your own messages");
            return;
        }
        let client = Arc::clone(&self.client);
        self.spawn_action("Delete", async move { client.delete(record.id).await });
    }

    pub fn cycle_send_channel(&mut self) {
        self.active_mut().view.cycle_send_channel();
        if let Some(channel) = self.active().view.send_channel() {
            let label = self.channel_label(channel);
            self.notify(&format!("Sending to {}", label));
        }
    }

    pub fn scroll_messages(&mut self, lines: isize) {
        let view = &mut self.active_mut().view;
        if lines < 0 {
            view.scroll_up(lines.unsigned_abs());
        } else {
            view.scroll_down(lines as usize);
        }
    }

    pub fn handle_up(&mut self) {
        if let Some(picker) = self.picker.as_mut() {
            picker.move_by(-1);
        } else if self.focus_on_composer {
            self.focus_on_composer = false;
            self.active_mut().view.scroll_to_bottom();
        } else {
            self.scroll_messages(-1);
        }
    }

    pub fn handle_down(&mut self) {
        if let Some(picker) = self.picker.as_mut() {
            picker.move_by(1);
            return;
        }
        if self.focus_on_composer {
            return;
        }
        let store = self.active().view.store();
        let at_bottom = store
            .get_focus()
            .is_none_or(|focus| focus + 1 >= store.len());
        if at_bottom {
            self.focus_on_composer = true;
        } else {
            self.scroll_messages(1);
        }
    }

    pub fn handle_page_up(&mut self) {
        self.scroll_messages(-(PAGE_LINES as isize));
    }

    pub fn handle_page_down(&mut self) {
        self.scroll_messages(PAGE_LINES as isize);
    }

    /// Handle Tab key: try autocomplete first, then toggle focus
    pub fn handle_tab(&mut self) {
        if self.picker.is_some() {
            return;
        }
        if self.focus_on_composer {
            let (completed, hint) = try_autocomplete(&self.active().composer.buffer);
            if let Some(completed) = completed {
                self.active_mut().composer.set_text(completed);
                return;
            }
            if let Some(hint) = hint {
                self.notify(&hint);
                return;
            }
        }
        self.focus_on_composer = !self.focus_on_composer;
    }

    pub fn handle_enter(&mut self) {
        if self.picker.is_some() {
            self.picker_toggle();
        } else if self.focus_on_composer {
            self.submit();
        } else {
            self.begin_edit();
        }
    }

    pub fn handle_esc(&mut self) {
        if self.picker.is_some() {
            self.close_picker();
        } else if self.show_members {
            self.show_members = false;
        } else if self.active().composer.editing.is_some() {
            self.active_mut().composer.stop_edit();
        } else {
            self.focus_on_composer = false;
        }
    }

    /// Printable key. Outside the composer a few letters act on the focused
    /// message.
    pub fn handle_char(&mut self, c: char) {
        if self.picker.is_some() {
            return;
        }
        if self.focus_on_composer {
            self.active_mut().composer.insert(c);
            return;
        }
        match c {
            'r' => self.reply(),
            'e' => self.begin_edit(),
            'd' => self.delete_focused(),
            's' => self.open_picker(),
            'g' => self.active_mut().view.scroll_to_top(),
            'G' => self.active_mut().view.scroll_to_bottom(),
            'i' => self.focus_on_composer = true,
            'b' => self.show_members = !self.show_members,
            _ => {}
        }
    }

    pub fn handle_newline(&mut self) {
        if self.focus_on_composer {
            self.active_mut().composer.insert('\n');
        }
    }

    pub fn handle_backspace(&mut self) {
        if self.focus_on_composer {
            self.active_mut().composer.backspace();
        }
    }

    pub fn handle_delete(&mut self) {
        if self.focus_on_composer {
            self.active_mut().composer.delete();
        } else {
            self.delete_focused();
        }
    }

    pub fn handle_input_left(&mut self) {
        if self.focus_on_composer {
            self.active_mut().composer.left();
        }
    }

    pub fn handle_input_right(&mut self) {
        if self.focus_on_composer {
            self.active_mut().composer.right();
        }
    }

    pub fn handle_home(&mut self) {
        if self.focus_on_composer {
            self.active_mut().composer.home();
        } else {
            self.active_mut().view.scroll_to_top();
        }
    }

    pub fn handle_end(&mut self) {
        if self.focus_on_composer {
            self.active_mut().composer.end();
        } else {
            self.active_mut().view.scroll_to_bottom();
        }
    }

    /// Remember the active tab's channels for the next start.
    pub fn save_state(&mut self) -> Result<()> {
        self.config.open_channels = self.active().view.channels().to_vec();
        self.config.save()
    }

    // =========================================================================
    // Drawing
    // =========================================================================

    pub fn draw(&mut self, f: &mut Frame) {
        let composer_lines = self.active().composer.buffer.split('\n').count().clamp(1, 6) as u16;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(composer_lines + 2),
                Constraint::Length(1),
            ])
            .split(f.area());

        self.draw_header(f, chunks[0]);
        if self.show_members {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(0), Constraint::Length(SIDEBAR_WIDTH)])
                .split(chunks[1]);
            self.draw_messages(f, columns[0]);
            self.draw_members(f, columns[1]);
        } else {
            self.draw_messages(f, chunks[1]);
        }
        self.draw_composer(f, chunks[2]);
        self.draw_send_selector(f, chunks[3]);

        if self.picker.is_some() {
            self.draw_picker(f, centered_rect(60, 60, f.area()));
        }
    }

    fn labels(&self) -> HashMap<ChannelId, String> {
        shorten_channel_names(
            self.active().view.channels().iter().map(|&id| {
                (id, self.directory.channel_name(id).unwrap_or("unknown"))
            }),
            CHANNEL_WIDTH,
        )
    }

    fn draw_header(&self, f: &mut Frame, area: Rect) {
        let header = if let Some(ref msg) = self.status_message {
            Paragraph::new(msg.as_str())
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        } else {
            let view = &self.active().view;
            let digit = (self.active_tab + 1) % TAB_COUNT;
            let mut text = format!("[{}] {}", digit, self.client.username());
            let labels = self.labels();
            for channel in view.channels() {
                text.push_str("  ");
                text.push_str(labels.get(channel).map(String::as_str).unwrap_or("?"));
            }
            if view.store().is_polling() {
                text.push_str("  (loading older messages…)");
            }
            Paragraph::new(text).style(Style::default().fg(Color::LightRed))
        };
        f.render_widget(header, area);
    }

    fn draw_messages(&mut self, f: &mut Frame, area: Rect) {
        let view = &self.active().view;
        let block = Block::default().borders(Borders::ALL).border_style(
            if self.focus_on_composer || self.picker.is_some() {
                Style::default()
            } else {
                Style::default().fg(Color::Green)
            },
        );

        if view.channels().is_empty() || view.store().is_empty() {
            let text = if view.channels().is_empty() {
                "No channels open. Press Ctrl+S to pick some."
            } else if view.store().is_polling() {
                "Loading…"
            } else {
                "Nothing here yet."
            };
            let placeholder = Paragraph::new(text)
                .block(block)
                .style(Style::default().fg(Color::DarkGray));
            f.render_widget(placeholder, area);
            return;
        }

        let width = area.width.saturating_sub(2) as usize;
        let labels = self.labels();
        let show_channel = self.config.settings.show_channel_column && view.channels().len() > 1;
        let send_channel = view.send_channel();

        let items: Vec<ListItem<'static>> = view
            .view()
            .rows()
            .map(|(entry, _)| match entry {
                TimelineEntry::Sentinel => sentinel_item(),
                TimelineEntry::Message(record) => {
                    self.message_item(record, &labels, show_channel, send_channel, width)
                }
            })
            .collect();
        let focus = view.store().get_focus();

        let highlight = if self.focus_on_composer {
            Style::default()
        } else {
            Style::default().add_modifier(Modifier::REVERSED)
        };
        let list = List::new(items).block(block).highlight_style(highlight);

        let tab = self.active_mut();
        tab.list_state.select(focus);
        f.render_stateful_widget(list, area, &mut tab.list_state);
    }

    fn message_item(
        &self,
        record: &MessageRecord,
        labels: &HashMap<ChannelId, String>,
        show_channel: bool,
        send_channel: Option<ChannelId>,
        width: usize,
    ) -> ListItem<'static> {
        let settings = &self.config.settings;
        let mut prefix: Vec<Span<'static>> = Vec::new();
        let mut prefix_width = 0;

        if settings.show_timestamps {
            let ts = format_message_time(record.timestamp, &settings.timestamp_format);
            prefix_width += ts.width() + 1;
            prefix.push(Span::styled(format!("{} ", ts), Style::default().fg(Color::Cyan)));
        }

        if show_channel {
            let label = labels
                .get(&record.channel_id)
                .cloned()
                .unwrap_or_else(|| format!("#{}", record.channel_id));
            let style = if Some(record.channel_id) == send_channel {
                Style::default().fg(Color::LightGreen).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Green)
            };
            prefix_width += CHANNEL_WIDTH + 1;
            prefix.push(Span::styled(
                format!("{} ", pad_to_width(&label, CHANNEL_WIDTH)),
                style,
            ));
        }

        let author_style = if self.is_own(record) {
            Style::default().fg(Color::LightMagenta)
        } else {
            Style::default().fg(Color::LightBlue)
        };
        let author_width = settings.author_width + 1;
        prefix_width += author_width + 1;
        prefix.push(Span::styled(
            format!("{} ", pad_to_width(&format!("{}:", record.author), author_width)),
            author_style,
        ));

        let content_width = width.saturating_sub(prefix_width).max(8);
        let lines: Vec<Line<'static>> = wrap_text(&record.content, content_width)
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                if i == 0 {
                    let mut spans = prefix.clone();
                    spans.push(Span::raw(chunk));
                    Line::from(spans)
                } else {
                    Line::from(vec![Span::raw(" ".repeat(prefix_width)), Span::raw(chunk)])
                }
            })
            .collect();

        ListItem::new(lines)
    }

    fn draw_members(&self, f: &mut Frame, area: Rect) {
        let members = self.directory.members_for(self.active().view.channels());
        let width = SIDEBAR_WIDTH.saturating_sub(4) as usize;

        let items: Vec<ListItem> = members
            .iter()
            .map(|member| {
                let style = match member.status {
                    MemberStatus::Online => Style::default().fg(Color::LightGreen),
                    MemberStatus::Idle => Style::default().fg(Color::Yellow),
                    MemberStatus::Offline => Style::default().fg(Color::DarkGray),
                };
                ListItem::new(format!(" {}", truncate_to_width(&member.name, width))).style(style)
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Members ")
                .border_style(Style::default().fg(Color::Yellow)),
        );
        f.render_widget(list, area);
    }

    fn draw_composer(&self, f: &mut Frame, area: Rect) {
        let tab = self.active();
        let title = match (&tab.composer.editing, tab.view.send_channel()) {
            (Some(_), _) => " Edit (Enter to save, Esc to cancel) ".to_string(),
            (None, Some(channel)) => format!(" Send to {} ", self.channel_label(channel)),
            (None, None) => " Send ".to_string(),
        };
        let border_style = if self.focus_on_composer && self.picker.is_none() {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };

        let mut input_text = tab.composer.buffer.clone();
        if self.focus_on_composer && self.picker.is_none() {
            let cursor_pos = tab.composer.cursor.min(input_text.len());
            input_text.insert(cursor_pos, '█');
        }

        let input = Paragraph::new(input_text)
            .block(Block::default().borders(Borders::ALL).title(title).border_style(border_style))
            .wrap(Wrap { trim: false });
        f.render_widget(input, area);
    }

    fn draw_send_selector(&self, f: &mut Frame, area: Rect) {
        let view = &self.active().view;
        let labels = shorten_channel_names(
            view.channels().iter().map(|&id| {
                (id, self.directory.channel_name(id).unwrap_or("unknown"))
            }),
            100,
        );

        let mut spans = Vec::new();
        for channel in view.channels() {
            let label = labels.get(channel).cloned().unwrap_or_default();
            let style = if Some(*channel) == view.send_channel() {
                Style::default().fg(Color::Black).bg(Color::LightRed)
            } else {
                Style::default().fg(Color::LightRed)
            };
            spans.push(Span::styled(format!(" {} ", label), style));
            spans.push(Span::raw(" "));
        }
        if view.channels().len() > 1 {
            spans.push(Span::styled("Ctrl+N: next", Style::default().fg(Color::DarkGray)));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_picker(&self, f: &mut Frame, area: Rect) {
        let Some(picker) = self.picker.as_ref() else {
            return;
        };
        let open = self.active().view.channels();

        let items: Vec<ListItem> = picker
            .rows
            .iter()
            .map(|row| match row {
                PickerRow::Server(name) => ListItem::new(name.clone())
                    .style(Style::default().add_modifier(Modifier::BOLD)),
                PickerRow::Channel(id, name) => {
                    let mark = if open.contains(id) { "x" } else { " " };
                    ListItem::new(format!("  [{}] #{}", mark, name))
                }
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Channels (Enter: toggle, Esc: close) ")
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let mut state = ListState::default();
        state.select(Some(picker.selected));
        f.render_widget(Clear, area);
        f.render_stateful_widget(list, area, &mut state);
    }
}

fn sentinel_item() -> ListItem<'static> {
    let style = Style::default().fg(Color::DarkGray);
    ListItem::new(vec![
        Line::from(""),
        Line::from("── You have reached the beginning of history ──").centered(),
        Line::from(""),
    ])
    .style(style)
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
