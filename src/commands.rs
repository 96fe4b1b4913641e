use tracing::debug;

use crate::app::App;

pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn parse(text: &str) -> Option<Self> {
        if !text.starts_with('/') {
            return None;
        }

        let parts: Vec<&str> = text.split_whitespace().collect();
        if parts.is_empty() || parts[0].len() < 2 {
            return None;
        }

        let name = parts[0][1..].to_lowercase();
        let args = parts[1..].iter().map(|s| s.to_string()).collect();

        Some(Command { name, args })
    }

    fn arg_text(&self) -> String {
        self.args.join(" ")
    }
}

pub struct CommandHandler;

impl CommandHandler {
    /// Run a slash command against the active tab. Returns false when
    /// `text` is not a command at all.
    pub fn handle(app: &mut App, text: &str) -> bool {
        let cmd = match Command::parse(text) {
            Some(c) => c,
            None => return false,
        };
        debug!(command = %cmd.name, args = ?cmd.args, "running command");

        match cmd.name.as_str() {
            "join" | "j" => Self::handle_join(app, &cmd),
            "leave" | "part" => Self::handle_leave(app, &cmd),
            "send" => Self::handle_send(app, &cmd),
            "channels" | "ch" => app.open_picker(),
            "top" => {
                app.active_mut().view.scroll_to_top();
                app.focus_on_composer = false;
            }
            other => app.notify(&format!("Unknown command: /{}", other)),
        }
        true
    }

    fn handle_join(app: &mut App, cmd: &Command) {
        if cmd.args.is_empty() {
            app.notify("Usage: /join <channel>");
            return;
        }

        let query = cmd.arg_text();
        let Some(channel) = app.directory.resolve(&query) else {
            app.notify(&format!("Unknown channel: {}", query));
            return;
        };

        if app.active_mut().view.add_channel(channel) {
            app.notify(&format!("Joined {}", app.channel_label(channel)));
        } else {
            app.notify(&format!("Already showing {}", app.channel_label(channel)));
        }
    }

    fn handle_leave(app: &mut App, cmd: &Command) {
        let channel = if cmd.args.is_empty() {
            app.active().view.send_channel()
        } else {
            app.directory.resolve(&cmd.arg_text())
        };

        let Some(channel) = channel else {
            app.notify("Usage: /leave <channel>");
            return;
        };

        if app.active_mut().view.remove_channel(channel) {
            app.notify(&format!("Left {}", app.channel_label(channel)));
        } else {
            app.notify(&format!("Not showing {}", app.channel_label(channel)));
        }
    }

    fn handle_send(app: &mut App, cmd: &Command) {
        if cmd.args.is_empty() {
            app.notify("Usage: /send <channel>");
            return;
        }

        let query = cmd.arg_text();
        match app.directory.resolve(&query) {
            Some(channel) if app.active_mut().view.set_send_channel(channel) => {
                app.notify(&format!("Sending to {}", app.channel_label(channel)));
            }
            Some(channel) => {
                app.notify(&format!("{} is not open in this tab", app.channel_label(channel)));
            }
            None => app.notify(&format!("Unknown channel: {}", query)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::demo_app;
    use crate::timeline::ChannelId;

    #[test]
    fn test_parse() {
        let cmd = Command::parse("/join  rustaceans/general ").unwrap();
        assert_eq!(cmd.name, "join");
        assert_eq!(cmd.args, vec!["rustaceans/general".to_string()]);

        assert!(Command::parse("hello /join").is_none());
        assert!(Command::parse("/").is_none());
        assert_eq!(Command::parse("/TOP").unwrap().name, "top");
    }

    #[tokio::test]
    async fn test_join_and_leave() {
        let mut app = demo_app(&[1]).await;

        assert!(CommandHandler::handle(&mut app, "/join #async"));
        assert_eq!(app.active().view.channels(), &[ChannelId(1), ChannelId(2)]);
        assert_eq!(app.status_message.as_deref(), Some("Joined #async"));

        CommandHandler::handle(&mut app, "/join async");
        assert_eq!(app.status_message.as_deref(), Some("Already showing #async"));

        CommandHandler::handle(&mut app, "/leave general");
        assert_eq!(app.active().view.channels(), &[ChannelId(2)]);
        assert_eq!(app.active().view.send_channel(), Some(ChannelId(2)));

        CommandHandler::handle(&mut app, "/join nowhere");
        assert_eq!(app.status_message.as_deref(), Some("Unknown channel: nowhere"));
    }

    #[tokio::test]
    async fn test_send_switches_target() {
        let mut app = demo_app(&[1, 2]).await;

        CommandHandler::handle(&mut app, "/send async");
        assert_eq!(app.active().view.send_channel(), Some(ChannelId(2)));

        CommandHandler::handle(&mut app, "/send help");
        assert_eq!(app.active().view.send_channel(), Some(ChannelId(2)));
        assert_eq!(app.status_message.as_deref(), Some("#help is not open in this tab"));
    }

    #[tokio::test]
    async fn test_channels_opens_picker_and_unknown_is_reported() {
        let mut app = demo_app(&[1]).await;
        assert!(app.picker.is_none());

        CommandHandler::handle(&mut app, "/channels");
        assert!(app.picker.is_some());

        assert!(CommandHandler::handle(&mut app, "/frobnicate"));
        assert_eq!(app.status_message.as_deref(), Some("Unknown command: /frobnicate"));
        assert!(!CommandHandler::handle(&mut app, "plain text"));
    }
}
