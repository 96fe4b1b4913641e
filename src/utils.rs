use chrono::{DateTime, Local, Utc};
use std::collections::HashMap;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::timeline::ChannelId;

/// `format` for messages sent today, with the date prepended otherwise.
pub fn format_message_time(timestamp: DateTime<Utc>, format: &str) -> String {
    let datetime: DateTime<Local> = timestamp.into();
    let now = Local::now();

    if datetime.date_naive() == now.date_naive() {
        datetime.format(format).to_string()
    } else {
        datetime.format(&format!("%Y-%m-%d {}", format)).to_string()
    }
}

/// Cut `text` to at most `max_width` terminal columns, marking the cut
/// with '…'.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max_width - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Truncate and right-pad with spaces to exactly `width` columns.
pub fn pad_to_width(text: &str, width: usize) -> String {
    let mut out = truncate_to_width(text, width);
    let used = out.width();
    out.extend(std::iter::repeat_n(' ', width.saturating_sub(used)));
    out
}

/// Display labels for channels, `#name` cut to `max_width` columns.
pub fn shorten_channel_names<'a>(
    channels: impl IntoIterator<Item = (ChannelId, &'a str)>,
    max_width: usize,
) -> HashMap<ChannelId, String> {
    channels
        .into_iter()
        .map(|(id, name)| (id, truncate_to_width(&format!("#{}", name), max_width)))
        .collect()
}

/// Word-wrap `text` to `max_width` columns. Words longer than a line are
/// split. Explicit newlines are kept.
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut lines = Vec::new();

    for raw in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0;

        for word in raw.split_whitespace() {
            let mut word = word.to_string();
            let mut word_width = word.width();

            if current_width > 0 && current_width + 1 + word_width > max_width {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }

            while word_width > max_width {
                let mut head = String::new();
                let mut head_width = 0;
                let mut split_at = word.len();
                for (i, c) in word.char_indices() {
                    let w = c.width().unwrap_or(0);
                    if head_width + w > max_width {
                        split_at = i;
                        break;
                    }
                    head.push(c);
                    head_width += w;
                }
                lines.push(head);
                word = word[split_at..].to_string();
                word_width = word.width();
            }

            if current_width > 0 {
                current.push(' ');
                current_width += 1;
            }
            current.push_str(&word);
            current_width += word_width;
        }
        lines.push(current);
    }

    lines
}

/// Available commands for autocomplete
pub const COMMANDS: &[&str] = &[
    "/join ",
    "/leave ",
    "/send ",
    "/channels",
    "/top",
];

/// Try to autocomplete a command prefix. Returns (completed_text, options_hint)
pub fn try_autocomplete(text: &str) -> (Option<String>, Option<String>) {
    if !text.starts_with('/') {
        return (None, None);
    }

    let matches: Vec<&&str> = COMMANDS.iter().filter(|cmd| cmd.starts_with(text)).collect();

    if matches.len() == 1 {
        return (Some(matches[0].to_string()), None);
    }

    if matches.len() > 1 {
        let mut common = matches[0].to_string();
        for m in &matches[1..] {
            while !m.starts_with(&common) {
                common.pop();
            }
        }
        if common.len() > text.len() {
            return (Some(common), None);
        }
        let options = matches
            .iter()
            .map(|m| m.trim())
            .collect::<Vec<_>>()
            .join(", ");
        return (None, Some(format!("Options: {}", options)));
    }

    (None, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("general", 10), "general");
        assert_eq!(truncate_to_width("off-topic-chatter", 8), "off-top…");
        assert_eq!(truncate_to_width("日本語テキスト", 5), "日本…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn test_pad_to_width() {
        assert_eq!(pad_to_width("bob", 6), "bob   ");
        assert_eq!(pad_to_width("alexandria", 6), "alexa…");
    }

    #[test]
    fn test_shorten_channel_names() {
        let names = shorten_channel_names(
            [(ChannelId(1), "general"), (ChannelId(2), "a-very-long-channel-name")],
            14,
        );
        assert_eq!(names[&ChannelId(1)], "#general");
        assert_eq!(names[&ChannelId(2)], "#a-very-long-…");
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("> _quote_\nreply", 20), vec!["> _quote_", "reply"]);
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("", 4), vec![""]);
    }

    #[test]
    fn test_old_messages_show_date() {
        let ts = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        let text = format_message_time(ts, "%H:%M");
        assert!(text.starts_with("2020-01-0"), "{}", text);
    }

    #[test]
    fn test_autocomplete() {
        let (result, _) = try_autocomplete("/j");
        assert_eq!(result, Some("/join ".to_string()));

        let (result, _) = try_autocomplete("/ch");
        assert_eq!(result, Some("/channels".to_string()));

        let (result, hint) = try_autocomplete("/");
        assert_eq!(result, None);
        assert!(hint.unwrap().contains("/leave"));

        assert_eq!(try_autocomplete("hello"), (None, None));
    }
}
