use crate::domain::Message;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header sent once before the messages of a chat.
pub fn export_header(count: usize) -> String {
    format!("📱 WhatsApp Export ({count} messages)")
}

/// Render a message for display in Telegram (plain text, no parse mode).
pub fn format_message(msg: &Message) -> String {
    let timestamp = msg.timestamp.format(TIMESTAMP_FORMAT);
    let mut out = format!(
        "From: {} ({})\nTime: {}\n\n{}",
        msg.from_name, msg.from_address, timestamp, msg.text
    );

    if let Some(kind) = msg.media_kind.as_deref().filter(|k| !k.is_empty()) {
        out.push_str(&format!("\n\n[Contains {kind}]"));
    }

    out
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len.saturating_sub(3)).collect::<String>();
    out.push_str("...");
    out
}
