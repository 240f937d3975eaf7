use std::sync::Arc;

use chrono::Utc;

use crate::{
    domain::{ChatId, MediaKind, Message},
    errors::{Error, ValidationError},
    formatting::{export_header, format_message, truncate_text},
    messaging::{
        port::MessagingPort,
        types::{BotIdentity, MediaUpload},
    },
    Result,
};

pub const PROBE_TEXT: &str = "🔄 Testing connection...";

/// Parse the configured target chat.
///
/// Anything that is not a plain (optionally negative) integer is rejected instead of
/// silently addressing chat 0.
pub fn parse_chat_id(raw: &str) -> Result<ChatId> {
    let trimmed = raw.trim();
    trimmed
        .parse::<i64>()
        .ok()
        .filter(|id| *id != 0)
        .map(ChatId)
        .ok_or_else(|| ValidationError::InvalidChatId(raw.to_string()).into())
}

/// Counters for one `export_messages` run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub messages_sent: usize,
    pub media_sent: usize,
    pub media_skipped: usize,
}

/// Telegram-side client: a messenger plus the chat everything goes to.
pub struct Destination {
    messenger: Arc<dyn MessagingPort>,
    chat_id: ChatId,
}

impl Destination {
    pub fn new(messenger: Arc<dyn MessagingPort>, chat_id: &str) -> Result<Self> {
        Ok(Self {
            messenger,
            chat_id: parse_chat_id(chat_id)?,
        })
    }

    /// Check the bot credential, then prove the target chat accepts messages.
    pub async fn validate(&self) -> Result<BotIdentity> {
        let me = self
            .messenger
            .whoami()
            .await
            .map_err(|e| ValidationError::InvalidCredential(e.to_string()))?;

        self.messenger
            .send_text(self.chat_id, PROBE_TEXT)
            .await
            .map_err(|e| ValidationError::InvalidDestination(e.to_string()))?;

        Ok(me)
    }

    /// One send per call. Texts over the platform limit are rejected by the platform.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        self.messenger
            .send_text(self.chat_id, text)
            .await
            .map_err(|e| Error::Send(format!("error sending message: {e}")))?;
        Ok(())
    }

    /// Upload media bytes. The kind is checked before anything touches the network.
    pub async fn send_media(&self, kind: &str, bytes: Vec<u8>, caption: &str) -> Result<()> {
        let kind: MediaKind = kind.parse()?;
        let caps = self.messenger.capabilities();
        if !caps.supports_media {
            return Err(Error::Send(format!(
                "messenger cannot upload {kind} files"
            )));
        }

        let caption = if caption.trim().is_empty() {
            None
        } else {
            Some(truncate_text(caption, caps.max_caption_len))
        };
        let upload = MediaUpload {
            kind,
            // Second granularity; unique as long as sends stay sequential and paced.
            file_name: format!("media_{}", Utc::now().timestamp()),
            bytes,
            caption,
        };

        self.messenger
            .send_media(self.chat_id, upload)
            .await
            .map_err(|e| Error::Send(format!("error sending media: {e}")))?;
        Ok(())
    }

    /// Send a header and then every message in the order given.
    ///
    /// Text failures abort the export. Media failures are logged and skipped.
    /// Callers that care about chronological order must sort beforehand.
    pub async fn export_messages(
        &self,
        messages: &[Message],
        include_media: bool,
    ) -> Result<ExportStats> {
        let mut stats = ExportStats::default();
        self.send_message(&export_header(messages.len())).await?;

        for msg in messages {
            self.send_message(&format_message(msg)).await?;
            stats.messages_sent += 1;

            if !include_media {
                continue;
            }

            match (msg.media_kind.as_deref(), msg.media_bytes()) {
                (Some(kind), Some(bytes)) => {
                    match self.send_media(kind, bytes.to_vec(), "").await {
                        Ok(()) => stats.media_sent += 1,
                        Err(e) => {
                            tracing::warn!(message_id = %msg.id, "failed to send media: {e}");
                            stats.media_skipped += 1;
                        }
                    }
                }
                (None, Some(_)) => {
                    tracing::warn!(message_id = %msg.id, "media bytes without a media type, skipping");
                    stats.media_skipped += 1;
                }
                (kind, None) if msg.declares_media() => {
                    let kind = kind.unwrap_or_default();
                    tracing::warn!(message_id = %msg.id, kind, "message has no media data, skipping");
                    stats.media_skipped += 1;
                }
                _ => {}
            }
        }

        Ok(stats)
    }
}
