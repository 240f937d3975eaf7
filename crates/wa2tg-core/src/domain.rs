use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};

use crate::errors::Error;

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a delivered Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// A message read from the source chat.
///
/// Produced by the source client and consumed read-only by the destination.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub from_name: String,
    /// Phone number or JID of the sender.
    pub from_address: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub media_kind: Option<String>,
    pub media_url: Option<String>,
    pub media_data: Option<Vec<u8>>,
}

impl Message {
    /// Media bytes, if the source actually delivered any.
    pub fn media_bytes(&self) -> Option<&[u8]> {
        self.media_data.as_deref().filter(|b| !b.is_empty())
    }

    pub fn declares_media(&self) -> bool {
        self.media_kind.as_deref().is_some_and(|k| !k.is_empty())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
        }
    }
}

impl FromStr for MediaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            "document" => Ok(MediaKind::Document),
            other => Err(Error::UnsupportedMediaKind(other.to_string())),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive time window used to select messages for an export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kind_parses_known_kinds() {
        for kind in ["image", "video", "audio", "document"] {
            let parsed: MediaKind = kind.parse().unwrap();
            assert_eq!(parsed.as_str(), kind);
        }
    }

    #[test]
    fn media_kind_rejects_unknown() {
        let err = "sticker".parse::<MediaKind>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedMediaKind(k) if k == "sticker"));
    }

    #[test]
    fn empty_media_bytes_count_as_absent() {
        let msg = Message {
            media_kind: Some("image".to_string()),
            media_data: Some(Vec::new()),
            ..Default::default()
        };
        assert!(msg.declares_media());
        assert!(msg.media_bytes().is_none());
    }
}
