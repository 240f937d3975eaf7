use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{BotIdentity, MediaUpload, MessagingCapabilities},
    Result,
};

/// Outbound messenger port.
///
/// Telegram is the only implementation; the destination client and the exporter
/// only ever talk to this trait, which keeps them testable without a network.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// "Who am I" probe for the configured credential.
    async fn whoami(&self) -> Result<BotIdentity>;

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    async fn send_media(&self, chat_id: ChatId, media: MediaUpload) -> Result<MessageRef>;
}
