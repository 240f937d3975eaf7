//! Telegram adapter (teloxide).
//!
//! This crate implements the `wa2tg-core` MessagingPort over the Telegram Bot API.

use async_trait::async_trait;

use teloxide::{prelude::*, types::InputFile};

use tokio::time::sleep;

use wa2tg_core::{
    domain::{ChatId, MediaKind, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{BotIdentity, MediaUpload, MessagingCapabilities},
    },
    Result,
};

const MAX_CAPTION_LEN: usize = 1024;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn from_token(token: &str) -> Self {
        Self::new(Bot::new(token))
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn msg_ref(chat_id: ChatId, msg: &teloxide::types::Message) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        }
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        tracing::warn!("telegram asked to retry after {d:?}");
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_media: true,
            max_caption_len: MAX_CAPTION_LEN,
        }
    }

    async fn whoami(&self) -> Result<BotIdentity> {
        let me = self.with_retry(|| self.bot.get_me()).await?;
        Ok(BotIdentity {
            id: me.user.id.0,
            username: me.user.username.clone(),
        })
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| self.bot.send_message(Self::tg_chat(chat_id), text.to_string()))
            .await?;
        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn send_media(&self, chat_id: ChatId, media: MediaUpload) -> Result<MessageRef> {
        let chat = Self::tg_chat(chat_id);
        let file = || InputFile::memory(media.bytes.clone()).file_name(media.file_name.clone());
        let caption = media.caption.as_deref();

        let msg = match media.kind {
            MediaKind::Image => {
                self.with_retry(|| {
                    with_caption(self.bot.send_photo(chat, file()), caption, |r, c| r.caption(c))
                })
                .await?
            }
            MediaKind::Video => {
                self.with_retry(|| {
                    with_caption(self.bot.send_video(chat, file()), caption, |r, c| r.caption(c))
                })
                .await?
            }
            MediaKind::Audio => {
                self.with_retry(|| {
                    with_caption(self.bot.send_audio(chat, file()), caption, |r, c| r.caption(c))
                })
                .await?
            }
            MediaKind::Document => {
                self.with_retry(|| {
                    with_caption(self.bot.send_document(chat, file()), caption, |r, c| {
                        r.caption(c)
                    })
                })
                .await?
            }
        };

        Ok(Self::msg_ref(chat_id, &msg))
    }
}

/// Set a caption on an upload request only when there is one.
fn with_caption<R>(req: R, caption: Option<&str>, set: impl FnOnce(R, String) -> R) -> R {
    match caption {
        Some(c) => set(req, c.to_string()),
        None => req,
    }
}
