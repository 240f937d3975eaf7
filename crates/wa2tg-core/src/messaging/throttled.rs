use std::sync::Arc;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::{
        port::MessagingPort,
        types::{BotIdentity, MediaUpload, MessagingCapabilities},
    },
    pacing::Pacer,
    Result,
};

/// MessagingPort decorator that paces outbound sends.
///
/// This is a best-effort defense against Telegram 429 errors during long exports.
/// Credential probes are not paced.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    pacer: Arc<dyn Pacer>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, pacer: Arc<dyn Pacer>) -> Self {
        Self { inner, pacer }
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn whoami(&self) -> Result<BotIdentity> {
        self.inner.whoami().await
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        self.pacer.pace().await;
        self.inner.send_text(chat_id, text).await
    }

    async fn send_media(&self, chat_id: ChatId, media: MediaUpload) -> Result<MessageRef> {
        self.pacer.pace().await;
        self.inner.send_media(chat_id, media).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingPacer {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Pacer for CountingPacer {
        async fn pace(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct RecordingMessenger {
        texts: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl MessagingPort for RecordingMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                supports_media: true,
                max_caption_len: 1024,
            }
        }

        async fn whoami(&self) -> Result<BotIdentity> {
            Ok(BotIdentity {
                id: 1,
                username: None,
            })
        }

        async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
            self.texts.lock().unwrap().push(text.to_string());
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }

        async fn send_media(&self, chat_id: ChatId, _media: MediaUpload) -> Result<MessageRef> {
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(2),
            })
        }
    }

    #[tokio::test]
    async fn paces_sends_but_not_probes() {
        let inner = Arc::new(RecordingMessenger::default());
        let pacer = Arc::new(CountingPacer::default());
        let throttled = ThrottledMessenger::new(inner.clone(), pacer.clone());

        throttled.whoami().await.unwrap();
        throttled.send_text(ChatId(7), "a").await.unwrap();
        throttled.send_text(ChatId(7), "b").await.unwrap();

        assert_eq!(pacer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(*inner.texts.lock().unwrap(), vec!["a", "b"]);
    }
}
