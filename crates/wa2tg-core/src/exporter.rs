use std::{
    io::{self, Write},
    sync::Arc,
    time::Duration,
};

use tokio::sync::mpsc;

use crate::{
    config::{Config, DATE_FORMAT},
    destination::{Destination, ExportStats},
    errors::Error,
    messaging::types::BotIdentity,
    pacing::Pacer,
    source::{ChatSource, SourceState},
    Result,
};

/// Pairing codes are small and produced slowly; a short buffer is enough.
const PAIRING_CODE_BUFFER: usize = 4;

/// Outcome of an export over every chat.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportAllSummary {
    pub exported: Vec<String>,
    /// Chat id and the error that stopped it.
    pub failed: Vec<(String, String)>,
}

/// Run the source pairing handshake with a bounded wait.
///
/// Codes are handed to `on_code` from a separate task as soon as the source produces
/// them; the task drains the channel until the source drops its sender.
pub async fn login_source(
    source: &dyn ChatSource,
    timeout: Duration,
    mut on_code: impl FnMut(String) + Send + 'static,
) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<String>(PAIRING_CODE_BUFFER);
    let printer = tokio::spawn(async move {
        while let Some(code) = rx.recv().await {
            on_code(code);
        }
    });

    let outcome = tokio::time::timeout(timeout, source.login(tx)).await;
    let _ = printer.await;

    match outcome {
        Ok(res) => res,
        Err(_) => Err(Error::Login(format!(
            "no pairing response within {}s",
            timeout.as_secs()
        ))),
    }
}

/// Wires the configured source and destination into export workflows.
pub struct Exporter {
    cfg: Arc<Config>,
    source: Arc<dyn ChatSource>,
    destination: Destination,
    chat_pacer: Arc<dyn Pacer>,
}

impl Exporter {
    pub fn new(
        cfg: Arc<Config>,
        source: Arc<dyn ChatSource>,
        destination: Destination,
        chat_pacer: Arc<dyn Pacer>,
    ) -> Self {
        Self {
            cfg,
            source,
            destination,
            chat_pacer,
        }
    }

    pub async fn connect(&self) -> Result<SourceState> {
        self.source.connect().await?;
        Ok(self.source.state().await)
    }

    pub async fn login(&self) -> Result<()> {
        login_source(
            self.source.as_ref(),
            self.cfg.whatsapp.login_timeout(),
            pairing_code_printer(),
        )
        .await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.source.disconnect().await
    }

    pub async fn validate_destination(&self) -> Result<BotIdentity> {
        self.destination.validate().await
    }

    pub async fn list_chats(&self) -> Result<Vec<String>> {
        self.source.get_chats().await
    }

    /// Export one chat. Any failure aborts this chat.
    pub async fn export_chat(&self, chat_id: &str) -> Result<ExportStats> {
        let range = self.cfg.export.parse_date_range()?;

        tracing::info!(
            chat = chat_id,
            "fetching messages from WhatsApp (from {} to {})",
            range.from.format(DATE_FORMAT),
            range.to.format(DATE_FORMAT)
        );
        let messages = self
            .source
            .get_messages(chat_id, range)
            .await
            .map_err(|e| e.context("error getting messages"))?;

        tracing::info!(chat = chat_id, "exporting {} messages to Telegram", messages.len());
        let stats = self
            .destination
            .export_messages(&messages, self.cfg.export.include_media)
            .await
            .map_err(|e| e.context("error exporting messages"))?;

        tracing::info!(
            chat = chat_id,
            sent = stats.messages_sent,
            media = stats.media_sent,
            skipped = stats.media_skipped,
            "export completed"
        );
        Ok(stats)
    }

    /// Export every chat, continuing past chats that fail.
    pub async fn export_all_chats(&self) -> Result<ExportAllSummary> {
        let chats = self
            .list_chats()
            .await
            .map_err(|e| e.context("error listing chats"))?;

        let mut summary = ExportAllSummary::default();
        for chat in chats {
            self.chat_pacer.pace().await;
            tracing::info!(chat = %chat, "exporting chat");
            match self.export_chat(&chat).await {
                Ok(_) => summary.exported.push(chat),
                Err(e) => {
                    tracing::warn!(chat = %chat, "error exporting chat: {e}");
                    summary.failed.push((chat, e.to_string()));
                }
            }
        }

        Ok(summary)
    }
}

/// Pairing-code sink for the terminal: one scan prompt, then every code as it arrives.
pub fn pairing_code_printer() -> impl FnMut(String) + Send + 'static {
    pairing_code_writer(io::stdout())
}

fn pairing_code_writer<W>(mut out: W) -> impl FnMut(String) + Send + 'static
where
    W: Write + Send + 'static,
{
    let mut prompted = false;
    move |code| {
        if !prompted {
            prompted = true;
            let _ = writeln!(out, "Please scan the QR code with your WhatsApp app:");
        }
        let _ = writeln!(out, "{code}");
        let _ = out.flush();
    }
}
