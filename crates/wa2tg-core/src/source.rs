use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    domain::{DateRange, Message},
    Result,
};

/// Lifecycle of a source chat client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourceState {
    #[default]
    Disconnected,
    Connected,
    Authenticated,
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceState::Disconnected => "disconnected",
            SourceState::Connected => "connected",
            SourceState::Authenticated => "authenticated",
        })
    }
}

/// Port for the chat platform messages are read from (WhatsApp).
#[async_trait]
pub trait ChatSource: Send + Sync {
    async fn state(&self) -> SourceState;

    /// Open the transport and try to restore a saved session.
    ///
    /// A failed restore is not an error: the client stays `Connected` and
    /// `login` must be called.
    async fn connect(&self) -> Result<()>;

    /// Run the pairing handshake, streaming each scannable code into `codes`.
    async fn login(&self, codes: mpsc::Sender<String>) -> Result<()>;

    /// Safe to call in any state, any number of times.
    async fn disconnect(&self) -> Result<()>;

    async fn get_chats(&self) -> Result<Vec<String>>;

    async fn get_messages(&self, chat_id: &str, range: DateRange) -> Result<Vec<Message>>;
}
