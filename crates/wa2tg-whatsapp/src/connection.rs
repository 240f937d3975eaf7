use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use wa2tg_core::Result;

use crate::session::Session;

/// Callbacks a transport may invoke from its own tasks, concurrently with the caller.
pub trait EventHandler: Send + Sync {
    fn handle_error(&self, err: &str);
}

/// Logs transport errors.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle_error(&self, err: &str) {
        tracing::warn!("WhatsApp error: {err}");
    }
}

/// An open transport handle.
#[async_trait]
pub trait Connection: Send + Sync {
    fn add_handler(&mut self, handler: Arc<dyn EventHandler>);

    /// Resume a saved session; returns the refreshed credentials.
    async fn restore_with_session(&mut self, session: Session) -> Result<Session>;

    /// Pairing handshake. Each scannable code is pushed into `codes`; dropping the
    /// sender without returning a session means the handshake failed.
    async fn login(&mut self, codes: mpsc::Sender<String>) -> Result<Session>;

    async fn disconnect(&mut self) -> Result<()>;
}

/// Factory for transport handles.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Connection>>;
}
