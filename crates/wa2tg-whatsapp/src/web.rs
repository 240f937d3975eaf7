use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::mpsc;

use wa2tg_core::{errors::Error, Result};

use crate::{
    connection::{Connection, Connector, EventHandler},
    session::Session,
};

/// Transport against the WhatsApp Web endpoint.
///
/// Only the transport-level handshake is performed. Device pairing and session
/// resumption need the end-to-end encrypted multi-device protocol, which this
/// transport does not speak, so both report failure and callers fall back to the
/// documented capability gap.
#[derive(Clone, Debug)]
pub struct WebConnector {
    http: reqwest::Client,
    endpoint: String,
}

impl WebConnector {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::Connection(format!("error building http client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Connector for WebConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>> {
        let resp = self
            .http
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| Error::Connection(format!("error creating connection: {e}")))?;

        if resp.status().is_server_error() {
            return Err(Error::Connection(format!(
                "{} answered {}",
                self.endpoint,
                resp.status()
            )));
        }

        tracing::debug!(endpoint = %self.endpoint, status = %resp.status(), "transport reachable");
        Ok(Box::new(WebConnection::default()))
    }
}

#[derive(Default)]
pub struct WebConnection {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl WebConnection {
    fn report(&self, err: &str) {
        for h in &self.handlers {
            h.handle_error(err);
        }
    }
}

#[async_trait]
impl Connection for WebConnection {
    fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    async fn restore_with_session(&mut self, _session: Session) -> Result<Session> {
        Err(Error::SessionRestore(
            "multi-device session resumption is not supported by the web transport".to_string(),
        ))
    }

    async fn login(&mut self, codes: mpsc::Sender<String>) -> Result<Session> {
        drop(codes);
        let msg = "pairing handshake closed without a session: \
                   device pairing is not supported by the web transport";
        self.report(msg);
        Err(Error::Login(msg.to_string()))
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.handlers.clear();
        Ok(())
    }
}
