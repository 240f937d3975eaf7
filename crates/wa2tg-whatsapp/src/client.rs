use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use wa2tg_core::{
    domain::{DateRange, Message},
    errors::Error,
    source::{ChatSource, SourceState},
    Result,
};

use crate::{
    connection::{Connection, Connector, LoggingHandler},
    session::SessionStore,
};

#[derive(Default)]
struct ClientState {
    conn: Option<Box<dyn Connection>>,
    authenticated: bool,
}

/// WhatsApp implementation of [`ChatSource`].
///
/// disconnected -> connected (transport open) -> authenticated (session restored or paired).
pub struct WhatsAppClient {
    connector: Arc<dyn Connector>,
    store: SessionStore,
    state: Mutex<ClientState>,
}

impl WhatsAppClient {
    pub fn new(connector: Arc<dyn Connector>, store: SessionStore) -> Self {
        Self {
            connector,
            store,
            state: Mutex::new(ClientState::default()),
        }
    }

    async fn restore_session(&self, conn: &mut dyn Connection) -> Result<()> {
        let session = self.store.load()?;
        let refreshed = conn
            .restore_with_session(session)
            .await
            .map_err(|e| Error::SessionRestore(format!("error restoring session: {e}")))?;
        self.store
            .save(&refreshed)
            .map_err(|e| Error::SessionRestore(format!("error saving restored session: {e}")))
    }
}

#[async_trait]
impl ChatSource for WhatsAppClient {
    async fn state(&self) -> SourceState {
        let st = self.state.lock().await;
        match (&st.conn, st.authenticated) {
            (None, _) => SourceState::Disconnected,
            (Some(_), false) => SourceState::Connected,
            (Some(_), true) => SourceState::Authenticated,
        }
    }

    async fn connect(&self) -> Result<()> {
        let mut conn = self.connector.connect().await.map_err(|e| match e {
            Error::Connection(_) => e,
            other => Error::Connection(format!("error creating connection: {other}")),
        })?;
        conn.add_handler(Arc::new(LoggingHandler));

        let authenticated = match self.restore_session(&mut *conn).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("session restore failed, new login required: {e}");
                false
            }
        };

        let mut st = self.state.lock().await;
        if let Some(mut previous) = st.conn.take() {
            let _ = previous.disconnect().await;
        }
        st.conn = Some(conn);
        st.authenticated = authenticated;
        Ok(())
    }

    async fn login(&self, codes: mpsc::Sender<String>) -> Result<()> {
        let mut st = self.state.lock().await;
        let conn = st.conn.as_mut().ok_or(Error::NotConnected)?;

        let session = conn.login(codes).await.map_err(|e| match e {
            Error::Login(_) => e,
            other => Error::Login(format!("error during login: {other}")),
        })?;
        self.store
            .save(&session)
            .map_err(|e| Error::Login(format!("error saving session: {e}")))?;

        st.authenticated = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let mut st = self.state.lock().await;
        st.authenticated = false;
        match st.conn.take() {
            Some(mut conn) => conn.disconnect().await,
            None => Ok(()),
        }
    }

    async fn get_chats(&self) -> Result<Vec<String>> {
        // The transport only pushes live messages; there is no chat directory to pull.
        Err(Error::NotImplemented(
            "chat listing is not supported by the WhatsApp transport",
        ))
    }

    async fn get_messages(&self, _chat_id: &str, _range: DateRange) -> Result<Vec<Message>> {
        Err(Error::NotImplemented(
            "message history retrieval is not supported by the WhatsApp transport",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connection::EventHandler, session::Session};
    use chrono::Utc;
    use std::{
        fs,
        sync::atomic::{AtomicUsize, Ordering},
    };

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum LoginOutcome {
        Paired,
        ChannelClosed,
    }

    struct FakeConnection {
        accept_restore: bool,
        login: LoginOutcome,
        disconnects: Arc<AtomicUsize>,
        handlers: Vec<Arc<dyn EventHandler>>,
    }

    #[async_trait]
    impl Connection for FakeConnection {
        fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
            self.handlers.push(handler);
        }

        async fn restore_with_session(&mut self, session: Session) -> Result<Session> {
            if !self.accept_restore {
                return Err(Error::External("session rejected".to_string()));
            }
            Ok(Session {
                server_token: format!("{}-refreshed", session.server_token),
                ..session
            })
        }

        async fn login(&mut self, codes: mpsc::Sender<String>) -> Result<Session> {
            assert_eq!(self.handlers.len(), 1);
            let _ = codes.send("2@qr-payload".to_string()).await;
            match self.login {
                LoginOutcome::Paired => Ok(paired_session()),
                LoginOutcome::ChannelClosed => {
                    drop(codes);
                    Err(Error::Login("qr channel closed".to_string()))
                }
            }
        }

        async fn disconnect(&mut self) -> Result<()> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeConnector {
        reachable: bool,
        accept_restore: bool,
        login: LoginOutcome,
        disconnects: Arc<AtomicUsize>,
    }

    impl FakeConnector {
        fn new(accept_restore: bool, login: LoginOutcome) -> Self {
            Self {
                reachable: true,
                accept_restore,
                login,
                disconnects: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Connector for FakeConnector {
        async fn connect(&self) -> Result<Box<dyn Connection>> {
            if !self.reachable {
                return Err(Error::External("network unreachable".to_string()));
            }
            Ok(Box::new(FakeConnection {
                accept_restore: self.accept_restore,
                login: self.login,
                disconnects: self.disconnects.clone(),
                handlers: Vec::new(),
            }))
        }
    }

    fn paired_session() -> Session {
        Session {
            client_id: "client".to_string(),
            server_token: "server".to_string(),
            wid: "100@c.us".to_string(),
            ..Default::default()
        }
    }

    fn client(
        connector: FakeConnector,
        dir: &tempfile::TempDir,
    ) -> (WhatsAppClient, SessionStore) {
        let store = SessionStore::new(dir.path().join("whatsapp_session.gob"));
        (
            WhatsAppClient::new(Arc::new(connector), store.clone()),
            store,
        )
    }

    fn window() -> DateRange {
        DateRange {
            from: chrono::DateTime::<Utc>::UNIX_EPOCH,
            to: Utc::now(),
        }
    }

    #[tokio::test]
    async fn corrupted_session_leaves_client_connected() {
        let dir = tempfile::tempdir().unwrap();
        let (wa, store) = client(FakeConnector::new(true, LoginOutcome::Paired), &dir);
        fs::write(store.path(), b"{\"client_id\": \"trunc").unwrap();

        wa.connect().await.unwrap();

        assert_eq!(wa.state().await, SourceState::Connected);
    }

    #[tokio::test]
    async fn missing_session_leaves_client_connected() {
        let dir = tempfile::tempdir().unwrap();
        let (wa, _) = client(FakeConnector::new(true, LoginOutcome::Paired), &dir);

        wa.connect().await.unwrap();

        assert_eq!(wa.state().await, SourceState::Connected);
    }

    #[tokio::test]
    async fn rejected_session_leaves_client_connected() {
        let dir = tempfile::tempdir().unwrap();
        let (wa, store) = client(FakeConnector::new(false, LoginOutcome::Paired), &dir);
        store.save(&paired_session()).unwrap();

        wa.connect().await.unwrap();

        assert_eq!(wa.state().await, SourceState::Connected);
    }

    #[tokio::test]
    async fn valid_session_is_restored_and_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let (wa, store) = client(FakeConnector::new(true, LoginOutcome::Paired), &dir);
        store.save(&paired_session()).unwrap();

        wa.connect().await.unwrap();

        assert_eq!(wa.state().await, SourceState::Authenticated);
        assert_eq!(store.load().unwrap().server_token, "server-refreshed");
    }

    #[tokio::test]
    async fn unreachable_transport_is_a_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut connector = FakeConnector::new(true, LoginOutcome::Paired);
        connector.reachable = false;
        let (wa, _) = client(connector, &dir);

        let err = wa.connect().await.unwrap_err();

        assert!(matches!(err, Error::Connection(_)));
        assert_eq!(wa.state().await, SourceState::Disconnected);
    }

    #[tokio::test]
    async fn login_requires_connection() {
        let dir = tempfile::tempdir().unwrap();
        let (wa, _) = client(FakeConnector::new(true, LoginOutcome::Paired), &dir);
        let (tx, _rx) = mpsc::channel(1);

        assert!(matches!(wa.login(tx).await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn login_persists_session_and_authenticates() {
        let dir = tempfile::tempdir().unwrap();
        let (wa, store) = client(FakeConnector::new(true, LoginOutcome::Paired), &dir);
        wa.connect().await.unwrap();
        let (tx, mut rx) = mpsc::channel(4);

        wa.login(tx).await.unwrap();

        assert_eq!(rx.recv().await.as_deref(), Some("2@qr-payload"));
        assert_eq!(rx.recv().await, None);
        assert_eq!(wa.state().await, SourceState::Authenticated);
        assert_eq!(store.load().unwrap(), paired_session());
    }

    #[tokio::test]
    async fn closed_handshake_is_a_login_error() {
        let dir = tempfile::tempdir().unwrap();
        let (wa, store) = client(FakeConnector::new(true, LoginOutcome::ChannelClosed), &dir);
        wa.connect().await.unwrap();
        let (tx, _rx) = mpsc::channel(4);

        let err = wa.login(tx).await.unwrap_err();

        assert!(matches!(err, Error::Login(_)));
        assert_eq!(wa.state().await, SourceState::Connected);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn history_is_not_implemented_in_any_state() {
        let dir = tempfile::tempdir().unwrap();
        let (wa, store) = client(FakeConnector::new(true, LoginOutcome::Paired), &dir);

        assert!(matches!(wa.get_chats().await, Err(Error::NotImplemented(_))));
        assert!(matches!(
            wa.get_messages("chat", window()).await,
            Err(Error::NotImplemented(_))
        ));

        wa.connect().await.unwrap();
        assert_eq!(wa.state().await, SourceState::Connected);
        assert!(matches!(wa.get_chats().await, Err(Error::NotImplemented(_))));

        store.save(&paired_session()).unwrap();
        wa.connect().await.unwrap();
        assert_eq!(wa.state().await, SourceState::Authenticated);
        assert!(matches!(wa.get_chats().await, Err(Error::NotImplemented(_))));
        assert!(matches!(
            wa.get_messages("chat", window()).await,
            Err(Error::NotImplemented(_))
        ));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let connector = FakeConnector::new(true, LoginOutcome::Paired);
        let disconnects = connector.disconnects.clone();
        let (wa, _) = client(connector, &dir);

        wa.disconnect().await.unwrap();
        wa.connect().await.unwrap();
        wa.disconnect().await.unwrap();
        wa.disconnect().await.unwrap();

        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(wa.state().await, SourceState::Disconnected);
    }
}
