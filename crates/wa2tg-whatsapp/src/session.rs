use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use wa2tg_core::{errors::Error, Result};

/// Credentials returned by a successful pairing or restore.
///
/// Opaque to everything outside the WhatsApp client.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub client_id: String,
    pub client_token: String,
    pub server_token: String,
    pub enc_key: Vec<u8>,
    pub mac_key: Vec<u8>,
    /// Own account JID.
    pub wid: String,
}

/// Single-file persistence for [`Session`].
#[derive(Clone, Debug)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Any read or decode problem means "no usable session".
    pub fn load(&self) -> Result<Session> {
        let bytes = fs::read(&self.path).map_err(|e| {
            Error::SessionRestore(format!(
                "error opening session file {}: {e}",
                self.path.display()
            ))
        })?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::SessionRestore(format!("error decoding session: {e}")))
    }

    /// Overwrite the session file. Written to a sibling temp file first so a crash
    /// never leaves a half-written blob behind.
    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let bytes = serde_json::to_vec(session)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            client_id: "cid".to_string(),
            client_token: "ctok".to_string(),
            server_token: "stok".to_string(),
            enc_key: vec![1, 2, 3],
            mac_key: vec![4, 5, 6],
            wid: "4915550000@c.us".to_string(),
        }
    }

    #[test]
    fn saved_session_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested/session.gob"));

        store.save(&session()).unwrap();

        assert_eq!(store.load().unwrap(), session());
    }

    #[test]
    fn truncated_file_is_a_restore_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.gob"));
        store.save(&session()).unwrap();
        let bytes = fs::read(store.path()).unwrap();
        fs::write(store.path(), &bytes[..bytes.len() / 2]).unwrap();

        assert!(matches!(store.load(), Err(Error::SessionRestore(_))));
    }

    #[test]
    fn missing_file_is_a_restore_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("absent.gob"));

        assert!(matches!(store.load(), Err(Error::SessionRestore(_))));
    }
}
