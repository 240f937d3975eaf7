/// Core error type for the exporter.
///
/// Adapter crates should map their specific errors into this type so the CLI
/// can report failures consistently.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("login error: {0}")]
    Login(String),

    /// Recovered inside `connect`; callers never see it.
    #[error("session restore failed: {0}")]
    SessionRestore(String),

    #[error("not connected, call connect first")]
    NotConnected,

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("send failed: {0}")]
    Send(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaKind(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("external error: {0}")]
    External(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap with a description of what was being attempted.
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, past any context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid bot token: {0}")]
    InvalidCredential(String),

    #[error("invalid chat ID: {0}")]
    InvalidDestination(String),

    #[error("chat ID must be numeric, got {0:?}")]
    InvalidChatId(String),

    #[error("{0} not configured. Please set it in the config file")]
    MissingSetting(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_prefixes_message_and_keeps_root() {
        let err = Error::NotImplemented("history")
            .context("error getting messages")
            .context("error exporting chat");

        assert_eq!(
            err.to_string(),
            "error exporting chat: error getting messages: not implemented: history"
        );
        assert!(matches!(err.root(), Error::NotImplemented("history")));
    }
}
