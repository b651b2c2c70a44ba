// web-client/src/error.rs

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("persisted session is corrupt: {0}")]
    Corrupt(String),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("credential is empty or an absence marker")]
    InvalidCredential,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// 401: the session has been torn down (unless a newer login superseded it)
    #[error("authentication rejected")]
    Unauthorized,

    /// 401 on the login call itself
    #[error("invalid username or password")]
    LoginRejected,

    /// 403: the session stays, only this action is denied
    #[error("permission denied: {0}")]
    Forbidden(String),

    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("server unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("real-time channel failed: {0}")]
    Channel(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// Connectivity problems; never a reason to drop the credential.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Channel(_))
    }
}
