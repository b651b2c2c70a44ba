// web-client/src/channel.rs
//! Real-time channel connector.
//!
//! WebSocket handshakes cannot carry custom headers from every runtime, so the
//! credential travels as `?access_token=`. That parameter is only ever added
//! for the channel path; REST URLs never carry the token.

use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::credential::Credential;
use crate::error::ClientError;
use crate::session::SessionManager;

pub const ACCESS_TOKEN_PARAM: &str = "access_token";

pub type ChannelStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Whether `path` falls under the channel prefix (exactly, or as a sub-path).
pub fn is_channel_path(path: &str, channel_prefix: &str) -> bool {
    let prefix = channel_prefix.trim_end_matches('/');
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
        None => false,
    }
}

/// Resolve `path` against `base`, adding the credential as a query parameter
/// only for channel paths.
pub fn channel_url(
    base: &Url,
    path: &str,
    credential: Option<&Credential>,
    channel_prefix: &str,
) -> Result<Url, ClientError> {
    let mut url = base.join(path)?;
    if let Some(credential) = credential {
        if is_channel_path(url.path(), channel_prefix) {
            url.query_pairs_mut()
                .append_pair(ACCESS_TOKEN_PARAM, credential.as_str());
        }
    }
    Ok(url)
}

#[derive(Clone)]
pub struct RealtimeChannel {
    base_url: Url,
    path: String,
    session: Arc<SessionManager>,
}

impl RealtimeChannel {
    /// `base_url` is the REST base; `http`/`https` become `ws`/`wss`.
    pub fn new(base_url: &str, path: &str, session: Arc<SessionManager>) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        let scheme = match base_url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(ClientError::Channel(format!("unsupported scheme: {}", other))),
        };
        base_url
            .set_scheme(scheme)
            .map_err(|_| ClientError::Channel(format!("cannot switch {} to {}", base_url, scheme)))?;

        Ok(Self {
            base_url,
            path: path.to_string(),
            session,
        })
    }

    /// Handshake URL for the credential currently in the session.
    pub fn handshake_url(&self) -> Result<Url, ClientError> {
        channel_url(
            &self.base_url,
            &self.path,
            self.session.credential().as_ref(),
            &self.path,
        )
    }

    /// Open the channel. The credential is read fresh on every call, so a
    /// reconnect after re-login presents the new token.
    ///
    /// A 401 handshake rejection ends the session the same way a REST 401 does.
    pub async fn connect(&self) -> Result<ChannelStream, ClientError> {
        let sent = self.session.credential();
        let url = channel_url(&self.base_url, &self.path, sent.as_ref(), &self.path)?;

        tracing::debug!("Opening real-time channel at {}{}", self.base_url, self.path);
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                tracing::info!("Real-time channel connected");
                Ok(stream)
            }
            Err(WsError::Http(response)) if response.status().as_u16() == 401 => {
                if self.session.invalidate(sent.as_ref())? {
                    tracing::info!("Session ended after the channel handshake was rejected");
                }
                Err(ClientError::Unauthorized)
            }
            Err(WsError::Http(response)) if response.status().as_u16() == 403 => {
                Err(ClientError::Forbidden("real-time channel".to_string()))
            }
            Err(e) => {
                tracing::warn!("Real-time channel handshake failed: {}", e);
                Err(ClientError::Channel(e.to_string()))
            }
        }
    }
}
