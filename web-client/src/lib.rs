//! Client side of the Task Tracker authentication subsystem.
//!
//! - [`store`]: paired token/principal persistence
//! - [`session`]: the `Loading -> Unauthenticated | Authenticated` state machine
//! - [`http`]: bearer attachment and 401 teardown for every REST call
//! - [`guard`]: gating of protected views
//! - [`channel`]: real-time channel handshake with a query-string credential

pub mod channel;
pub mod config;
pub mod credential;
pub mod error;
pub mod guard;
pub mod http;
pub mod session;
pub mod storage;
pub mod store;

use std::sync::Arc;

pub use channel::RealtimeChannel;
pub use config::ClientConfig;
pub use credential::Credential;
pub use error::{ClientError, SessionError, StoreError};
pub use guard::{GuardDecision, RouteGuard};
pub use http::ApiClient;
pub use session::{SessionManager, SessionState};
pub use store::CredentialStore;

/// The pieces a client application wires together, sharing one session.
pub struct Client {
    pub session: Arc<SessionManager>,
    pub api: ApiClient,
    pub channel: RealtimeChannel,
    pub guard: RouteGuard,
}

impl Client {
    /// Build from config and hydrate the session from the file store.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let storage = Arc::new(storage::FileStorage::new(&config.storage_path));
        let session = Arc::new(SessionManager::new(CredentialStore::new(storage)));
        session.hydrate();

        Ok(Self {
            api: ApiClient::new(&config.base_url, session.clone())?,
            channel: RealtimeChannel::new(&config.base_url, &config.realtime_path, session.clone())?,
            guard: RouteGuard::new(&config.sign_in_path),
            session,
        })
    }
}
