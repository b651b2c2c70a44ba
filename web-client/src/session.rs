// web-client/src/session.rs
//! Session state machine.
//!
//! ```text
//! Loading --hydrate--> Unauthenticated | Authenticated
//! Unauthenticated --login--> Authenticated
//! Authenticated --logout / invalidate--> Unauthenticated
//! ```
//!
//! Storage and the published state change under one lock, so the credential
//! and the principal are never observed half-set.

use std::sync::{Mutex, MutexGuard, PoisonError};
use common::Principal;
use tokio::sync::watch;

use crate::credential::Credential;
use crate::error::SessionError;
use crate::store::CredentialStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Persisted state not read yet; callers wait instead of deciding.
    Loading,
    Unauthenticated,
    Authenticated(Principal),
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            SessionState::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }
}

struct Inner {
    credential: Option<Credential>,
    hydrated: bool,
}

pub struct SessionManager {
    store: CredentialStore,
    inner: Mutex<Inner>,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    pub fn new(store: CredentialStore) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self {
            store,
            inner: Mutex::new(Inner {
                credential: None,
                hydrated: false,
            }),
            state,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Credential to present on the next outbound call, if any.
    pub fn credential(&self) -> Option<Credential> {
        self.lock().credential.clone()
    }

    /// Read the persisted pair once. Later calls return the current state.
    pub fn hydrate(&self) -> SessionState {
        let mut inner = self.lock();
        if inner.hydrated {
            return self.state();
        }
        inner.hydrated = true;

        let next = match self.store.load() {
            Ok(Some((credential, principal))) => {
                inner.credential = Some(credential);
                SessionState::Authenticated(principal)
            }
            Ok(None) => {
                inner.credential = None;
                SessionState::Unauthenticated
            }
            Err(e) => {
                tracing::warn!("Discarding persisted session: {}", e);
                if let Err(e) = self.store.clear() {
                    tracing::warn!("Failed to clear persisted session: {}", e);
                }
                inner.credential = None;
                SessionState::Unauthenticated
            }
        };

        tracing::debug!("Session hydrated: authenticated={}", next.is_authenticated());
        self.state.send_replace(next.clone());
        next
    }

    /// Resolves once the state has left `Loading`.
    pub async fn ready(&self) -> SessionState {
        let mut rx = self.subscribe();
        let state = match rx.wait_for(|state| !state.is_loading()).await {
            Ok(state) => state.clone(),
            // Sender lives as long as self
            Err(_) => self.state(),
        };
        state
    }

    /// Store a freshly issued token with its principal.
    ///
    /// On error nothing is changed.
    pub fn login(&self, token: &str, principal: Principal) -> Result<(), SessionError> {
        let credential = Credential::parse(token)?;

        let mut inner = self.lock();
        self.store.save(&credential, &principal)?;
        inner.credential = Some(credential);
        inner.hydrated = true;

        tracing::info!("Signed in as principal {} ({})", principal.id, principal.role);
        self.state.send_replace(SessionState::Authenticated(principal));
        Ok(())
    }

    /// Local sign-out. Idempotent and independent of the network.
    ///
    /// The in-memory session always ends. An error means the persisted pair
    /// could not be removed and would come back on the next start; calling
    /// `logout` again retries the removal.
    pub fn logout(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        self.teardown(&mut inner)
    }

    /// Forced teardown after the server rejected `rejected`.
    ///
    /// Only tears down while `rejected` is still the current credential; a
    /// rejection of a credential already replaced by a newer login is ignored.
    /// Returns whether the session was cleared. Storage failures are reported
    /// the same way as for [`logout`](Self::logout).
    pub fn invalidate(&self, rejected: Option<&Credential>) -> Result<bool, SessionError> {
        let mut inner = self.lock();

        if inner.credential.as_ref() != rejected {
            tracing::debug!("Ignoring rejection of a superseded credential");
            return Ok(false);
        }
        if rejected.is_none() && !inner.hydrated {
            // Nothing was presented and nothing is loaded yet; hydrate decides
            return Ok(false);
        }

        tracing::info!("Credential rejected by server; clearing session");
        self.teardown(&mut inner)?;
        Ok(true)
    }

    fn teardown(&self, inner: &mut Inner) -> Result<(), SessionError> {
        inner.credential = None;
        inner.hydrated = true;
        self.state.send_replace(SessionState::Unauthenticated);

        self.store.clear().map_err(|e| {
            tracing::error!("Failed to clear persisted session: {}", e);
            SessionError::from(e)
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
