// web-client/src/store.rs
use std::sync::Arc;
use common::Principal;

use crate::credential::Credential;
use crate::error::StoreError;
use crate::storage::Storage;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// The token and its principal, always written and cleared together.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn Storage>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// `Ok(None)` when nothing is stored. Any half-present or unparseable
    /// pair is reported as corruption and must not be trusted.
    pub fn load(&self) -> Result<Option<(Credential, Principal)>, StoreError> {
        let token = self.storage.read(TOKEN_KEY)?;
        let user = self.storage.read(USER_KEY)?;

        match (token, user) {
            (None, None) => Ok(None),
            (Some(token), Some(user)) => {
                let credential = Credential::parse(&token).map_err(|_| {
                    StoreError::Corrupt("stored token is empty or an absence marker".to_string())
                })?;
                let principal = Principal::from_json(&user)
                    .map_err(|e| StoreError::Corrupt(format!("stored principal: {}", e)))?;
                Ok(Some((credential, principal)))
            }
            (Some(_), None) => Err(StoreError::Corrupt("token stored without principal".to_string())),
            (None, Some(_)) => Err(StoreError::Corrupt("principal stored without token".to_string())),
        }
    }

    pub fn save(&self, credential: &Credential, principal: &Principal) -> Result<(), StoreError> {
        let user = principal.to_json()?;
        self.storage.write_all(&[
            (TOKEN_KEY, credential.as_str().to_string()),
            (USER_KEY, user),
        ])
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.storage.remove_all(&[TOKEN_KEY, USER_KEY])
    }
}
