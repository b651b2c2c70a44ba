// web-server/src/accounts.rs
use std::sync::OnceLock;
use actix_web::web;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use common::{AccountSeed, Principal};
use dashmap::DashMap;
use rand::RngCore;

use crate::error::ApiError;

/// Stored account: principal profile plus its Argon2 password hash.
#[derive(Clone)]
pub struct AccountRecord {
    pub username: String,
    pub principal: Principal,
    pub password_hash: String,
}

/// Persistence collaborator the token issuer verifies credentials against.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Option<AccountRecord>;

    async fn principals(&self) -> Vec<Principal>;
}

/// Account store seeded from configuration.
#[derive(Default)]
pub struct InMemoryAccounts {
    by_username: DashMap<String, AccountRecord>,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seeds(seeds: &[AccountSeed]) -> Self {
        let accounts = Self::new();
        for seed in seeds {
            accounts.insert(AccountRecord {
                username: seed.username.clone(),
                principal: Principal {
                    id: seed.id,
                    name: seed.name.clone(),
                    role: seed.role,
                },
                password_hash: seed.password_hash.clone(),
            });
        }

        if accounts.by_username.is_empty() {
            tracing::warn!("No accounts configured; every login will be rejected");
        } else {
            tracing::info!("Loaded {} accounts", accounts.by_username.len());
        }
        accounts
    }

    pub fn insert(&self, record: AccountRecord) {
        self.by_username.insert(normalize(&record.username), record);
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccounts {
    async fn find_by_username(&self, username: &str) -> Option<AccountRecord> {
        self.by_username
            .get(&normalize(username))
            .map(|entry| entry.value().clone())
    }

    async fn principals(&self) -> Vec<Principal> {
        let mut principals: Vec<Principal> = self
            .by_username
            .iter()
            .map(|entry| entry.value().principal.clone())
            .collect();
        principals.sort_by_key(|p| p.id);
        principals
    }
}

fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Hash a password into an Argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)?;

    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

// Verified against when the username is unknown, so both failure paths cost the same
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("dummy-password").ok())
        .as_deref()
}

/// Check a username/password pair.
///
/// `Ok(None)` covers both an unknown username and a wrong password; callers
/// must not be able to tell them apart.
pub async fn authenticate(
    accounts: &dyn AccountRepository,
    username: &str,
    password: &str,
) -> Result<Option<Principal>, ApiError> {
    let record = accounts.find_by_username(username).await;
    let password = password.to_string();

    web::block(move || match record {
        Some(record) => {
            verify_password(&record.password_hash, &password).then_some(record.principal)
        }
        None => {
            if let Some(hash) = dummy_hash() {
                verify_password(hash, &password);
            }
            None
        }
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))
}
