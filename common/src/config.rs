// common/src/config.rs
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use config::{Config as ConfigFile, File, Environment};

use crate::models::principal::Role;

pub const DIRECTOR_ONLY: &str = "DirectorOnly";
pub const MANAGEMENT: &str = "Management";
pub const ALL_STAFF: &str = "AllStaff";

/// Longest accepted token lifetime: one year.
pub const MAX_LIFETIME_MINUTES: i64 = 366 * 24 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("authorization policy `{0}` is not configured")]
    UnknownPolicy(String),

    #[error("authorization policy `{0}` accepts no roles")]
    EmptyPolicy(String),
}

/// Server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub web_server_addr: String,
    pub log_level: String,
    pub jwt: JwtConfig,
    pub realtime: RealtimeConfig,
    /// Policy name -> accepted role tags
    pub policies: HashMap<String, Vec<Role>>,
    /// Accounts loaded into the in-memory account store at startup
    pub accounts: Vec<AccountSeed>,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub lifetime_minutes: i64,
    pub leeway_seconds: u64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("lifetime_minutes", &self.lifetime_minutes)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Path prefix of the real-time channel; the only place a query-string token is honoured
    pub path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountSeed {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: Role,
    /// Argon2 PHC string
    pub password_hash: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            web_server_addr: "127.0.0.1:8081".to_string(),
            log_level: "info".to_string(),
            jwt: JwtConfig::default(),
            realtime: RealtimeConfig::default(),
            policies: default_policies(),
            accounts: Vec::new(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        // secret, issuer and audience have no defaults; they must be configured
        Self {
            secret: String::new(),
            issuer: String::new(),
            audience: String::new(),
            lifetime_minutes: 24 * 60,
            leeway_seconds: 0,
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            path: "/hubs/notifications".to_string(),
        }
    }
}

pub fn default_policies() -> HashMap<String, Vec<Role>> {
    HashMap::from([
        (DIRECTOR_ONLY.to_string(), vec![Role::Director]),
        (MANAGEMENT.to_string(), vec![Role::Director, Role::Manager]),
        (ALL_STAFF.to_string(), Role::ALL.to_vec()),
    ])
}

impl ServerConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, ConfigError> {
        Ok(load_layered("APP")?)
    }

    /// Check the startup preconditions. Any error here is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.jwt.validate()?;

        if !self.realtime.path.starts_with('/') {
            return Err(ConfigError::Invalid {
                key: "realtime.path",
                reason: format!("`{}` must start with '/'", self.realtime.path),
            });
        }

        for (name, roles) in &self.policies {
            if roles.is_empty() {
                return Err(ConfigError::EmptyPolicy(name.clone()));
            }
        }

        Ok(())
    }
}

impl JwtConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::Missing("jwt.secret"));
        }
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::Missing("jwt.issuer"));
        }
        if self.audience.trim().is_empty() {
            return Err(ConfigError::Missing("jwt.audience"));
        }
        if self.lifetime_minutes <= 0 || self.lifetime_minutes > MAX_LIFETIME_MINUTES {
            return Err(ConfigError::Invalid {
                key: "jwt.lifetime_minutes",
                reason: format!("must be between 1 and {}", MAX_LIFETIME_MINUTES),
            });
        }
        Ok(())
    }
}

/// Where layered configuration is read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigSource {
    pub dir: PathBuf,
    pub run_mode: String,
}

impl ConfigSource {
    /// `CONFIG_DIR` and `RUN_MODE` from the environment.
    pub fn from_env() -> Self {
        Self::resolve(env::var("CONFIG_DIR").ok(), env::var("RUN_MODE").ok())
    }

    pub fn resolve(config_dir: Option<String>, run_mode: Option<String>) -> Self {
        let dir = config_dir.map(PathBuf::from).unwrap_or_else(|| {
            // Check if we're in the project root or a subcrate
            let path = PathBuf::from("./config");
            if path.exists() {
                path
            } else {
                PathBuf::from("../config")
            }
        });

        Self {
            dir,
            run_mode: run_mode.unwrap_or_else(|| "development".into()),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (run mode {})", self.dir.display(), self.run_mode)
    }
}

/// Layered load shared by the server and client configs:
/// `default.toml`, `{RUN_MODE}.toml`, `local.toml`, then `{prefix}__*` env vars.
///
/// Runs before tracing is installed, so callers log [`ConfigSource`] themselves.
pub fn load_layered<T: DeserializeOwned>(env_prefix: &str) -> Result<T, config::ConfigError> {
    let source = ConfigSource::from_env();

    ConfigFile::builder()
        .add_source(File::from(source.dir.join("default.toml")).required(false))
        .add_source(File::from(source.dir.join(format!("{}.toml", source.run_mode))).required(false))
        .add_source(File::from(source.dir.join("local.toml")).required(false))
        .add_source(Environment::with_prefix(env_prefix).separator("__"))
        .build()?
        .try_deserialize()
}
