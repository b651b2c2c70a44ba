// web-client/src/config.rs
use common::{load_layered, ConfigError};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    /// File holding the persisted token and principal
    pub storage_path: String,
    pub realtime_path: String,
    pub sign_in_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8081".to_string(),
            storage_path: "./session.json".to_string(),
            realtime_path: "/hubs/notifications".to_string(),
            sign_in_path: "/login".to_string(),
        }
    }
}

impl ClientConfig {
    /// Same layering as the server, with `CLIENT__*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(load_layered("CLIENT")?)
    }
}
