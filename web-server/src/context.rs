// web-server/src/context.rs
use std::sync::Arc;
use actix::{Actor, Addr};
use common::config::{ALL_STAFF, DIRECTOR_ONLY, MANAGEMENT};
use common::jwt::{TokenIssuer, TokenValidator};
use common::{ConfigError, ServerConfig};

use crate::accounts::AccountRepository;
use crate::middleware::JwtAuth;
use crate::policy::{Policies, Policy};
use crate::realtime::registry::ConnectionRegistry;

/// Paths reachable without a credential
pub const PUBLIC_PATHS: [&str; 3] = ["/", "/health", "/api/auth/login"];

/// Policies resolved at startup for each protected scope
#[derive(Clone, Debug)]
pub struct RoutePolicies {
    pub authenticated: Policy,
    pub staff_directory: Policy,
    pub statistics: Policy,
}

/// Shared, read-only server state
#[derive(Clone)]
pub struct AppContext {
    pub issuer: TokenIssuer,
    pub validator: TokenValidator,
    pub accounts: Arc<dyn AccountRepository>,
    pub policies: RoutePolicies,
    pub realtime_path: String,
    pub registry: Addr<ConnectionRegistry>,
}

impl AppContext {
    /// Must run inside an actix system; starts the connection registry.
    pub fn new(config: &ServerConfig, accounts: Arc<dyn AccountRepository>) -> Result<Self, ConfigError> {
        config.validate()?;

        let policies = Policies::from_config(&config.policies)?;
        let policies = RoutePolicies {
            authenticated: policies.require(ALL_STAFF)?,
            staff_directory: policies.require(DIRECTOR_ONLY)?,
            statistics: policies.require(MANAGEMENT)?,
        };

        Ok(Self {
            issuer: TokenIssuer::new(&config.jwt),
            validator: TokenValidator::new(&config.jwt),
            accounts,
            policies,
            realtime_path: config.realtime.path.clone(),
            registry: ConnectionRegistry::new().start(),
        })
    }

    pub fn jwt_auth(&self) -> JwtAuth {
        PUBLIC_PATHS
            .iter()
            .fold(
                JwtAuth::new(self.validator.clone(), self.realtime_path.clone()),
                |auth, path| auth.public(*path),
            )
    }
}
