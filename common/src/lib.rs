pub mod config;
pub mod jwt;
pub mod models;
pub mod utils;

pub use config::*;
pub use models::auth::{ErrorBody, LoginRequest, LoginResponse};
pub use models::principal::{Principal, Role, UnknownRole};
pub use utils::*;
